// ctrl2esc Supervisor - Device Discovery
// Startup enumeration and hot-plug notification sources

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::input::DeviceCandidate;

/// Lists the input devices present right now.
pub trait DeviceEnumerator {
    fn enumerate(&mut self) -> io::Result<Vec<DeviceCandidate>>;
}

/// Reports input devices as they come and go.
pub trait HotplugMonitor {
    /// Wait up to `timeout` and return the events seen, possibly none
    fn wait(&mut self, timeout: Duration) -> io::Result<Vec<DeviceCandidate>>;
}

/// Enumerates `event*` nodes through sysfs.
#[derive(Debug, Clone)]
pub struct SysfsScanner {
    class_dir: PathBuf,
    dev_dir: PathBuf,
}

impl Default for SysfsScanner {
    fn default() -> Self {
        Self::new("/sys/class/input", "/dev/input")
    }
}

impl SysfsScanner {
    pub fn new(class_dir: impl Into<PathBuf>, dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            class_dir: class_dir.into(),
            dev_dir: dev_dir.into(),
        }
    }

    fn candidate(&self, class_entry: &Path, name: &str) -> DeviceCandidate {
        // /sys/class/input/eventN links into /sys/devices/...
        let syspath = fs::canonicalize(class_entry).unwrap_or_else(|_| class_entry.to_path_buf());
        DeviceCandidate::new(syspath, Some(self.dev_dir.join(name)))
    }
}

impl DeviceEnumerator for SysfsScanner {
    fn enumerate(&mut self) -> io::Result<Vec<DeviceCandidate>> {
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.class_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with("event") {
                candidates.push(self.candidate(&entry.path(), name));
            }
        }
        candidates.sort_by(|a, b| a.devnode.cmp(&b.devnode));
        Ok(candidates)
    }
}

/// Hot-plug fallback that rescans sysfs and reports new nodes as "add".
///
/// A device unplugged and replugged under the same node name between two
/// scans goes unnoticed.
#[derive(Debug)]
pub struct SysfsMonitor {
    scanner: SysfsScanner,
    known: HashSet<PathBuf>,
}

impl SysfsMonitor {
    /// Start monitoring; devices present now are not reported.
    pub fn new(mut scanner: SysfsScanner) -> io::Result<Self> {
        let known = scanner
            .enumerate()?
            .into_iter()
            .filter_map(|candidate| candidate.devnode)
            .collect();
        Ok(Self { scanner, known })
    }

    /// Compare a fresh scan against the known set and report additions
    fn diff(&mut self, current: Vec<DeviceCandidate>) -> Vec<DeviceCandidate> {
        let present: HashSet<PathBuf> = current
            .iter()
            .filter_map(|candidate| candidate.devnode.clone())
            .collect();

        let added = current
            .into_iter()
            .filter(|candidate| match &candidate.devnode {
                Some(devnode) => !self.known.contains(devnode),
                None => false,
            })
            .map(|candidate| candidate.with_action("add"))
            .collect();

        self.known = present;
        added
    }
}

impl HotplugMonitor for SysfsMonitor {
    fn wait(&mut self, timeout: Duration) -> io::Result<Vec<DeviceCandidate>> {
        std::thread::sleep(timeout);
        let current = self.scanner.enumerate()?;
        Ok(self.diff(current))
    }
}

#[cfg(feature = "hotplug")]
pub use self::udev_backend::{UdevEnumerator, UdevMonitor};

#[cfg(feature = "hotplug")]
mod udev_backend {
    use std::io;
    use std::os::unix::io::AsRawFd;
    use std::time::Duration;

    use super::{DeviceEnumerator, HotplugMonitor};
    use crate::input::DeviceCandidate;

    fn candidate_from(device: &udev::Device) -> DeviceCandidate {
        let candidate = DeviceCandidate::new(
            device.syspath().to_path_buf(),
            device.devnode().map(|node| node.to_path_buf()),
        );
        match device.action() {
            Some(action) => candidate.with_action(action.to_string_lossy()),
            None => candidate,
        }
    }

    /// Enumerates the `input` subsystem through udev.
    #[derive(Debug, Default)]
    pub struct UdevEnumerator;

    impl DeviceEnumerator for UdevEnumerator {
        fn enumerate(&mut self) -> io::Result<Vec<DeviceCandidate>> {
            let mut enumerator = udev::Enumerator::new()?;
            enumerator.match_subsystem("input")?;
            Ok(enumerator
                .scan_devices()?
                .map(|device| candidate_from(&device))
                .collect())
        }
    }

    /// udev netlink monitor on the `input` subsystem
    pub struct UdevMonitor {
        socket: udev::MonitorSocket,
    }

    impl UdevMonitor {
        pub fn new() -> io::Result<Self> {
            let socket = udev::MonitorBuilder::new()?
                .match_subsystem("input")?
                .listen()?;
            log::info!("udev hot-plug monitor initialized");
            Ok(Self { socket })
        }
    }

    impl HotplugMonitor for UdevMonitor {
        fn wait(&mut self, timeout: Duration) -> io::Result<Vec<DeviceCandidate>> {
            let mut poll_fd = libc::pollfd {
                fd: self.socket.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

            let poll_result = unsafe { libc::poll(&mut poll_fd, 1, timeout_ms) };
            if poll_result < 0 {
                let err = io::Error::last_os_error();
                // A signal (SIGCHLD from a worker, most often) is not an error
                if err.kind() == io::ErrorKind::Interrupted {
                    return Ok(Vec::new());
                }
                return Err(err);
            }
            if poll_result == 0 || poll_fd.revents & libc::POLLIN == 0 {
                return Ok(Vec::new());
            }

            Ok(self
                .socket
                .iter()
                .map(|event| candidate_from(&event))
                .collect())
        }
    }
}
