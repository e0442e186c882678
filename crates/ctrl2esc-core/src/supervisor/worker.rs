// ctrl2esc Supervisor - Workers
// One isolated worker per device, launched by re-executing this program

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// How a worker terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Exit code, when the worker exited normally
    pub code: Option<i32>,
    /// Terminating signal, when the worker was killed
    pub signal: Option<i32>,
}

impl WorkerExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl std::fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// A running worker.
pub trait Worker: Send {
    /// OS-level identifier, for logs
    fn id(&self) -> u32;

    /// Collect the worker's exit status if it has finished. Never blocks.
    fn try_reap(&mut self) -> io::Result<Option<WorkerExit>>;

    /// Ask the worker to stop
    fn terminate(&mut self) -> io::Result<()>;

    /// Block until the worker has finished
    fn wait(&mut self) -> io::Result<WorkerExit>;
}

/// Starts workers.
pub trait WorkerLauncher {
    type Worker: Worker + 'static;

    fn launch(&self, device: &Path) -> io::Result<Self::Worker>;
}

/// Worker backed by a child process.
#[derive(Debug)]
pub struct ProcessWorker {
    child: Child,
}

impl Worker for ProcessWorker {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn try_reap(&mut self) -> io::Result<Option<WorkerExit>> {
        Ok(self.child.try_wait()?.map(WorkerExit::from))
    }

    fn terminate(&mut self) -> io::Result<()> {
        // The kernel drops the grab and the uinput device with the
        // process's descriptors.
        match self.child.kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()), // already exited
            other => other,
        }
    }

    fn wait(&mut self) -> io::Result<WorkerExit> {
        Ok(self.child.wait()?.into())
    }
}

/// Launches `program [args...] <device>` as a child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Launcher re-executing the running binary
    pub fn current_exe(args: Vec<OsString>) -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, args))
    }

    /// The command line a worker for `device` runs with
    pub fn command_line(&self, device: &Path) -> Vec<OsString> {
        let mut line = Vec::with_capacity(self.args.len() + 2);
        line.push(self.program.clone().into_os_string());
        line.extend(self.args.iter().cloned());
        line.push(device.as_os_str().to_os_string());
        line
    }
}

impl WorkerLauncher for ProcessLauncher {
    type Worker = ProcessWorker;

    fn launch(&self, device: &Path) -> io::Result<ProcessWorker> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(device)
            .stdin(Stdio::null())
            .spawn()?;
        Ok(ProcessWorker { child })
    }
}

/// Live workers keyed by the device path they serve.
pub struct WorkerTable<W: Worker> {
    workers: HashMap<PathBuf, W>,
}

impl<W: Worker> Default for WorkerTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Worker> WorkerTable<W> {
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn contains(&self, device: &Path) -> bool {
        self.workers.contains_key(device)
    }

    pub fn get(&self, device: &Path) -> Option<&W> {
        self.workers.get(device)
    }

    /// Track `worker` for `device`, returning any worker it replaces
    pub fn insert(&mut self, device: PathBuf, worker: W) -> Option<W> {
        self.workers.insert(device, worker)
    }

    pub fn devices(&self) -> Vec<PathBuf> {
        let mut devices: Vec<PathBuf> = self.workers.keys().cloned().collect();
        devices.sort();
        devices
    }

    /// Remove every worker that has finished, without blocking.
    ///
    /// A worker whose status cannot be queried is dropped from the table;
    /// there is nothing more to reclaim for it.
    pub fn reap_finished(&mut self) -> Vec<(PathBuf, WorkerExit)> {
        let mut finished = Vec::new();
        let mut lost = Vec::new();

        for (device, worker) in self.workers.iter_mut() {
            match worker.try_reap() {
                Ok(Some(exit)) => finished.push((device.clone(), exit)),
                Ok(None) => {}
                Err(e) => {
                    log::warn!(
                        "Lost track of worker {} for {}: {}",
                        worker.id(),
                        device.display(),
                        e
                    );
                    lost.push(device.clone());
                }
            }
        }

        for (device, _) in &finished {
            self.workers.remove(device);
        }
        for device in &lost {
            self.workers.remove(device);
        }
        finished.sort_by(|a, b| a.0.cmp(&b.0));
        finished
    }

    /// Terminate every worker and wait for all of them.
    pub fn terminate_all(&mut self) -> Vec<(PathBuf, WorkerExit)> {
        let mut exits = Vec::new();
        for (device, mut worker) in self.workers.drain() {
            if let Err(e) = worker.terminate() {
                log::warn!("Failed to stop worker {}: {}", worker.id(), e);
            }
            match worker.wait() {
                Ok(exit) => exits.push((device, exit)),
                Err(e) => log::warn!("Failed to wait for worker {}: {}", worker.id(), e),
            }
        }
        exits.sort_by(|a, b| a.0.cmp(&b.0));
        exits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_exit_from_status() {
        let exit = WorkerExit::from(ExitStatus::from_raw(0));
        assert!(exit.success());
        assert_eq!(exit.to_string(), "exit code 0");

        let exit = WorkerExit::from(ExitStatus::from_raw(1 << 8));
        assert_eq!(exit.code, Some(1));
        assert!(!exit.success());

        // Killed by SIGKILL
        let exit = WorkerExit::from(ExitStatus::from_raw(9));
        assert_eq!(exit.code, None);
        assert_eq!(exit.signal, Some(9));
        assert_eq!(exit.to_string(), "signal 9");
    }

    #[test]
    fn test_command_line_appends_device() {
        let launcher = ProcessLauncher::new(
            "/usr/bin/ctrl2esc",
            vec![OsString::from("--config"), OsString::from("/etc/ctrl2esc.toml")],
        );
        assert_eq!(
            launcher.command_line(Path::new("/dev/input/event3")),
            vec![
                OsString::from("/usr/bin/ctrl2esc"),
                OsString::from("--config"),
                OsString::from("/etc/ctrl2esc.toml"),
                OsString::from("/dev/input/event3"),
            ]
        );
    }

    #[test]
    fn test_process_worker_is_reaped() {
        let launcher = ProcessLauncher::new("true", vec![]);
        let mut table = WorkerTable::new();
        let worker = launcher.launch(Path::new("/dev/input/event9")).unwrap();
        table.insert(PathBuf::from("/dev/input/event9"), worker);

        let exits = loop {
            let exits = table.reap_finished();
            if !exits.is_empty() {
                break exits;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        };
        assert_eq!(exits.len(), 1);
        assert!(exits[0].1.success());
        assert!(table.is_empty());
    }

    #[test]
    fn test_process_worker_terminate() {
        // Runs `sleep 30 5`
        let launcher = ProcessLauncher::new("sleep", vec![OsString::from("30")]);
        let mut table = WorkerTable::new();
        let worker = launcher.launch(Path::new("5")).unwrap();
        table.insert(PathBuf::from("5"), worker);
        let exits = table.terminate_all();
        assert_eq!(exits.len(), 1);
        assert!(table.is_empty());
    }
}
