// ctrl2esc Input Layer - Event Source
// Blocking reads from a physical evdev device with SYN_DROPPED recovery

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use evdev::raw_stream::RawDevice;
use evdev::{AttributeSet, AttributeSetRef, EvdevEnum};

use crate::{Event, Key};

/// Outcome of one normal read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// An event was read
    Event(Event),
    /// The kernel dropped events; call [`InputDevice::resync`] before reading on
    Desync,
    /// Nothing available right now; read again
    TryAgain,
}

/// A physical input device as seen by a session.
pub trait InputDevice {
    /// Human readable name, for logs
    fn name(&self) -> String;

    /// Take exclusive ownership of the device's event stream
    fn grab(&mut self) -> io::Result<()>;

    /// Give the event stream back to the rest of the system
    fn ungrab(&mut self) -> io::Result<()>;

    /// Adjust the key capabilities advertised to the synthetic device
    fn restrict_keys(&mut self, enable: &[Key], disable: &[Key]) -> io::Result<()>;

    /// Key capabilities currently advertised
    fn advertised_keys(&self) -> Vec<Key>;

    /// Capabilities other than keys, copied unchanged onto the synthetic device
    fn passthrough_capabilities(&self) -> &PassthroughCapabilities;

    /// Read one event, blocking until one is available
    fn read_event(&mut self) -> io::Result<ReadStatus>;

    /// Discard the remainder of a dropped frame. Returns the number of
    /// events discarded.
    fn resync(&mut self) -> io::Result<usize>;
}

/// One absolute axis and its range, as reported by `EVIOCGABS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteAxis {
    pub code: u16,
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// Non-key capabilities of a physical device.
///
/// Keyboards with a built-in pointer or touchpad report motion on the same
/// node; the synthetic device must advertise these too or the kernel drops
/// everything it is not declared to emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassthroughCapabilities {
    pub relative_axes: Vec<u16>,
    pub absolute_axes: Vec<AbsoluteAxis>,
    pub switches: Vec<u16>,
    pub misc: Vec<u16>,
    pub properties: Vec<u16>,
}

impl PassthroughCapabilities {
    pub fn is_empty(&self) -> bool {
        self.relative_axes.is_empty()
            && self.absolute_axes.is_empty()
            && self.switches.is_empty()
            && self.misc.is_empty()
            && self.properties.is_empty()
    }

    fn from_raw(device: &RawDevice) -> io::Result<Self> {
        let absolute_axes = match device.supported_absolute_axes() {
            Some(axes) => {
                let state = device.get_abs_state()?;
                axes.iter()
                    .map(|axis| {
                        let info = &state[axis.0 as usize];
                        AbsoluteAxis {
                            code: axis.0,
                            value: info.value,
                            minimum: info.minimum,
                            maximum: info.maximum,
                            fuzz: info.fuzz,
                            flat: info.flat,
                            resolution: info.resolution,
                        }
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        Ok(Self {
            relative_axes: codes(device.supported_relative_axes()),
            absolute_axes,
            switches: codes(device.supported_switches()),
            misc: codes(device.misc_properties()),
            properties: codes(Some(device.properties())),
        })
    }
}

fn codes<T: EvdevEnum>(set: Option<&AttributeSetRef<T>>) -> Vec<u16> {
    set.map(|set| set.iter().map(|code| code.to_index() as u16).collect())
        .unwrap_or_default()
}

/// An event node opened read-only, before evdev has looked at it.
#[derive(Debug)]
pub struct DeviceNode {
    path: PathBuf,
    file: File,
}

impl DeviceNode {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Events fetched from the kernel but not yet handed out.
#[derive(Debug, Default)]
struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discard queued events up to and including the next SYN_REPORT.
    ///
    /// Returns the number discarded and whether the SYN_REPORT was reached.
    fn discard_through_report(&mut self) -> (usize, bool) {
        let mut discarded = 0;
        while let Some(event) = self.events.pop_front() {
            discarded += 1;
            if event.is_sync_report() {
                return (discarded, true);
            }
        }
        (discarded, false)
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// evdev-backed physical device.
///
/// Owns the opened node; dropping it frees the device, then closes the
/// node.
pub struct EvdevInput {
    device: RawDevice,
    keys: AttributeSet<evdev::Key>,
    passthrough: PassthroughCapabilities,
    queue: EventQueue,
    _node: File,
}

impl EvdevInput {
    /// Build the device abstraction for an opened node.
    ///
    /// Fails when the node is not an evdev device or its capabilities cannot
    /// be read.
    pub fn attach(node: DeviceNode) -> io::Result<Self> {
        let device = RawDevice::open(&node.path)?;
        let keys = device
            .supported_keys()
            .map(|supported| supported.iter().collect())
            .unwrap_or_default();
        let passthrough = PassthroughCapabilities::from_raw(&device)?;
        Ok(Self {
            device,
            keys,
            passthrough,
            queue: EventQueue::default(),
            _node: node.file,
        })
    }

    pub fn raw(&self) -> &RawDevice {
        &self.device
    }

    pub fn keys(&self) -> &AttributeSet<evdev::Key> {
        &self.keys
    }

    fn fill(&mut self) -> io::Result<()> {
        let events = self.device.fetch_events()?;
        self.queue.extend(events.map(Event::from));
        Ok(())
    }
}

impl InputDevice for EvdevInput {
    fn name(&self) -> String {
        self.device.name().unwrap_or("Unknown").to_string()
    }

    fn grab(&mut self) -> io::Result<()> {
        self.device.grab()
    }

    fn ungrab(&mut self) -> io::Result<()> {
        self.device.ungrab()
    }

    fn restrict_keys(&mut self, enable: &[Key], disable: &[Key]) -> io::Result<()> {
        for key in enable {
            self.keys.insert(evdev::Key::from(*key));
        }
        for key in disable {
            self.keys.remove(evdev::Key::from(*key));
        }
        Ok(())
    }

    fn advertised_keys(&self) -> Vec<Key> {
        self.keys.iter().map(Key::from).collect()
    }

    fn passthrough_capabilities(&self) -> &PassthroughCapabilities {
        &self.passthrough
    }

    fn read_event(&mut self) -> io::Result<ReadStatus> {
        if self.queue.is_empty() {
            match self.fill() {
                Ok(()) => {}
                Err(e) if is_transient(&e) => return Ok(ReadStatus::TryAgain),
                Err(e) => return Err(e),
            }
        }

        Ok(match self.queue.pop() {
            Some(event) if event.is_sync_dropped() => ReadStatus::Desync,
            Some(event) => ReadStatus::Event(event),
            None => ReadStatus::TryAgain,
        })
    }

    fn resync(&mut self) -> io::Result<usize> {
        let mut total = 0;
        loop {
            let (discarded, reached_report) = self.queue.discard_through_report();
            total += discarded;
            if reached_report {
                return Ok(total);
            }
            match self.fill() {
                Ok(()) => {}
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(e),
            }
        }
    }
}
