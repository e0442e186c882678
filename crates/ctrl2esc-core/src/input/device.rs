// ctrl2esc Input Layer - Device Capabilities
// Capability snapshots of input devices and evdev probing

use std::collections::HashSet;
use std::io;
use std::path::Path;

use crate::Key;

/// sysfs directory holding every kernel-side virtual input device,
/// including the uinput devices this program creates.
pub const VIRTUAL_DEVICES_DIR: &str = "/sys/devices/virtual/input/";

/// Device node prefix of evdev character devices
pub const EVENT_NODE_PREFIX: &str = "/dev/input/event";

/// Device capabilities extracted from an evdev device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Device name reported by the kernel
    pub name: Option<String>,
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported key codes (EV_KEY capability codes)
    pub supported_keys: Vec<Key>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: Vec<Key>) -> Self {
        Self {
            name: None,
            has_ev_key,
            supported_keys,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check if a specific key code is supported
    pub fn supports_key(&self, key: Key) -> bool {
        self.supported_keys.contains(&key)
    }

    /// Whether the device can emit at least one of `keys`
    pub fn supports_any(&self, keys: &[Key]) -> bool {
        if !self.has_ev_key {
            return false;
        }
        let key_set: HashSet<Key> = self.supported_keys.iter().copied().collect();
        keys.iter().any(|key| key_set.contains(key))
    }

    /// Snapshot the capabilities of an open evdev device
    pub fn from_evdev(device: &evdev::Device) -> Self {
        let has_ev_key = device.supported_events().contains(evdev::EventType::KEY);
        let supported_keys = device
            .supported_keys()
            .map(|keys| keys.iter().map(Key::from).collect())
            .unwrap_or_default();
        Self {
            name: device.name().map(str::to_string),
            has_ev_key,
            supported_keys,
        }
    }
}

/// Check if a device is virtual based on its sysfs path.
///
/// Virtual devices include our own synthetic keyboards and must never be
/// remapped, otherwise every session would spawn another one.
pub fn is_virtual_device(syspath: &Path) -> bool {
    syspath.starts_with(VIRTUAL_DEVICES_DIR)
}

/// Check if a device node is an evdev event node
pub fn is_event_node(devnode: &Path) -> bool {
    devnode
        .to_str()
        .map(|path| path.starts_with(EVENT_NODE_PREFIX))
        .unwrap_or(false)
}

/// Reads the capabilities of a device node.
pub trait CapabilityProbe {
    fn probe(&self, devnode: &Path) -> io::Result<DeviceCapabilities>;
}

/// Probe that opens the device through evdev and closes it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevProbe;

impl CapabilityProbe for EvdevProbe {
    fn probe(&self, devnode: &Path) -> io::Result<DeviceCapabilities> {
        let device = evdev::Device::open(devnode)?;
        Ok(DeviceCapabilities::from_evdev(&device))
    }
}
