// ctrl2esc Input Layer - Device Qualification
// Decides which discovered devices get a remapping session

use std::path::{Path, PathBuf};

use super::device::{is_event_node, is_virtual_device, CapabilityProbe};
use crate::transform::RemapPolicy;

/// How a candidate device was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// Enumeration of devices present at startup
    InitialScan,
    /// Live hot-plug notification
    Hotplug,
}

/// A device seen during enumeration or reported by a hot-plug monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// sysfs path of the device
    pub syspath: PathBuf,
    /// Device node, when the device has one
    pub devnode: Option<PathBuf>,
    /// Hot-plug action ("add", "remove", "change", ...)
    pub action: Option<String>,
}

impl DeviceCandidate {
    pub fn new(syspath: impl Into<PathBuf>, devnode: Option<PathBuf>) -> Self {
        Self {
            syspath: syspath.into(),
            devnode,
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// Operator filter from the settings file.
///
/// Entries match either a device path or a device name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    /// When non-empty, only matching devices are remapped
    pub only: Vec<String>,
    /// Matching devices are never remapped
    pub ignore: Vec<String>,
}

impl DeviceFilter {
    pub fn new(only: Vec<String>, ignore: Vec<String>) -> Self {
        Self { only, ignore }
    }

    /// Check if a device passes the filter.
    pub fn matches(&self, device_path: &str, device_name: Option<&str>) -> bool {
        let hit = |entry: &String| {
            entry == device_path || device_name.map(|name| entry == name).unwrap_or(false)
        };

        if self.ignore.iter().any(hit) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(hit)
    }
}

/// Decide whether `candidate` should receive a remapping session.
///
/// Rejects, in order: virtual devices, hot-plug events other than "add",
/// nodes that are not evdev event nodes, devices that cannot be probed,
/// devices excluded by the operator filter, and devices that expose neither
/// the tap key nor the swapped key.
pub fn should_remap(
    candidate: &DeviceCandidate,
    discovery: Discovery,
    policy: &RemapPolicy,
    filter: &DeviceFilter,
    probe: &dyn CapabilityProbe,
) -> bool {
    if is_virtual_device(&candidate.syspath) {
        return false;
    }

    if discovery == Discovery::Hotplug && candidate.action.as_deref() != Some("add") {
        return false;
    }

    let devnode: &Path = match candidate.devnode.as_deref() {
        Some(devnode) if is_event_node(devnode) => devnode,
        _ => return false,
    };

    let capabilities = match probe.probe(devnode) {
        Ok(capabilities) => capabilities,
        Err(e) => {
            log::warn!("Failed to probe {}: {}", devnode.display(), e);
            return false;
        }
    };

    let path = devnode.to_string_lossy();
    if !filter.matches(&path, capabilities.name.as_deref()) {
        log::debug!("{} excluded by device filter", path);
        return false;
    }

    capabilities.supports_any(&policy.qualifying_keys())
}
