// ctrl2esc Session Backend
// Resource acquisition seam and scoped release guards

use std::io;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Duration;

use crate::input::{DeviceNode, EvdevInput, InputDevice};
use crate::output::{EventSink, VirtualDevice};

/// Acquires the resources of one device session.
///
/// Each associated type releases its resource when dropped. `Device` takes
/// ownership of `Handle`, so freeing the device also closes the handle.
pub trait Backend {
    /// Open device file
    type Handle;
    /// Input-device abstraction built on the handle
    type Device: InputDevice;
    /// Synthetic output device
    type Output: EventSink;

    /// Open the device node read-only
    fn open(&self, path: &Path) -> io::Result<Self::Handle>;

    /// Build the input-device abstraction; the handle is closed if this fails
    fn attach(&self, handle: Self::Handle) -> io::Result<Self::Device>;

    /// Create the synthetic device mirroring `device`
    fn create_output(&self, device: &Self::Device) -> io::Result<Self::Output>;

    /// Wait before grabbing so hot-plug initialization of the node can finish
    fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Exclusive grab on an input device, released on drop.
///
/// The guard owns the device: dropping it ungrabs first, then frees the
/// device.
pub struct GrabGuard<D: InputDevice> {
    device: D,
}

impl<D: InputDevice> GrabGuard<D> {
    /// Grab `device`. On failure the device is dropped without an ungrab.
    pub fn acquire(mut device: D) -> io::Result<Self> {
        device.grab()?;
        Ok(Self { device })
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: InputDevice> Deref for GrabGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}

impl<D: InputDevice> DerefMut for GrabGuard<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: InputDevice> Drop for GrabGuard<D> {
    fn drop(&mut self) {
        if let Err(e) = self.device.ungrab() {
            // Expected once the device is unplugged
            log::debug!("Failed to ungrab {}: {}", self.device.name(), e);
        }
    }
}

/// Real devices: evdev for input, uinput for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevBackend;

impl Backend for EvdevBackend {
    type Handle = DeviceNode;
    type Device = EvdevInput;
    type Output = VirtualDevice;

    fn open(&self, path: &Path) -> io::Result<DeviceNode> {
        DeviceNode::open(path)
    }

    fn attach(&self, handle: DeviceNode) -> io::Result<EvdevInput> {
        EvdevInput::attach(handle)
    }

    fn create_output(&self, device: &EvdevInput) -> io::Result<VirtualDevice> {
        VirtualDevice::mirror(device)
    }
}
