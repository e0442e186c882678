// ctrl2esc Input Layer
// Device detection, qualification and the physical event source

mod device;
mod filter;
pub mod source;

pub use device::{
    is_event_node, is_virtual_device, CapabilityProbe, DeviceCapabilities, EvdevProbe,
    EVENT_NODE_PREFIX, VIRTUAL_DEVICES_DIR,
};
pub use filter::{should_remap, DeviceCandidate, DeviceFilter, Discovery};
pub use source::{
    AbsoluteAxis, DeviceNode, EvdevInput, InputDevice, PassthroughCapabilities, ReadStatus,
};
