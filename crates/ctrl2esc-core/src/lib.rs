// ctrl2esc Core Library
// Tap-Ctrl-for-Escape remapping for evdev keyboards

pub mod event;
pub mod input;
pub mod key;
pub mod output;
pub mod session;
pub mod settings;
pub mod supervisor;
pub mod transform;

pub use event::{Action, Event, EventClass};
pub use input::{
    is_event_node, is_virtual_device, should_remap, CapabilityProbe, DeviceCandidate,
    DeviceCapabilities, DeviceFilter, Discovery, EvdevProbe,
};
pub use key::Key;
pub use output::EventSink;
pub use session::{run_session, SessionError, SessionOptions};
pub use settings::{Settings, SettingsError};
pub use supervisor::{Supervisor, SupervisorError};
pub use transform::{remap, ModifierState, RemapEngine, RemapPolicy};
