// ctrl2esc Output Layer
// Destination of remapped events

use std::io;

use crate::Event;

mod frame;
mod uinput;

pub use frame::{Frame, FrameBuffer};
pub use uinput::{VirtualDevice, VIRTUAL_NAME_SUFFIX};

/// Anything remapped events can be written to, in order.
pub trait EventSink {
    fn write_event(&mut self, event: &Event) -> io::Result<()>;

    /// Drop whatever part of the current frame has not been written yet.
    /// Returns the number of events dropped.
    fn discard_frame(&mut self) -> usize {
        0
    }
}

impl EventSink for Vec<Event> {
    fn write_event(&mut self, event: &Event) -> io::Result<()> {
        self.push(*event);
        Ok(())
    }
}
