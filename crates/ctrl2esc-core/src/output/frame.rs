// ctrl2esc Frame Buffer
// Groups output events into SYN_REPORT-terminated frames

use smallvec::SmallVec;

use crate::Event;

/// Events of one frame, without the terminating SYN_REPORT
pub type Frame = SmallVec<[Event; 8]>;

/// Holds the events of the frame being written until its SYN_REPORT.
///
/// Other SYN codes stay inside the frame. A SYN_REPORT that closes an empty
/// frame produces nothing.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Frame,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `event`. Returns the finished frame when `event` ends it.
    pub fn push(&mut self, event: Event) -> Option<Frame> {
        if !event.is_sync_report() {
            self.pending.push(event);
            return None;
        }
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    /// Drop the unfinished frame. Returns how many events were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn pending(&self) -> &[Event] {
        &self.pending
    }
}
