// ctrl2esc Modifier State
// Per-session memory of held modifiers and the last emitted key event

use super::policy::TrackedModifier;
use crate::Event;

/// State threaded through every call of [`remap`](super::remap).
///
/// One instance exists per device session and is only ever touched by that
/// session's read loop, in event arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub left_alt: bool,
    pub right_alt: bool,
    pub left_shift: bool,
    pub right_shift: bool,
    /// The tap-candidate key is currently down
    pub tap_key_held: bool,
    /// Some modifier was already active when the tap-candidate key went down
    pub chorded_at_press: bool,
    /// Last key-class event written for a key-class input
    pub last_key_event: Option<Event>,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, modifier: TrackedModifier) -> bool {
        match modifier {
            TrackedModifier::LeftAlt => self.left_alt,
            TrackedModifier::RightAlt => self.right_alt,
            TrackedModifier::LeftShift => self.left_shift,
            TrackedModifier::RightShift => self.right_shift,
        }
    }

    pub fn set_held(&mut self, modifier: TrackedModifier, held: bool) {
        let flag = match modifier {
            TrackedModifier::LeftAlt => &mut self.left_alt,
            TrackedModifier::RightAlt => &mut self.right_alt,
            TrackedModifier::LeftShift => &mut self.left_shift,
            TrackedModifier::RightShift => &mut self.right_shift,
        };
        *flag = held;
    }

    /// Whether anything that makes a tap-key press a chord is active
    pub fn any_modifier_active(&self) -> bool {
        TrackedModifier::ALL.iter().any(|m| self.is_held(*m)) || self.tap_key_held
    }
}
