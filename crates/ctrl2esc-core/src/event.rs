// ctrl2esc Event Model
// Immutable input event values compared purely by field equality

use std::fmt;

use crate::Key;

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type code
pub const EV_KEY: u16 = 0x01;
/// EV_MSC event type code
pub const EV_MSC: u16 = 0x04;

/// End of an event frame
pub const SYN_REPORT: u16 = 0;
/// The kernel buffer overflowed and events were lost
pub const SYN_DROPPED: u16 = 3;
/// Raw scan code reported alongside key events
pub const MSC_SCAN: u16 = 4;

/// Represents the action state of a key event.
///
/// From `evtest` output, the "magic numbers" for assignment to enums:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    /// Create Action from the raw event value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Action::Release),
            1 => Some(Action::Press),
            2 => Some(Action::Repeat),
            _ => None,
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Release => write!(f, "release"),
            Action::Press => write!(f, "press"),
            Action::Repeat => write!(f, "repeat"),
        }
    }
}

/// The class of an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Frame markers (`EV_SYN`)
    Sync,
    /// Key and button transitions (`EV_KEY`)
    Key,
    /// Miscellaneous data such as scan codes (`EV_MSC`)
    Misc,
    /// Any other event type, carried through untouched
    Other(u16),
}

impl EventClass {
    pub fn from_type(event_type: u16) -> Self {
        match event_type {
            EV_SYN => EventClass::Sync,
            EV_KEY => EventClass::Key,
            EV_MSC => EventClass::Misc,
            other => EventClass::Other(other),
        }
    }

    pub fn type_code(self) -> u16 {
        match self {
            EventClass::Sync => EV_SYN,
            EventClass::Key => EV_KEY,
            EventClass::Misc => EV_MSC,
            EventClass::Other(code) => code,
        }
    }
}

/// A single hardware event: class, code and value.
///
/// Timestamps are not carried; two events are equal when their
/// three fields are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl Event {
    pub const fn new(class: EventClass, code: u16, value: i32) -> Self {
        Self { class, code, value }
    }

    /// A key event for `key` with the given action
    pub const fn key(key: Key, action: Action) -> Self {
        Self::new(EventClass::Key, key.0, action as i32)
    }

    pub const fn press(key: Key) -> Self {
        Self::key(key, Action::Press)
    }

    pub const fn release(key: Key) -> Self {
        Self::key(key, Action::Release)
    }

    pub const fn repeat(key: Key) -> Self {
        Self::key(key, Action::Repeat)
    }

    /// `SYN_REPORT`, the end-of-frame marker
    pub const fn sync() -> Self {
        Self::new(EventClass::Sync, SYN_REPORT, 0)
    }

    pub fn is_key(&self) -> bool {
        self.class == EventClass::Key
    }

    pub fn is_sync_report(&self) -> bool {
        self.class == EventClass::Sync && self.code == SYN_REPORT
    }

    pub fn is_sync_dropped(&self) -> bool {
        self.class == EventClass::Sync && self.code == SYN_DROPPED
    }

    pub fn is_scan_code(&self) -> bool {
        self.class == EventClass::Misc && self.code == MSC_SCAN
    }

    /// The key this event refers to, for key-class events
    pub fn as_key(&self) -> Option<Key> {
        self.is_key().then_some(Key(self.code))
    }

    /// The press/release/repeat action, for key-class events with a known value
    pub fn action(&self) -> Option<Action> {
        if self.is_key() {
            Action::from_i32(self.value)
        } else {
            None
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_key(), self.action()) {
            (Some(key), Some(action)) => write!(f, "{} {}", key, action),
            _ => write!(
                f,
                "type={} code={} value={}",
                self.class.type_code(),
                self.code,
                self.value
            ),
        }
    }
}

impl From<evdev::InputEvent> for Event {
    fn from(event: evdev::InputEvent) -> Self {
        Self::new(
            EventClass::from_type(event.event_type().0),
            event.code(),
            event.value(),
        )
    }
}

impl From<Event> for evdev::InputEvent {
    fn from(event: Event) -> Self {
        evdev::InputEvent::new(
            evdev::EventType(event.class.type_code()),
            event.code,
            event.value,
        )
    }
}
