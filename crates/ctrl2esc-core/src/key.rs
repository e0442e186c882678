// ctrl2esc Key Type
// Represents a single key code from Linux input-event-codes.h

use std::fmt;

/// Represents a single keyboard key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const RESERVED: Key = Key(0);
    pub const ESC: Key = Key(1);
    pub const Q: Key = Key(16);
    pub const A: Key = Key(30);
    pub const LEFT_CTRL: Key = Key(29);
    pub const GRAVE: Key = Key(41);
    pub const LEFT_SHIFT: Key = Key(42);
    pub const RIGHT_SHIFT: Key = Key(54);
    pub const LEFT_ALT: Key = Key(56);
    pub const SPACE: Key = Key(57);
    pub const CAPSLOCK: Key = Key(58);
    pub const RIGHT_CTRL: Key = Key(97);
    pub const RIGHT_ALT: Key = Key(100);
    pub const LEFT_META: Key = Key(125);
    pub const WLAN: Key = Key(238);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key, or `None` for codes without a known name
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl From<Key> for evdev::Key {
    fn from(key: Key) -> Self {
        evdev::Key::new(key.0)
    }
}

impl From<evdev::Key> for Key {
    fn from(key: evdev::Key) -> Self {
        Key(key.code())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "KEY_{}", self.0),
        }
    }
}

// Only the keys this program reasons about or logs regularly.
const KEY_NAMES: &[(u16, &str)] = &[
    (0, "RESERVED"),
    (1, "ESC"),
    (16, "Q"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (41, "GRAVE"),
    (42, "LEFT_SHIFT"),
    (44, "Z"),
    (54, "RIGHT_SHIFT"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPSLOCK"),
    (97, "RIGHT_CTRL"),
    (100, "RIGHT_ALT"),
    (125, "LEFT_META"),
    (126, "RIGHT_META"),
    (238, "WLAN"),
];
