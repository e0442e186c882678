// ctrl2esc Remap Policy
// The fixed remapping table expressed as plain data

use crate::Key;

/// A modifier whose held state is tracked by the remapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedModifier {
    LeftAlt,
    RightAlt,
    LeftShift,
    RightShift,
}

impl TrackedModifier {
    pub const ALL: [TrackedModifier; 4] = [
        TrackedModifier::LeftAlt,
        TrackedModifier::RightAlt,
        TrackedModifier::LeftShift,
        TrackedModifier::RightShift,
    ];
}

/// One-way substitution of one key for another on press, release and repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySwap {
    pub from: Key,
    pub to: Key,
}

/// The remapping table.
///
/// The program only ever runs with [`RemapPolicy::CTRL_TO_ESC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapPolicy {
    /// Key substituted on every transition
    pub swap: KeySwap,
    /// Modifier whose solitary tap is reinterpreted
    pub tap_key: Key,
    /// Key synthesized when `tap_key` is tapped alone
    pub substitute: Key,
    /// Modifiers that turn a `tap_key` press into a chord
    pub modifiers: [(TrackedModifier, Key); 4],
    /// Keys advertised on the synthetic device even if the physical one lacks them
    pub extra_capabilities: &'static [Key],
    /// Keys never advertised on the synthetic device
    pub excluded_capabilities: &'static [Key],
}

impl RemapPolicy {
    /// ESC types GRAVE, and LEFT_CTRL tapped alone types ESC.
    pub const CTRL_TO_ESC: RemapPolicy = RemapPolicy {
        swap: KeySwap {
            from: Key::ESC,
            to: Key::GRAVE,
        },
        tap_key: Key::LEFT_CTRL,
        substitute: Key::ESC,
        modifiers: [
            (TrackedModifier::LeftAlt, Key::LEFT_ALT),
            (TrackedModifier::RightAlt, Key::RIGHT_ALT),
            (TrackedModifier::LeftShift, Key::LEFT_SHIFT),
            (TrackedModifier::RightShift, Key::RIGHT_SHIFT),
        ],
        extra_capabilities: &[Key::CAPSLOCK],
        excluded_capabilities: &[Key::WLAN],
    };

    /// The tracked modifier bound to `key`, if any
    pub fn tracked_modifier(&self, key: Key) -> Option<TrackedModifier> {
        self.modifiers
            .iter()
            .find(|(_, bound)| *bound == key)
            .map(|(modifier, _)| *modifier)
    }

    /// Keys the synthetic device must advertise regardless of the source device
    pub fn required_keys(&self) -> Vec<Key> {
        let mut keys = vec![self.swap.from, self.swap.to, self.tap_key, self.substitute];
        keys.extend_from_slice(self.extra_capabilities);
        keys.sort();
        keys.dedup();
        keys
    }

    /// Keys whose presence on a device makes it worth remapping
    pub fn qualifying_keys(&self) -> [Key; 2] {
        [self.tap_key, self.swap.from]
    }
}

impl Default for RemapPolicy {
    fn default() -> Self {
        Self::CTRL_TO_ESC
    }
}
