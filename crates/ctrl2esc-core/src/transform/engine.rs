// ctrl2esc Remap Engine
// Transition function from one input event to the events written out
//
// Rules, applied in order:
// - MSC_SCAN events are dropped
// - non-key events pass through
// - the swapped key is rewritten on press, release and repeat
// - tracked modifiers pass through and update their held flag
// - the tap key passes through on press, is muted on repeat, and on release
//   is followed by a synthesized substitute keystroke when it was tapped alone

use smallvec::SmallVec;

use super::policy::RemapPolicy;
use super::state::ModifierState;
use crate::{Action, Event};

/// Longest output a single input can produce (the synthesized tap)
pub const MAX_OUTPUT_EVENTS: usize = 5;

/// Events produced for one input event, in write order
pub type RemapOutput = SmallVec<[Event; MAX_OUTPUT_EVENTS]>;

/// Map one input event to its output events, updating `state` in place.
///
/// Total and deterministic: unknown codes and values pass through unchanged.
pub fn remap(policy: &RemapPolicy, state: &mut ModifierState, input: &Event) -> RemapOutput {
    let mut output = RemapOutput::new();

    if input.is_scan_code() {
        return output;
    }

    let (key, action) = match (input.as_key(), input.action()) {
        (Some(key), Some(action)) => (key, action),
        (Some(_), None) => {
            // Key event with an out-of-range value
            output.push(*input);
            state.last_key_event = Some(*input);
            return output;
        }
        _ => {
            output.push(*input);
            return output;
        }
    };

    if key == policy.swap.from {
        output.push(Event::key(policy.swap.to, action));
    } else if let Some(modifier) = policy.tracked_modifier(key) {
        match action {
            Action::Press => state.set_held(modifier, true),
            Action::Release => state.set_held(modifier, false),
            Action::Repeat => {}
        }
        output.push(*input);
    } else if key == policy.tap_key {
        match action {
            Action::Press => {
                state.chorded_at_press = state.any_modifier_active();
                state.tap_key_held = true;
                output.push(*input);
            }
            Action::Repeat => {}
            Action::Release => {
                let tapped = !state.chorded_at_press
                    && state.last_key_event == Some(Event::press(policy.tap_key));
                state.tap_key_held = false;
                output.push(*input);
                if tapped {
                    output.push(Event::sync());
                    output.push(Event::press(policy.substitute));
                    output.push(Event::sync());
                    output.push(Event::release(policy.substitute));
                }
            }
        }
    } else {
        output.push(*input);
    }

    if let Some(last) = output.last() {
        state.last_key_event = Some(*last);
    }
    output
}

/// A policy bundled with the state of one device session.
#[derive(Debug, Clone, Default)]
pub struct RemapEngine {
    policy: RemapPolicy,
    state: ModifierState,
}

impl RemapEngine {
    pub fn new(policy: RemapPolicy) -> Self {
        Self {
            policy,
            state: ModifierState::new(),
        }
    }

    /// Process one input event through the transition function
    pub fn process(&mut self, input: &Event) -> RemapOutput {
        let output = remap(&self.policy, &mut self.state, input);
        log::trace!("remap {} -> {:?}", input, output.as_slice());
        output
    }

    pub fn policy(&self) -> &RemapPolicy {
        &self.policy
    }

    pub fn state(&self) -> &ModifierState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventClass, MSC_SCAN, SYN_DROPPED};
    use crate::Key;

    fn run(state: &mut ModifierState, input: Event) -> Vec<Event> {
        remap(&RemapPolicy::CTRL_TO_ESC, state, &input).into_vec()
    }

    #[test]
    fn test_scan_codes_are_dropped() {
        let mut state = ModifierState::new();
        let scan = Event::new(EventClass::Misc, MSC_SCAN, 0x70029);
        assert!(run(&mut state, scan).is_empty());
        assert_eq!(state, ModifierState::new());
    }

    #[test]
    fn test_other_misc_codes_pass_through() {
        let mut state = ModifierState::new();
        let timestamp = Event::new(EventClass::Misc, 0x05, 1234);
        assert_eq!(run(&mut state, timestamp), vec![timestamp]);
    }

    #[test]
    fn test_non_key_events_pass_through_without_touching_history() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_CTRL));
        for event in [
            Event::sync(),
            Event::new(EventClass::Sync, SYN_DROPPED, 0),
            Event::new(EventClass::Other(0x11), 1, 1),
        ] {
            assert_eq!(run(&mut state, event), vec![event]);
        }
        assert_eq!(state.last_key_event, Some(Event::press(Key::LEFT_CTRL)));
    }

    #[test]
    fn test_swap_rewrites_every_action() {
        let mut state = ModifierState::new();
        assert_eq!(run(&mut state, Event::press(Key::ESC)), vec![Event::press(Key::GRAVE)]);
        assert_eq!(run(&mut state, Event::repeat(Key::ESC)), vec![Event::repeat(Key::GRAVE)]);
        assert_eq!(run(&mut state, Event::release(Key::ESC)), vec![Event::release(Key::GRAVE)]);
    }

    #[test]
    fn test_swap_is_one_way() {
        let mut state = ModifierState::new();
        assert_eq!(run(&mut state, Event::press(Key::GRAVE)), vec![Event::press(Key::GRAVE)]);
    }

    #[test]
    fn test_modifiers_pass_through_and_track() {
        let mut state = ModifierState::new();
        assert_eq!(
            run(&mut state, Event::press(Key::RIGHT_ALT)),
            vec![Event::press(Key::RIGHT_ALT)]
        );
        assert!(state.right_alt);
        assert_eq!(
            run(&mut state, Event::repeat(Key::RIGHT_ALT)),
            vec![Event::repeat(Key::RIGHT_ALT)]
        );
        assert!(state.right_alt);
        run(&mut state, Event::release(Key::RIGHT_ALT));
        assert!(!state.right_alt);
    }

    #[test]
    fn test_tap_key_repeat_is_muted() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_CTRL));
        let before = state.clone();
        assert!(run(&mut state, Event::repeat(Key::LEFT_CTRL)).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_tap_synthesizes_substitute() {
        let mut state = ModifierState::new();
        assert_eq!(
            run(&mut state, Event::press(Key::LEFT_CTRL)),
            vec![Event::press(Key::LEFT_CTRL)]
        );
        assert_eq!(
            run(&mut state, Event::release(Key::LEFT_CTRL)),
            vec![
                Event::release(Key::LEFT_CTRL),
                Event::sync(),
                Event::press(Key::ESC),
                Event::sync(),
                Event::release(Key::ESC),
            ]
        );
        assert_eq!(state.last_key_event, Some(Event::release(Key::ESC)));
        assert!(!state.tap_key_held);
    }

    #[test]
    fn test_tap_survives_repeats_and_syncs() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_CTRL));
        run(&mut state, Event::sync());
        run(&mut state, Event::repeat(Key::LEFT_CTRL));
        run(&mut state, Event::new(EventClass::Misc, MSC_SCAN, 0x700e0));
        run(&mut state, Event::sync());
        assert_eq!(run(&mut state, Event::release(Key::LEFT_CTRL)).len(), 5);
    }

    #[test]
    fn test_chord_with_shift_is_plain_release() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_SHIFT));
        run(&mut state, Event::press(Key::LEFT_CTRL));
        assert!(state.chorded_at_press);
        assert_eq!(
            run(&mut state, Event::release(Key::LEFT_CTRL)),
            vec![Event::release(Key::LEFT_CTRL)]
        );
    }

    #[test]
    fn test_modifier_released_before_tap_key_still_chords() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_ALT));
        run(&mut state, Event::press(Key::LEFT_CTRL));
        run(&mut state, Event::release(Key::LEFT_ALT));
        assert_eq!(run(&mut state, Event::release(Key::LEFT_CTRL)).len(), 1);
    }

    #[test]
    fn test_modifier_pressed_after_tap_key_breaks_tap() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_CTRL));
        run(&mut state, Event::press(Key::LEFT_SHIFT));
        run(&mut state, Event::release(Key::LEFT_SHIFT));
        assert_eq!(run(&mut state, Event::release(Key::LEFT_CTRL)).len(), 1);
    }

    #[test]
    fn test_double_press_counts_as_chord() {
        let mut state = ModifierState::new();
        run(&mut state, Event::press(Key::LEFT_CTRL));
        run(&mut state, Event::press(Key::LEFT_CTRL));
        assert!(state.chorded_at_press);
        assert_eq!(run(&mut state, Event::release(Key::LEFT_CTRL)).len(), 1);
    }

    #[test]
    fn test_release_without_press_is_plain() {
        let mut state = ModifierState::new();
        assert_eq!(
            run(&mut state, Event::release(Key::LEFT_CTRL)),
            vec![Event::release(Key::LEFT_CTRL)]
        );
    }

    #[test]
    fn test_unknown_key_value_passes_through() {
        let mut state = ModifierState::new();
        let odd = Event::new(EventClass::Key, Key::ESC.code(), 7);
        assert_eq!(run(&mut state, odd), vec![odd]);
        assert_eq!(state.last_key_event, Some(odd));
    }

    #[test]
    fn test_engine_wraps_state() {
        let mut engine = RemapEngine::new(RemapPolicy::CTRL_TO_ESC);
        engine.process(&Event::press(Key::LEFT_SHIFT));
        assert!(engine.state().left_shift);
        engine.process(&Event::release(Key::LEFT_SHIFT));
        assert!(!engine.state().left_shift);
        assert_eq!(engine.policy().tap_key, Key::LEFT_CTRL);
    }
}
