// ctrl2esc Remap Scenarios
//
// Whole key sequences as a user types them, fed through one engine per
// scenario. Only the events produced by the final input are asserted
// unless stated otherwise.
//
// Run with: cargo test --test remap_scenarios

use ctrl2esc_core::event::{EventClass, MSC_SCAN, SYN_DROPPED};
use ctrl2esc_core::transform::TrackedModifier;
use ctrl2esc_core::{Action, Event, Key, RemapEngine, RemapPolicy};

// =========================================================================
// Test Helpers
// =========================================================================

fn engine() -> RemapEngine {
    RemapEngine::new(RemapPolicy::CTRL_TO_ESC)
}

/// Feed every event and return the output of the last one
fn feed(engine: &mut RemapEngine, inputs: &[Event]) -> Vec<Event> {
    let mut last = Vec::new();
    for input in inputs {
        last = engine.process(input).into_vec();
    }
    last
}

/// Feed every event and return everything written, in order
fn feed_all(engine: &mut RemapEngine, inputs: &[Event]) -> Vec<Event> {
    inputs
        .iter()
        .flat_map(|input| engine.process(input).into_vec())
        .collect()
}

fn synthesized_escape() -> Vec<Event> {
    vec![
        Event::release(Key::LEFT_CTRL),
        Event::sync(),
        Event::press(Key::ESC),
        Event::sync(),
        Event::release(Key::ESC),
    ]
}

const MODIFIER_KEYS: [Key; 4] = [Key::LEFT_ALT, Key::RIGHT_ALT, Key::LEFT_SHIFT, Key::RIGHT_SHIFT];

// =========================================================================
// Pass-through
// =========================================================================

#[test]
fn non_key_events_pass_through_unchanged() {
    let mut engine = engine();
    let inputs = [
        Event::sync(),
        Event::new(EventClass::Sync, SYN_DROPPED, 0),
        Event::new(EventClass::Other(0x11), 0x01, 1), // EV_LED, LED_CAPSL
        Event::new(EventClass::Other(0x02), 0x00, -3), // EV_REL, REL_X
        Event::new(EventClass::Misc, 0x05, 7),         // MSC_RAW
    ];
    for input in inputs {
        assert_eq!(engine.process(&input).into_vec(), vec![input]);
    }
}

#[test]
fn scan_codes_always_produce_nothing() {
    let mut engine = engine();
    let scan = Event::new(EventClass::Misc, MSC_SCAN, 0x700e0);

    assert!(engine.process(&scan).is_empty());
    engine.process(&Event::press(Key::LEFT_CTRL));
    assert!(engine.process(&scan).is_empty());
    engine.process(&Event::press(Key::LEFT_SHIFT));
    assert!(engine.process(&scan).is_empty());
}

#[test]
fn unrelated_keys_pass_through_in_every_state() {
    let mut engine = engine();
    for action in [Action::Press, Action::Repeat, Action::Release] {
        let input = Event::key(Key::A, action);
        assert_eq!(engine.process(&input).into_vec(), vec![input]);
    }

    engine.process(&Event::press(Key::LEFT_CTRL));
    engine.process(&Event::press(Key::RIGHT_ALT));
    let input = Event::press(Key::Q);
    assert_eq!(engine.process(&input).into_vec(), vec![input]);
}

// =========================================================================
// Swapped key
// =========================================================================

#[test]
fn escape_becomes_grave_for_every_action() {
    let mut engine = engine();
    for action in [Action::Press, Action::Repeat, Action::Release] {
        assert_eq!(
            engine.process(&Event::key(Key::ESC, action)).into_vec(),
            vec![Event::key(Key::GRAVE, action)]
        );
    }
}

#[test]
fn escape_swap_ignores_modifier_state() {
    let mut engine = engine();
    engine.process(&Event::press(Key::LEFT_SHIFT));
    engine.process(&Event::press(Key::LEFT_CTRL));
    assert_eq!(
        engine.process(&Event::press(Key::ESC)).into_vec(),
        vec![Event::press(Key::GRAVE)]
    );
}

#[test]
fn grave_itself_is_not_swapped_back() {
    let mut engine = engine();
    let input = Event::press(Key::GRAVE);
    assert_eq!(engine.process(&input).into_vec(), vec![input]);
}

// =========================================================================
// Tap key repeat
// =========================================================================

#[test]
fn tap_key_repeat_is_always_muted() {
    let mut engine = engine();
    engine.process(&Event::press(Key::LEFT_CTRL));
    assert!(engine.process(&Event::repeat(Key::LEFT_CTRL)).is_empty());

    engine.process(&Event::press(Key::RIGHT_SHIFT));
    assert!(engine.process(&Event::repeat(Key::LEFT_CTRL)).is_empty());

    let mut idle = RemapEngine::default();
    assert!(idle.process(&Event::repeat(Key::LEFT_CTRL)).is_empty());
}

// =========================================================================
// Tap scenario
// =========================================================================

#[test]
fn lone_ctrl_tap_synthesizes_escape() {
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[Event::press(Key::LEFT_CTRL), Event::release(Key::LEFT_CTRL)],
    );
    assert_eq!(out, synthesized_escape());
}

#[test]
fn tap_with_sync_frames_as_the_kernel_sends_them() {
    let mut engine = engine();
    let scan = Event::new(EventClass::Misc, MSC_SCAN, 0x700e0);
    let written = feed_all(
        &mut engine,
        &[
            scan,
            Event::press(Key::LEFT_CTRL),
            Event::sync(),
            scan,
            Event::release(Key::LEFT_CTRL),
            Event::sync(),
        ],
    );

    assert_eq!(
        written,
        vec![
            Event::press(Key::LEFT_CTRL),
            Event::sync(),
            Event::release(Key::LEFT_CTRL),
            Event::sync(),
            Event::press(Key::ESC),
            Event::sync(),
            Event::release(Key::ESC),
            Event::sync(),
        ]
    );
}

#[test]
fn tap_after_repeats_still_synthesizes_escape() {
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_CTRL),
            Event::repeat(Key::LEFT_CTRL),
            Event::repeat(Key::LEFT_CTRL),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, synthesized_escape());
}

#[test]
fn consecutive_taps_each_synthesize_escape() {
    let mut engine = engine();
    for _ in 0..3 {
        let out = feed(
            &mut engine,
            &[Event::press(Key::LEFT_CTRL), Event::release(Key::LEFT_CTRL)],
        );
        assert_eq!(out, synthesized_escape());
        assert!(!engine.state().tap_key_held);
    }
}

#[test]
fn release_without_press_is_not_a_tap() {
    let mut engine = engine();
    assert_eq!(
        engine.process(&Event::release(Key::LEFT_CTRL)).into_vec(),
        vec![Event::release(Key::LEFT_CTRL)]
    );
}

// =========================================================================
// Chord scenario
// =========================================================================

#[test]
fn shift_held_at_press_suppresses_escape() {
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_SHIFT),
            Event::press(Key::LEFT_CTRL),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, vec![Event::release(Key::LEFT_CTRL)]);
}

#[test]
fn every_tracked_modifier_suppresses_escape() {
    for modifier in MODIFIER_KEYS {
        let mut engine = engine();
        let out = feed(
            &mut engine,
            &[
                Event::press(modifier),
                Event::press(Key::LEFT_CTRL),
                Event::release(Key::LEFT_CTRL),
            ],
        );
        assert_eq!(out, vec![Event::release(Key::LEFT_CTRL)], "{}", modifier);
    }
}

#[test]
fn modifier_released_before_ctrl_press_does_not_suppress() {
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_ALT),
            Event::release(Key::LEFT_ALT),
            Event::press(Key::LEFT_CTRL),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, synthesized_escape());
}

#[test]
fn modifier_pressed_during_hold_is_not_a_tap() {
    // Ctrl+Shift: the shift press becomes the last key event
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_CTRL),
            Event::press(Key::LEFT_SHIFT),
            Event::release(Key::LEFT_SHIFT),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, vec![Event::release(Key::LEFT_CTRL)]);
}

#[test]
fn untracked_modifiers_do_not_latch_a_chord() {
    // Right Ctrl and Meta are not tracked; only the interleaving rule applies
    for other in [Key::RIGHT_CTRL, Key::LEFT_META] {
        let mut engine = engine();
        let out = feed(
            &mut engine,
            &[
                Event::press(other),
                Event::press(Key::LEFT_CTRL),
                Event::release(Key::LEFT_CTRL),
            ],
        );
        assert_eq!(out, synthesized_escape(), "{}", other);
    }
}

// =========================================================================
// Interleaved-key scenario
// =========================================================================

#[test]
fn ctrl_combo_with_other_key_is_not_a_tap() {
    // Ctrl+C with no tracked modifier set
    let mut engine = engine();
    let c = Key::from(46);
    let written = feed_all(
        &mut engine,
        &[
            Event::press(Key::LEFT_CTRL),
            Event::press(c),
            Event::release(c),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(
        written,
        vec![
            Event::press(Key::LEFT_CTRL),
            Event::press(c),
            Event::release(c),
            Event::release(Key::LEFT_CTRL),
        ]
    );
    assert!(!engine.state().any_modifier_active());
}

#[test]
fn escape_pressed_during_hold_is_not_a_tap() {
    let mut engine = engine();
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_CTRL),
            Event::press(Key::ESC),
            Event::release(Key::ESC),
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, vec![Event::release(Key::LEFT_CTRL)]);
}

#[test]
fn scan_codes_between_press_and_release_do_not_break_a_tap() {
    let mut engine = engine();
    let scan = Event::new(EventClass::Misc, MSC_SCAN, 0x700e0);
    let out = feed(
        &mut engine,
        &[
            Event::press(Key::LEFT_CTRL),
            scan,
            Event::release(Key::LEFT_CTRL),
        ],
    );
    assert_eq!(out, synthesized_escape());
}

// =========================================================================
// Modifier flag idempotence
// =========================================================================

#[test]
fn modifier_flags_track_press_and_release() {
    let mut engine = engine();
    let modifiers = TrackedModifier::ALL;

    for (round, (&modifier, &key)) in modifiers.iter().zip(MODIFIER_KEYS.iter()).enumerate() {
        for _ in 0..=round {
            engine.process(&Event::press(key));
            assert!(engine.state().is_held(modifier));
            engine.process(&Event::press(key));
            engine.process(&Event::repeat(key));
            assert!(engine.state().is_held(modifier));
            engine.process(&Event::press(Key::A));
            engine.process(&Event::release(Key::A));
            assert!(engine.state().is_held(modifier));
            engine.process(&Event::release(key));
            assert!(!engine.state().is_held(modifier));
            engine.process(&Event::release(key));
            assert!(!engine.state().is_held(modifier));
        }
    }
    assert!(!engine.state().any_modifier_active());
}

#[test]
fn modifier_flags_are_independent() {
    let mut engine = engine();
    engine.process(&Event::press(Key::LEFT_ALT));
    engine.process(&Event::press(Key::RIGHT_SHIFT));
    engine.process(&Event::release(Key::LEFT_ALT));

    let state = engine.state();
    assert!(!state.left_alt);
    assert!(!state.right_alt);
    assert!(!state.left_shift);
    assert!(state.right_shift);
}

#[test]
fn modifier_events_pass_through() {
    let mut engine = engine();
    for key in MODIFIER_KEYS {
        for action in [Action::Press, Action::Repeat, Action::Release] {
            let input = Event::key(key, action);
            assert_eq!(engine.process(&input).into_vec(), vec![input]);
        }
    }
}

// =========================================================================
// Engine bookkeeping
// =========================================================================

#[test]
fn sessions_do_not_share_state() {
    let mut first = engine();
    let mut second = engine();

    first.process(&Event::press(Key::LEFT_SHIFT));
    first.process(&Event::press(Key::LEFT_CTRL));
    second.process(&Event::press(Key::LEFT_CTRL));

    assert_eq!(
        first.process(&Event::release(Key::LEFT_CTRL)).into_vec(),
        vec![Event::release(Key::LEFT_CTRL)]
    );
    assert_eq!(
        second.process(&Event::release(Key::LEFT_CTRL)).into_vec(),
        synthesized_escape()
    );
}
