//! Property and scenario tests for the gesture decoder.

use goofydeck_gesture::{GestureDecoder, GestureEvent, GestureKind, GestureThresholds};
use goofydeck_hid_ulanzi_protocol::{ButtonReport, InCommand};
use proptest::prelude::*;
use std::time::{Duration, Instant};

fn kinds(events: &[GestureEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e.kind {
            GestureKind::Tap => "TAP",
            GestureKind::Hold(_) => "HOLD",
            GestureKind::LongHold(_) => "LONGHOLD",
            GestureKind::Released => "RELEASED",
        })
        .collect()
}

// ═══ Scenario: reports drive the decoder ═══

#[test]
fn given_button_reports_when_decoded_then_tap_and_release_follow() {
    let t0 = Instant::now();
    let mut decoder = GestureDecoder::default();
    let press = ButtonReport {
        command: InCommand::Button,
        state: 0,
        index: 7,
        raw_press: 1,
    };
    let release = ButtonReport {
        raw_press: 0,
        ..press
    };

    assert!(decoder.on_report(&press, t0).is_empty());
    let events = decoder.on_report(&release, t0 + Duration::from_millis(120));
    let lines: Vec<String> = events.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["button 8 TAP", "button 8 RELEASED"]);
}

#[test]
fn given_out_of_range_report_when_decoded_then_nothing_happens() {
    let mut decoder = GestureDecoder::default();
    let report = ButtonReport {
        command: InCommand::Button2,
        state: 0,
        index: 20,
        raw_press: 1,
    };
    assert!(decoder.on_report(&report, Instant::now()).is_empty());
    assert!(!decoder.any_down());
}

#[test]
fn given_custom_thresholds_when_held_then_hold_fires_early() {
    let t0 = Instant::now();
    let mut decoder = GestureDecoder::new(GestureThresholds {
        hold: Duration::from_millis(100),
        longhold: Duration::from_millis(200),
    });
    decoder.on_input(0, 1, t0);
    assert_eq!(kinds(&decoder.poll_idle(t0 + Duration::from_millis(150))), ["HOLD"]);
    assert_eq!(kinds(&decoder.poll_idle(t0 + Duration::from_millis(250))), ["LONGHOLD"]);
    assert_eq!(kinds(&decoder.on_input(0, 0, t0 + Duration::from_millis(300))), ["RELEASED"]);
}

// ═══ Properties ═══

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(500))]

    /// A grid press and release with idle ticks in between yields exactly one
    /// RELEASED, TAP only for short presses, and HOLD before LONGHOLD.
    #[test]
    fn prop_grid_press_release_sequence(
        button in 0usize..13,
        held_ms in 0u64..8000,
        tick_ms in 1u64..400,
    ) {
        let t0 = Instant::now();
        let mut decoder = GestureDecoder::default();
        let mut events = decoder.on_input(button, 1, t0);

        let mut t = tick_ms;
        while t < held_ms {
            events.extend(decoder.poll_idle(t0 + Duration::from_millis(t)));
            t += tick_ms;
        }
        events.extend(decoder.on_input(button, 0, t0 + Duration::from_millis(held_ms)));

        let names = kinds(&events);
        prop_assert!(events.iter().all(|e| e.button == button));
        prop_assert_eq!(names.iter().filter(|k| **k == "RELEASED").count(), 1);
        prop_assert_eq!(names.last().copied(), Some("RELEASED"));
        prop_assert!(names.iter().filter(|k| **k == "HOLD").count() <= 1);
        prop_assert!(names.iter().filter(|k| **k == "LONGHOLD").count() <= 1);

        let tap = names.contains(&"TAP");
        prop_assert_eq!(tap, held_ms < 750);
        if let Some(long) = names.iter().position(|k| *k == "LONGHOLD") {
            let hold = names.iter().position(|k| *k == "HOLD");
            prop_assert!(hold.is_some_and(|h| h < long));
        }
        prop_assert!(!decoder.any_down());
    }

    /// Repeating the same press/release pair produces the same events.
    #[test]
    fn prop_tap_is_repeatable(button in 0usize..13, held_ms in 0u64..749, repeats in 1usize..5) {
        let mut decoder = GestureDecoder::default();
        let mut t = Instant::now();
        for _ in 0..repeats {
            prop_assert!(decoder.on_input(button, 1, t).is_empty());
            t += Duration::from_millis(held_ms);
            let names = kinds(&decoder.on_input(button, 0, t));
            prop_assert_eq!(names, vec!["TAP", "RELEASED"]);
            t += Duration::from_millis(10);
        }
    }
}
