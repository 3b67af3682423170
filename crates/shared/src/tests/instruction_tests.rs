use super::*;
use crate::domain::{AdjustmentKind::*, ControlSet};

fn assert_malformed(input: &str) {
    let err = decode(input).expect_err("should be rejected");
    assert!(
        matches!(err, InstructionError::MalformedInstruction { .. }),
        "unexpected error for {input:?}: {err:?}"
    );
}

#[test]
fn encodes_only_active_controls_in_order() {
    let controls = [
        Control::new(1, Slow, 0, true),
        Control::new(2, Slow, 25, false),
        Control::new(3, Speed, 0, true),
        Control::new(4, Speed, 80, true),
    ];
    assert_eq!(encode(&controls), "SLOW:25:NOPITCH;SPEED:80:PITCH;");
}

#[test]
fn default_control_set_encodes_to_empty_string() {
    let controls = ControlSet::default();
    assert_eq!(encode(controls.controls()), "");
    assert_eq!(controls.instructions(), "");
}

#[test]
fn encoding_is_idempotent() {
    let controls = [Control::new(1, Speed, 10, false), Control::new(2, Slow, 3, true)];
    assert_eq!(encode(&controls), encode(&controls));
}

#[test]
fn duplicate_kinds_are_encoded_independently() {
    let controls = [Control::new(1, Slow, 10, true), Control::new(2, Slow, 20, true)];
    assert_eq!(encode(&controls), "SLOW:10:PITCH;SLOW:20:PITCH;");
}

#[test]
fn encoder_emits_out_of_range_values_verbatim() {
    let controls = [Control::new(1, Speed, 150, true)];
    assert_eq!(encode(&controls), "SPEED:150:PITCH;");
}

#[test]
fn token_count_matches_active_controls() {
    let controls = [
        Control::new(1, Slow, 5, true),
        Control::new(2, Slow, 0, false),
        Control::new(3, Speed, 7, false),
        Control::new(4, Speed, 1, true),
        Control::new(5, Slow, 0, true),
    ];
    let encoded = encode(&controls);
    assert_eq!(encoded.matches(';').count(), 3);
    assert_eq!(decode(&encoded).expect("decode").len(), 3);
}

#[test]
fn decode_recovers_triples_of_active_controls() {
    let controls = [
        Control::new(1, Slow, 0, true),
        Control::new(2, Slow, 25, false),
        Control::new(3, Speed, 100, true),
        Control::new(4, Speed, 80, false),
    ];
    let decoded = decode(&encode(&controls)).expect("decode");
    assert_eq!(
        decoded,
        vec![
            SpeedAdjustment::new(Slow, 25, false),
            SpeedAdjustment::new(Speed, 100, true),
            SpeedAdjustment::new(Speed, 80, false),
        ]
    );
}

#[test]
fn decode_empty_string_yields_no_adjustments() {
    assert!(decode("").expect("decode").is_empty());
}

#[test]
fn decode_accepts_final_token_without_terminator() {
    let decoded = decode("SLOW:10:PITCH;SPEED:5:NOPITCH").expect("decode");
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[1], SpeedAdjustment::new(Speed, 5, false));
}

#[test]
fn decode_rejects_missing_field() {
    assert_malformed("SLOW:10");
}

#[test]
fn decode_rejects_extra_field() {
    assert_malformed("SLOW:10:PITCH:EXTRA;");
}

#[test]
fn decode_rejects_unknown_type() {
    assert_malformed("FAST:10:PITCH;");
    assert_malformed("slow:10:PITCH;");
}

#[test]
fn decode_rejects_non_integer_values() {
    assert_malformed("SLOW:ten:PITCH;");
    assert_malformed("SLOW:-5:PITCH;");
    assert_malformed("SLOW:+5:PITCH;");
    assert_malformed("SLOW::PITCH;");
    assert_malformed("SLOW:99999999999:PITCH;");
}

#[test]
fn decode_rejects_unknown_pitch_flag() {
    assert_malformed("SPEED:10:pitch;");
    assert_malformed("SPEED:10:;");
}

#[test]
fn decode_rejects_empty_inner_segment() {
    assert_malformed("SLOW:10:PITCH;;SPEED:5:PITCH;");
}

#[test]
fn decode_fails_fast_and_reports_offending_token() {
    let err = decode("SLOW:10:PITCH;FAST:1:PITCH;SLOW:x:PITCH;").expect_err("malformed");
    match err {
        InstructionError::MalformedInstruction { index, token, .. } => {
            assert_eq!(index, 1);
            assert_eq!(token, "FAST:1:PITCH");
        }
    }
}
