//! Instruction strings sent to the processing service.
//!
//! ```text
//! token       := type ":" value ":" pitchflag ";"
//! type        := "SLOW" | "SPEED"
//! value       := 1*DIGIT
//! pitchflag   := "PITCH" | "NOPITCH"
//! instruction := *token
//! ```
//!
//! The encoder does not range-check values. Callers keep them in `0..=100`
//! (see [`crate::domain::ControlSet::set_value`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{AdjustmentKind, Control},
    error::InstructionError,
};

const TOKEN_TERMINATOR: char = ';';
const FIELD_SEPARATOR: char = ':';
const PITCH_FLAG: &str = "PITCH";
const NO_PITCH_FLAG: &str = "NOPITCH";

/// One decoded token. Control ids are not part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedAdjustment {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub value: u32,
    pub pitch_preserved: bool,
}

impl SpeedAdjustment {
    pub fn new(kind: AdjustmentKind, value: u32, pitch_preserved: bool) -> Self {
        Self {
            kind,
            value,
            pitch_preserved,
        }
    }
}

impl From<&Control> for SpeedAdjustment {
    fn from(control: &Control) -> Self {
        Self::new(control.kind, control.value, control.pitch_preserved)
    }
}

impl fmt::Display for SpeedAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pitch = if self.pitch_preserved {
            PITCH_FLAG
        } else {
            NO_PITCH_FLAG
        };
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{pitch}{TOKEN_TERMINATOR}",
            self.kind, self.value
        )
    }
}

/// Serializes the active controls, in order, into an instruction string.
///
/// Returns an empty string when no control is active.
pub fn encode(controls: &[Control]) -> String {
    controls
        .iter()
        .filter(|control| control.is_active())
        .map(|control| SpeedAdjustment::from(control).to_string())
        .collect()
}

/// Parses an instruction string, failing on the first malformed token.
pub fn decode(instruction: &str) -> Result<Vec<SpeedAdjustment>, InstructionError> {
    let mut segments: Vec<&str> = instruction.split(TOKEN_TERMINATOR).collect();
    if segments.last().is_some_and(|last| last.is_empty()) {
        segments.pop();
    }

    segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| decode_token(index, segment))
        .collect()
}

fn decode_token(index: usize, segment: &str) -> Result<SpeedAdjustment, InstructionError> {
    let fields: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
    let [kind, value, pitch] = fields.as_slice() else {
        return Err(InstructionError::malformed(
            index,
            segment,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    };

    let kind = kind
        .parse::<AdjustmentKind>()
        .map_err(|e| InstructionError::malformed(index, segment, e.to_string()))?;

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InstructionError::malformed(
            index,
            segment,
            format!("value '{value}' is not a non-negative integer"),
        ));
    }
    let value = value.parse::<u32>().map_err(|_| {
        InstructionError::malformed(index, segment, format!("value '{value}' is too large"))
    })?;

    let pitch_preserved = match *pitch {
        PITCH_FLAG => true,
        NO_PITCH_FLAG => false,
        other => {
            return Err(InstructionError::malformed(
                index,
                segment,
                format!("unknown pitch flag '{other}'"),
            ))
        }
    };

    Ok(SpeedAdjustment {
        kind,
        value,
        pitch_preserved,
    })
}

#[cfg(test)]
#[path = "tests/instruction_tests.rs"]
mod tests;
