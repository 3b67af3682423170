use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    MalformedInstruction,
    UnsupportedAudio,
    PayloadTooLarge,
    Internal,
}

/// Error payload returned by the processing service.
///
/// Clients only rely on `error`; `code` is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("malformed instruction token {index} ('{token}'): {reason}")]
    MalformedInstruction {
        index: usize,
        token: String,
        reason: String,
    },
}

impl InstructionError {
    pub(crate) fn malformed(index: usize, token: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInstruction {
            index,
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<InstructionError> for ApiError {
    fn from(value: InstructionError) -> Self {
        Self::new(ErrorCode::MalformedInstruction, value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown adjustment type '{0}'")]
pub struct UnknownAdjustmentKind(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown control id {0}")]
    UnknownControl(u32),
    #[error("duplicate control id {0}")]
    DuplicateControl(u32),
    #[error("control {id} value {value} is outside 0..={max}")]
    ValueOutOfRange { id: u32, value: u32, max: u32 },
}
