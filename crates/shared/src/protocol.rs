use serde::{Deserialize, Serialize};

pub const PROCESS_AUDIO_ROUTE: &str = "/process-audio";
pub const HEALTH_ROUTE: &str = "/health";

/// Multipart field carrying the raw audio bytes.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the instruction string; omitted when empty.
pub const INSTRUCTIONS_FIELD: &str = "instructions";

pub const PROCESSED_PREFIX: &str = "processed_";
pub const DEFAULT_PROCESSING_ERROR: &str = "Processing failed";

pub fn processed_filename(original: &str) -> String {
    format!("{PROCESSED_PREFIX}{original}")
}

/// Error body as read by clients. `error` may be missing on foreign servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message_or_default(self) -> String {
        self.error
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROCESSING_ERROR.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
