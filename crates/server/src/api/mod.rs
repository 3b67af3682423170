use std::sync::Arc;

use audio_core::AudioError;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use shared::{
    error::{ApiError, ErrorCode},
    instruction::{self, SpeedAdjustment},
    protocol::{processed_filename, HealthResponse, FILE_FIELD, INSTRUCTIONS_FIELD},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app_state::AppState;

pub(crate) const MAX_FILENAME_BYTES: usize = 180;

pub(crate) type HttpError = (StatusCode, Json<ApiError>);

struct AudioSubmission {
    filename: String,
    bytes: Bytes,
    instructions: Option<String>,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub(crate) async fn process_audio(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, HttpError> {
    let request_id = Uuid::new_v4();
    let submission = read_submission(multipart).await?;
    let filename = validate_filename(&submission.filename)?.to_string();
    if submission.bytes.is_empty() {
        return Err(validation("audio file cannot be empty"));
    }

    let adjustments = parse_instructions(submission.instructions.as_deref())?;
    info!(
        %request_id,
        %filename,
        bytes = submission.bytes.len(),
        adjustments = adjustments.len(),
        "processing audio"
    );

    let processor = state.processor.clone();
    let content_type = processor.content_type();
    let input = submission.bytes;
    let output = tokio::task::spawn_blocking(move || processor.process(&input, &adjustments))
        .await
        .map_err(|join_error| {
            error!(%request_id, %join_error, "audio processing task failed");
            internal("audio processing task failed")
        })?
        .map_err(|audio_error| {
            warn!(%request_id, %audio_error, "audio processing rejected");
            audio_failure(audio_error)
        })?;

    let download_name = processed_filename(&filename);
    info!(%request_id, %download_name, bytes = output.len(), "audio processed");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{download_name}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, output).into_response())
}

async fn read_submission(mut multipart: Multipart) -> Result<AudioSubmission, HttpError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut instructions = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_failure)?;
                file = Some((filename, bytes));
            }
            INSTRUCTIONS_FIELD => {
                instructions = Some(field.text().await.map_err(multipart_failure)?);
            }
            other => debug!(field = other, "ignoring unexpected multipart field"),
        }
    }

    let (filename, bytes) = file.ok_or_else(|| validation("missing 'file' field"))?;
    Ok(AudioSubmission {
        filename,
        bytes,
        instructions,
    })
}

fn validate_filename(raw: &str) -> Result<&str, HttpError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(validation("uploaded file must have a file name"));
    }
    if name.len() > MAX_FILENAME_BYTES {
        return Err(validation("filename is too long"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(validation("filename must not contain path separators"));
    }
    if name.contains('"') || name.chars().any(char::is_control) {
        return Err(validation("filename must not contain quotes or control characters"));
    }
    Ok(name)
}

fn parse_instructions(raw: Option<&str>) -> Result<Vec<SpeedAdjustment>, HttpError> {
    match raw {
        Some(text) if !text.is_empty() => {
            instruction::decode(text).map_err(|e| (StatusCode::BAD_REQUEST, Json(e.into())))
        }
        _ => Ok(Vec::new()),
    }
}

fn validation(message: impl Into<String>) -> HttpError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

fn internal(message: impl Into<String>) -> HttpError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(ErrorCode::Internal, message)),
    )
}

fn multipart_failure(err: MultipartError) -> HttpError {
    let status = err.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::PayloadTooLarge
    } else {
        ErrorCode::Validation
    };
    (status, Json(ApiError::new(code, err.body_text())))
}

fn audio_failure(err: AudioError) -> HttpError {
    match err {
        AudioError::FactorOutOfRange { .. } => validation(err.to_string()),
        AudioError::TooManySamples { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ApiError::new(ErrorCode::PayloadTooLarge, err.to_string())),
        ),
        AudioError::UnsupportedFormat(_) | AudioError::Decode(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new(ErrorCode::UnsupportedAudio, err.to_string())),
        ),
        AudioError::Wav(_) | AudioError::ResamplerSetup(_) | AudioError::Resample(_) => {
            error!(%err, "audio backend failure");
            internal(err.to_string())
        }
    }
}

/// Rewrites bodies that the upload limit layer rejects before the handler runs
/// into the usual JSON error payload.
pub(crate) async fn payload_too_large_as_json(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE || is_json {
        return response;
    }
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ApiError::new(
            ErrorCode::PayloadTooLarge,
            "upload exceeds the maximum allowed size",
        )),
    )
        .into_response()
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
