use std::path::{Path, PathBuf};

use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::Control,
    instruction,
    protocol::{
        processed_filename, ErrorBody, HealthResponse, DEFAULT_PROCESSING_ERROR, FILE_FIELD,
        HEALTH_ROUTE, INSTRUCTIONS_FIELD, PROCESS_AUDIO_ROUTE,
    },
};
use tracing::{debug, info, warn};
use url::Url;

pub mod error;

pub use error::ProcessError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// An audio file as picked by the user, with its original name.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime(&filename);
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ProcessError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ProcessError::MissingFilename)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ProcessError::ReadInput {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(filename, bytes))
    }
}

/// The service's answer, named after the upload.
#[derive(Debug, Clone)]
pub struct ProcessedAudio {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ProcessedAudio {
    pub async fn save_into(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ProcessError> {
        // Keep only the final component so a crafted name cannot escape `dir`.
        let name = Path::new(&self.filename)
            .file_name()
            .map(|name| name.to_owned())
            .ok_or(ProcessError::MissingFilename)?;
        let path = dir.as_ref().join(name);
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|source| ProcessError::WriteOutput {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved processed audio");
        Ok(path)
    }
}

pub struct ProcessingClient {
    http: Client,
    server_url: Url,
}

impl ProcessingClient {
    pub fn new(server_url: &str) -> Result<Self, ProcessError> {
        Self::with_http_client(Client::new(), server_url)
    }

    pub fn with_http_client(http: Client, server_url: &str) -> Result<Self, ProcessError> {
        let mut parsed =
            Url::parse(server_url.trim()).map_err(|source| ProcessError::InvalidServerUrl {
                url: server_url.to_string(),
                source,
            })?;
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            http,
            server_url: parsed,
        })
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, ProcessError> {
        self.server_url
            .join(route.trim_start_matches('/'))
            .map_err(|source| ProcessError::InvalidServerUrl {
                url: self.server_url.to_string(),
                source,
            })
    }

    /// Submits the file with the encoded active controls and returns the
    /// processed audio. One attempt; any failure is returned as-is.
    pub async fn process(
        &self,
        upload: AudioUpload,
        controls: &[Control],
    ) -> Result<ProcessedAudio, ProcessError> {
        let instructions = instruction::encode(controls);
        let output_name = processed_filename(&upload.filename);
        let url = self.endpoint(PROCESS_AUDIO_ROUTE)?;
        info!(
            %url,
            filename = %upload.filename,
            bytes = upload.bytes.len(),
            instructions = %instructions,
            "submitting audio for processing"
        );

        let form = build_form(upload, &instructions)?;
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.bytes().await?;
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(ErrorBody::message_or_default)
                .unwrap_or_else(|_| DEFAULT_PROCESSING_ERROR.to_string());
            warn!(%status, %message, "processing request rejected");
            return Err(ProcessError::Server { status, message });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        debug!(bytes = bytes.len(), ?content_type, "received processed audio");

        Ok(ProcessedAudio {
            filename: output_name,
            content_type,
            bytes,
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ProcessError> {
        let health: HealthResponse = self
            .http
            .get(self.endpoint(HEALTH_ROUTE)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !health.is_ok() {
            return Err(ProcessError::Unhealthy(health.status));
        }
        Ok(health)
    }
}

/// Multipart body for one submission. `instructions` is only attached when
/// at least one control is active.
pub fn build_form(upload: AudioUpload, instructions: &str) -> Result<Form, ProcessError> {
    let mime = upload
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file = Part::bytes(upload.bytes)
        .file_name(upload.filename)
        .mime_str(&mime)?;
    let form = Form::new().part(FILE_FIELD, file);
    if instructions.is_empty() {
        return Ok(form);
    }
    Ok(form.text(INSTRUCTIONS_FIELD, instructions.to_string()))
}

fn guess_mime(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
