use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{AnalysisRecord, AnalyzeImageRequest, DeleteAck, ServiceStatus},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("'{filename}' is not an image file")]
    NotAnImage { filename: String },
    #[error("file path has no filename")]
    MissingFilename,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    #[error("server returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

/// True when the filename maps to an `image/*` MIME type. Uploads are
/// gated on this before any bytes leave the client.
pub fn is_image_filename(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

/// HTTP client for the analysis backend. Paths are relative to the
/// server's `/api` prefix.
#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    server_url: String,
}

impl AnalysisClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            server_url,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn service_status(&self) -> Result<ServiceStatus, ClientError> {
        let res = self
            .http
            .get(format!("{}/api/", self.server_url))
            .send()
            .await?;
        decode(res).await
    }

    /// Reads an image from disk, base64-encodes it, and submits it for
    /// analysis. Non-image paths are rejected without touching the network.
    pub async fn analyze_path(&self, path: &Path) -> Result<AnalysisRecord, ClientError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or(ClientError::MissingFilename)?
            .to_string();
        if !is_image_filename(&filename) {
            return Err(ClientError::NotAnImage { filename });
        }
        let bytes = tokio::fs::read(path).await?;
        self.analyze_bytes(&filename, &bytes).await
    }

    pub async fn analyze_bytes(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<AnalysisRecord, ClientError> {
        let request = AnalyzeImageRequest {
            filename: filename.to_string(),
            image_base64: STANDARD.encode(bytes),
        };
        let res = self
            .http
            .post(format!("{}/api/analyze-image", self.server_url))
            .json(&request)
            .send()
            .await?;
        let record: AnalysisRecord = decode(res).await?;
        info!(filename, id = %record.id, "image analyzed");
        Ok(record)
    }

    pub async fn history(&self) -> Result<Vec<AnalysisRecord>, ClientError> {
        let res = self
            .http
            .get(format!("{}/api/analysis-history", self.server_url))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn get(&self, id: &str) -> Result<AnalysisRecord, ClientError> {
        let res = self
            .http
            .get(format!("{}/api/analysis/{id}", self.server_url))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteAck, ClientError> {
        let res = self
            .http
            .delete(format!("{}/api/analysis/{id}", self.server_url))
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    match response.json::<ApiError>().await {
        Ok(api) => Err(ClientError::Api {
            status,
            message: api.message,
        }),
        Err(_) => Err(ClientError::UnexpectedStatus(status)),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
