// Google Drive multipart upload for generated media

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_config::DriveConfig;
use crate::utils::ServiceError;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive error: {0}")]
    Upstream(String),
}

impl From<DriveError> for ServiceError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::Http(e) => ServiceError::UpstreamFailure(e.to_string()),
            DriveError::Upstream(m) => ServiceError::UpstreamFailure(m),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileMetadata {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<String>,
}

/// Uploaded file handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

/// Uploads generated media to a shared Drive folder
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    config: DriveConfig,
}

impl DriveClient {
    pub fn new(config: DriveConfig) -> Self {
        DriveClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Multipart upload: a JSON metadata part naming the file and folder,
    /// then the media bytes.
    pub async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DriveFile, DriveError> {
        let metadata = FileMetadata {
            name: file_name.to_string(),
            parents: if self.config.folder_id.is_empty() {
                Vec::new()
            } else {
                vec![self.config.folder_id.clone()]
            },
        };

        let metadata_part = reqwest::multipart::Part::text(
            serde_json::to_string(&metadata)
                .map_err(|e| DriveError::Upstream(format!("metadata encode: {}", e)))?,
        )
        .mime_str("application/json")
        .map_err(DriveError::Http)?;

        let media_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(DriveError::Http)?;

        let form = reqwest::multipart::Form::new()
            .part("metadata", metadata_part)
            .part("media", media_part);

        let response = self
            .http
            .post(format!("{}?uploadType=multipart", self.config.upload_url))
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DriveError::Upstream(format!("{}: {}", status, text)));
        }

        let file: DriveFile = response.json().await?;
        tracing::info!(file_id = %file.id, name = %file.name, "Uploaded media to Drive");
        Ok(file)
    }

    /// Fetch remote bytes for a re-upload from an http source
    pub async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, DriveError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DriveError::Upstream(format!(
                "fetch {}: {}",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Guess a mime type from the file name extension, defaulting to
/// application/octet-stream
pub fn mime_from_name(name: &str) -> &'static str {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) => match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_name() {
        assert_eq!(mime_from_name("shot.PNG"), "image/png");
        assert_eq!(mime_from_name("clip.mp4"), "video/mp4");
        assert_eq!(mime_from_name("noext"), "application/octet-stream");
        assert_eq!(mime_from_name("a.b.jpeg"), "image/jpeg");
    }
}
