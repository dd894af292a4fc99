// Remote copies of exported images.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Who uploads and what.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub user_email: String,
    pub user_role: Role,
    pub file_name: String,
    pub image: Vec<u8>,
}

pub trait UploadSink: Send + Sync {
    /// Store the image; returns the identifier the store assigned.
    fn upload(&self, req: &UploadRequest) -> Result<String, UploadError>;
}

#[derive(Serialize)]
struct UploadBody<'a> {
    user_email: String,
    user_role: Role,
    file_name: &'a str,
    file_size: usize,
    image_data: String,
}

impl<'a> UploadBody<'a> {
    fn new(req: &'a UploadRequest) -> Self {
        Self {
            user_email: req.user_email.trim().to_lowercase(),
            user_role: req.user_role,
            file_name: &req.file_name,
            file_size: req.image.len(),
            image_data: STANDARD.encode(&req.image),
        }
    }
}

#[derive(Deserialize)]
struct UploadReply {
    id: String,
}

pub struct HttpUploadSink {
    base_url: String,
    client: Client,
}

impl HttpUploadSink {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let client = Client::builder()
            .user_agent("beyond-the-brush")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
    }
}

impl UploadSink for HttpUploadSink {
    fn upload(&self, req: &UploadRequest) -> Result<String, UploadError> {
        let resp = self
            .client
            .post(format!("{}/api/uploads", self.base_url))
            .json(&UploadBody::new(req))
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(UploadError::Rejected { status: status.as_u16(), message });
        }
        let reply: UploadReply = resp.json()?;
        tracing::info!(id = %reply.id, file = %req.file_name, "image uploaded");
        Ok(reply.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_encoded_copy_and_size() {
        let req = UploadRequest {
            user_email: " Ada@X.io ".into(),
            user_role: Role::Educator,
            file_name: "btb_saved_canvas_20240101_120000.png".into(),
            image: vec![0x89, b'P', b'N', b'G'],
        };
        let json = serde_json::to_value(UploadBody::new(&req)).unwrap();
        assert_eq!(json["user_email"], "ada@x.io");
        assert_eq!(json["user_role"], "educator");
        assert_eq!(json["file_size"], 4);
        assert_eq!(json["image_data"], STANDARD.encode([0x89, b'P', b'N', b'G']));
    }
}
