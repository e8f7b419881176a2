use crate::models::discord::WebhookPayload;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned non-2xx status {status}. Body: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Outbound messaging endpoint for incident alerts.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Posts a new message, optionally with one file attached, and returns its id.
    async fn send(&self, payload: &WebhookPayload, attachment: Option<&Path>) -> Result<String, WebhookError>;
    /// Replaces the content of a previously posted message.
    async fn edit(&self, message_id: &str, payload: &WebhookPayload) -> Result<(), WebhookError>;
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn message_url(&self, message_id: &str) -> String {
        format!("{}/messages/{}", self.url, message_id)
    }
}

#[async_trait]
impl NotificationChannel for DiscordWebhook {
    async fn send(&self, payload: &WebhookPayload, attachment: Option<&Path>) -> Result<String, WebhookError> {
        let mut form = Form::new().text("payload_json", serde_json::to_string(payload)?);

        if let Some(path) = attachment {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| WebhookError::Attachment {
                    path: path.to_path_buf(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment.jpg".to_string());
            let part = Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg")?;
            form = form.part("files[0]", part);
        }

        let response = self
            .client
            .post(&self.url)
            .query(&[("wait", "true")])
            .multipart(form)
            .send()
            .await?;

        let message: MessageResponse = ensure_success(response).await?.json().await?;
        Ok(message.id)
    }

    async fn edit(&self, message_id: &str, payload: &WebhookPayload) -> Result<(), WebhookError> {
        let response = self
            .client
            .patch(self.message_url(message_id))
            .json(payload)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, WebhookError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WebhookError::Status { status, body })
}
