//! Delivery of finished jobs to Discord.
//!
//! Slash commands are acknowledged immediately; the finished image arrives
//! later as a follow-up message on the interaction's webhook.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use crate::infrastructure::ports::{PostError, RenderedMessage, ResultPoster};

/// Discord rejects message content longer than this.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Posts to an interaction follow-up webhook URL.
pub struct WebhookPoster {
    client: Client,
    url: String,
}

impl WebhookPoster {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_CHARS {
        return content.to_string();
    }
    let mut truncated: String = content.chars().take(MAX_CONTENT_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

#[async_trait]
impl ResultPoster for WebhookPoster {
    async fn post(&self, message: RenderedMessage) -> Result<(), PostError> {
        let payload = serde_json::json!({ "content": truncate_content(&message.content) });

        let request = match message.attachment {
            Some(attachment) => {
                let file = Part::bytes(attachment.data)
                    .file_name(attachment.filename)
                    .mime_str("image/png")
                    .map_err(|e| PostError::RequestFailed(e.to_string()))?;
                let form = Form::new()
                    .text("payload_json", payload.to_string())
                    .part("files[0]", file);
                self.client.post(&self.url).multipart(form)
            }
            None => self.client.post(&self.url).json(&payload),
        };

        let response = request
            .send()
            .await
            .map_err(|e| PostError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PostError::Rejected { status, body });
        }

        Ok(())
    }
}

/// Logs results when a command arrived without a follow-up URL.
pub struct LogPoster;

#[async_trait]
impl ResultPoster for LogPoster {
    async fn post(&self, message: RenderedMessage) -> Result<(), PostError> {
        tracing::info!(
            content = %message.content,
            has_image = message.attachment.is_some(),
            "Job result (no follow-up URL)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_content("hello"), "hello");
    }

    #[test]
    fn long_content_is_cut_to_discord_limit() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 50);
        let cut = truncate_content(&long);
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS);
        assert!(cut.ends_with('…'));
    }

    #[tokio::test]
    async fn log_poster_always_succeeds() {
        let result = LogPoster.post(RenderedMessage::text("done")).await;
        assert!(result.is_ok());
    }
}
