//! External service port traits (image backend, Discord delivery).

use async_trait::async_trait;
use gachadiff_domain::GenerationRequest;
use serde_json::Value;

use super::error::{ImageGenError, PostError};

// =============================================================================
// Image Generation
// =============================================================================

/// What the backend answered, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub status: u16,
    pub reason: String,
    pub body: Value,
}

impl BackendResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: Value) -> Self {
        Self {
            status,
            reason: reason.into(),
            body,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenPort: Send + Sync {
    /// Lightweight GET used by diagnostic probes.
    async fn check_health(&self) -> Result<BackendResponse, ImageGenError>;

    /// Full generation POST.
    async fn generate(&self, request: GenerationRequest) -> Result<BackendResponse, ImageGenError>;
}

// =============================================================================
// Result Delivery
// =============================================================================

/// An image attached to a rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A chat message ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl RenderedMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultPoster: Send + Sync {
    async fn post(&self, message: RenderedMessage) -> Result<(), PostError>;
}
