//! Turning backend answers into chat messages.
//!
//! Nothing in here may fail: a malformed body degrades to a text-only
//! message instead of an error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use gachadiff_domain::{CharacterProfile, UserId};
use serde_json::Value;

use crate::infrastructure::ports::{Attachment, RenderedMessage};

use super::JobOutcome;

/// Discord mention markup.
pub fn mention(user_id: UserId) -> String {
    format!("<@{user_id}>")
}

/// The most useful human-readable error text in a backend body.
pub fn error_detail(body: &Value) -> Option<String> {
    ["error", "detail", "errors", "message", "text"]
        .iter()
        .find_map(|key| match body.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
}

/// Message for a non-2xx outcome.
pub fn failure_message(outcome: &JobOutcome, user_id: UserId) -> RenderedMessage {
    let mut content = format!(
        "{} your `{}` job failed: {} {}",
        mention(user_id),
        outcome.kind,
        outcome.status,
        outcome.reason
    );
    if let Some(detail) = error_detail(&outcome.body) {
        content.push_str("\n> ");
        content.push_str(&detail);
    }
    RenderedMessage::text(content)
}

/// Decode the first image of a txt2img answer.
pub fn first_image(body: &Value, filename: &str) -> Option<Attachment> {
    let encoded = body.get("images")?.get(0)?.as_str()?;
    // Some backends prefix a data URL header
    let encoded = match encoded.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => encoded,
    };
    match STANDARD.decode(encoded.trim()) {
        Ok(data) if !data.is_empty() => Some(Attachment {
            filename: filename.to_string(),
            data,
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Backend returned an image that is not valid base64");
            None
        }
    }
}

/// Text message plus the first image, noting when no image came back.
pub fn with_image(mut content: String, body: &Value, filename: &str) -> RenderedMessage {
    let attachment = first_image(body, filename);
    if attachment.is_none() {
        content.push_str("\n(no image was returned)");
    }
    RenderedMessage::text(content).with_attachment(attachment)
}

/// Multi-line character card.
pub fn profile_card(profile: &CharacterProfile) -> String {
    format!(
        "{}\n{}\nTotal power: {}",
        profile.headline(),
        profile.stats,
        profile.stats.total()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_first_image() {
        let body = json!({ "images": [STANDARD.encode(b"png-bytes"), "ignored"] });
        let attachment = first_image(&body, "out.png").unwrap();
        assert_eq!(attachment.filename, "out.png");
        assert_eq!(attachment.data, b"png-bytes");
    }

    #[test]
    fn accepts_data_url_prefix() {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(b"abc"));
        let body = json!({ "images": [data_url] });
        assert_eq!(first_image(&body, "x.png").unwrap().data, b"abc");
    }

    #[test]
    fn garbage_image_is_dropped_not_fatal() {
        let body = json!({ "images": ["%%% not base64 %%%"] });
        assert!(first_image(&body, "x.png").is_none());

        let message = with_image("done".to_string(), &body, "x.png");
        assert!(message.attachment.is_none());
        assert!(message.content.contains("no image"));
    }

    #[test]
    fn error_detail_prefers_error_field() {
        assert_eq!(
            error_detail(&json!({ "error": "OutOfMemory", "detail": "x" })).as_deref(),
            Some("OutOfMemory")
        );
        assert_eq!(
            error_detail(&json!({ "detail": [{"msg": "field required"}] })).as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );
        assert_eq!(error_detail(&Value::Null), None);
    }
}
