//! HTTP routes.
//!
//! The gateway bot forwards each slash command here and relays the
//! returned `message` as its immediate interaction reply.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use gachadiff_domain::{DomainError, GuildId, UserId, Wallet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::app::App;
use crate::jobs::{JobError, JobOptions, RequestContext};
use crate::use_cases::{DailyClaim, EconomyError};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

const DISCORD_WEBHOOK_HOSTS: &[&str] = &[
    "discord.com",
    "discordapp.com",
    "canary.discord.com",
    "ptb.discord.com",
];

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/commands", post(submit_command))
        .route("/api/economy/daily", post(claim_daily))
        .route("/api/economy/balance", get(get_balance))
        .route("/api/admin/flush", post(flush_queue))
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct CommandRequest {
    command: String,
    #[serde(flatten)]
    context: RequestContext,
    #[serde(default)]
    followup_url: Option<String>,
    #[serde(default)]
    options: JobOptions,
}

#[derive(Debug, Serialize)]
struct CommandResponse {
    message: String,
    accepted: bool,
}

async fn submit_command(
    State(app): State<Arc<App>>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let followup_url = request
        .followup_url
        .as_deref()
        .map(parse_followup_url)
        .transpose()?;

    let poster = app.poster_for(followup_url);
    let outcome = app
        .use_cases
        .submit
        .execute(&request.command, &request.context, &request.options, poster)
        .await?;

    Ok(Json(CommandResponse {
        message: outcome.message().to_string(),
        accepted: outcome.is_accepted(),
    }))
}

/// Follow-ups may only go to Discord's webhook endpoints.
fn parse_followup_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw)
        .map_err(|e| ApiError::BadRequest(format!("followup_url is not a valid URL: {e}")))?;

    let host_allowed = url
        .host_str()
        .is_some_and(|host| DISCORD_WEBHOOK_HOSTS.contains(&host));
    let is_webhook = url
        .path_segments()
        .is_some_and(|mut segments| segments.any(|segment| segment == "webhooks"));

    if url.scheme() != "https" || !host_allowed || !is_webhook {
        return Err(ApiError::BadRequest(
            "followup_url must be a Discord webhook URL".to_string(),
        ));
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct MemberQuery {
    guild_id: GuildId,
    user_id: UserId,
}

async fn claim_daily(
    State(app): State<Arc<App>>,
    Json(member): Json<MemberQuery>,
) -> Result<Json<DailyClaim>, ApiError> {
    let claim = app
        .use_cases
        .economy
        .claim_daily
        .execute(member.guild_id, member.user_id)
        .await?;
    Ok(Json(claim))
}

async fn get_balance(
    State(app): State<Arc<App>>,
    Query(member): Query<MemberQuery>,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = app
        .use_cases
        .economy
        .balance
        .execute(member.guild_id, member.user_id)
        .await?;
    Ok(Json(wallet))
}

async fn flush_queue(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(expected) = &app.admin_token {
        let provided = headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    app.queue.flush();
    Ok(StatusCode::ACCEPTED)
}

// =============================================================================
// Error Handling
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Conflict(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::Repo(e) => ApiError::Internal(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<EconomyError> for ApiError {
    fn from(e: EconomyError) -> Self {
        match e {
            EconomyError::Domain(e @ DomainError::DailyAlreadyClaimed { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            EconomyError::Domain(e) => ApiError::BadRequest(e.to_string()),
            EconomyError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}
