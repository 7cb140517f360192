//! Jobs: one unit of requested work plus how to present its result.
//!
//! A `Job` stays on the requester's side of the queue. Only the plain
//! `JobPayload` built from it crosses into the worker; the job itself is
//! parked in the admission table and picked up again for delivery.

mod factory;
pub mod render;

pub use factory::{JobFactory, JobOptions, RequestContext};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gachadiff_domain::{
    random_tags, CharacterProfile, DomainError, GenerationRequest, GuildId, JobId, JobKind,
    JobPayload, UserId, ROLL_COST,
};
use serde_json::Value;

use crate::infrastructure::ports::{
    BackendResponse, ProfileRepo, RandomPort, RenderedMessage, RepoError, WalletUpdateError,
};

/// Random tags mixed into a `generate` prompt when the caller asks for it.
pub const GENERATE_RANDOM_TAGS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown job type: {0}")]
    UnknownJobType(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<WalletUpdateError> for JobError {
    fn from(e: WalletUpdateError) -> Self {
        match e {
            WalletUpdateError::Rejected(e) => Self::Domain(e),
            WalletUpdateError::Repo(e) => Self::Repo(e),
        }
    }
}

impl JobError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

/// Finished backend call, reattached to its job for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub id: JobId,
    pub kind: JobKind,
    pub status: u16,
    pub reason: String,
    pub randomize: bool,
    pub body: Value,
}

impl JobOutcome {
    pub fn from_response(payload: &JobPayload, response: BackendResponse) -> Self {
        Self {
            id: payload.id,
            kind: payload.kind,
            status: response.status,
            reason: response.reason,
            randomize: payload.randomize,
            body: response.body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Identity shared by every job variant.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHeader {
    pub id: JobId,
    pub kind: JobKind,
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub randomize: bool,
    pub requested_at: DateTime<Utc>,
}

impl JobHeader {
    /// Name used in chat, falling back to a mention.
    pub fn display_name(&self) -> String {
        match &self.user_name {
            Some(name) => name.clone(),
            None => render::mention(self.user_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobBody {
    /// Free-form prompt
    Generate,
    /// New character; `persist` is false for the diagnostic variant.
    /// The profile is rolled during randomization.
    Roll {
        persist: bool,
        profile: Option<CharacterProfile>,
    },
    /// Stored (or canned) character re-rendered from its prompt and seed
    ShowProfile { profile: CharacterProfile },
    /// Backend diagnostics
    Probe,
}

/// Behavior every job variant provides to the queue.
#[async_trait]
pub trait JobBehavior: Send + Sync {
    /// Plain data handed to the worker.
    fn build_request_payload(&self) -> JobPayload;

    /// Called exactly once during admission, with the requester's slot held.
    fn apply_randomization(&mut self, random: &dyn RandomPort);

    /// Side effects after a successful backend call.
    async fn perform_local_work(
        &mut self,
        outcome: &JobOutcome,
        repo: &dyn ProfileRepo,
    ) -> Result<(), JobError>;

    /// Never fails; failures become a message describing them.
    fn render_result(&self, outcome: &JobOutcome) -> RenderedMessage;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub header: JobHeader,
    pub request: GenerationRequest,
    pub body: JobBody,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.header.id
    }

    pub fn kind(&self) -> JobKind {
        self.header.kind
    }

    pub fn guild_id(&self) -> GuildId {
        self.header.guild_id
    }

    pub fn user_id(&self) -> UserId {
        self.header.user_id
    }

    fn image_name(&self) -> String {
        format!("{}-{}.png", self.header.kind, self.header.id)
    }
}

#[async_trait]
impl JobBehavior for Job {
    fn build_request_payload(&self) -> JobPayload {
        JobPayload {
            id: self.header.id,
            kind: self.header.kind,
            guild_id: self.header.guild_id,
            user_id: self.header.user_id,
            randomize: self.header.randomize,
            request: self.request.clone(),
        }
    }

    fn apply_randomization(&mut self, random: &dyn RandomPort) {
        if !self.header.randomize {
            return;
        }
        let gen_range = |min: i32, max: i32| random.gen_range(min, max);

        match &mut self.body {
            JobBody::Generate => {
                let tags = random_tags(GENERATE_RANDOM_TAGS, gen_range);
                self.request.append_tags(tags.as_slice());
            }
            JobBody::Roll { profile, .. } => {
                let rolled = CharacterProfile::roll(
                    self.header.guild_id,
                    self.header.user_id,
                    self.header.requested_at,
                    gen_range,
                );
                self.request.prompt = rolled.prompt.clone();
                self.request.seed = rolled.seed;
                *profile = Some(rolled);
            }
            JobBody::ShowProfile { .. } | JobBody::Probe => {}
        }
    }

    async fn perform_local_work(
        &mut self,
        outcome: &JobOutcome,
        repo: &dyn ProfileRepo,
    ) -> Result<(), JobError> {
        let JobBody::Roll {
            persist: true,
            profile: Some(profile),
        } = &self.body
        else {
            return Ok(());
        };

        let wallet = repo.save_rolled_profile(profile, ROLL_COST).await?;

        tracing::info!(
            job_id = %outcome.id,
            guild_id = %self.header.guild_id,
            user_id = %self.header.user_id,
            rarity = %profile.rarity,
            balance = wallet.credits,
            "Saved rolled character"
        );
        Ok(())
    }

    fn render_result(&self, outcome: &JobOutcome) -> RenderedMessage {
        if !outcome.is_success() {
            return render::failure_message(outcome, self.header.user_id);
        }

        let who = render::mention(self.header.user_id);
        let image_name = self.image_name();

        match &self.body {
            JobBody::Generate => render::with_image(
                format!("{who} here is your image\n> {}", self.request.prompt),
                &outcome.body,
                &image_name,
            ),
            JobBody::Roll { persist, profile } => {
                let prefix = if *persist { "" } else { "[test] " };
                match profile {
                    Some(profile) => render::with_image(
                        format!(
                            "{prefix}{} rolled a new character!\n{}",
                            self.header.display_name(),
                            render::profile_card(profile)
                        ),
                        &outcome.body,
                        &image_name,
                    ),
                    None => RenderedMessage::text(format!(
                        "{prefix}{who} the roll finished without a character"
                    )),
                }
            }
            JobBody::ShowProfile { profile } => {
                let prefix = if self.header.kind.is_diagnostic() {
                    "[test] "
                } else {
                    ""
                };
                render::with_image(
                    format!(
                        "{prefix}{}'s character\n{}",
                        self.header.display_name(),
                        render::profile_card(profile)
                    ),
                    &outcome.body,
                    &image_name,
                )
            }
            JobBody::Probe => match self.header.kind {
                JobKind::TestGet => RenderedMessage::text(format!(
                    "Backend health check: {} {}",
                    outcome.status, outcome.reason
                )),
                _ => render::with_image(
                    format!(
                        "Backend test generation: {} {}",
                        outcome.status, outcome.reason
                    ),
                    &outcome.body,
                    &image_name,
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::ports::MockProfileRepo;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::TimeZone;
    use gachadiff_domain::{GenerationDefaults, Rarity, Wallet};
    use serde_json::json;

    fn header(kind: JobKind, randomize: bool) -> JobHeader {
        JobHeader {
            id: JobId::new(),
            kind,
            guild_id: GuildId::new(1),
            user_id: UserId::new(2),
            user_name: Some("Mika".to_string()),
            randomize,
            requested_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn roll_job(persist: bool) -> Job {
        let kind = if persist { JobKind::Roll } else { JobKind::TestRoll };
        Job {
            header: header(kind, true),
            request: GenerationRequest::new("", &GenerationDefaults::default()),
            body: JobBody::Roll {
                persist,
                profile: None,
            },
        }
    }

    fn outcome(job: &Job, status: u16, body: Value) -> JobOutcome {
        let reason = if status == 200 { "OK" } else { "Internal Server Error" };
        JobOutcome::from_response(
            &job.build_request_payload(),
            BackendResponse::new(status, reason, body),
        )
    }

    #[test]
    fn generate_randomization_appends_tags() {
        let mut job = Job {
            header: header(JobKind::Generate, true),
            request: GenerationRequest::new("a castle", &GenerationDefaults::default()),
            body: JobBody::Generate,
        };
        job.apply_randomization(&FixedRandom(0));

        let payload = job.build_request_payload();
        assert!(payload.request.prompt.starts_with("a castle, "));
        assert_eq!(payload.request.prompt.matches(", ").count(), GENERATE_RANDOM_TAGS);
        assert!(payload.randomize);
    }

    #[test]
    fn no_randomization_without_flag() {
        let mut job = Job {
            header: header(JobKind::Generate, false),
            request: GenerationRequest::new("a castle", &GenerationDefaults::default()),
            body: JobBody::Generate,
        };
        job.apply_randomization(&FixedRandom(0));
        assert_eq!(job.request.prompt, "a castle");
    }

    #[test]
    fn roll_randomization_fills_profile_and_request() {
        let mut job = roll_job(true);
        job.apply_randomization(&FixedRandom(i32::MAX));

        let JobBody::Roll {
            profile: Some(profile),
            ..
        } = &job.body
        else {
            panic!("profile not rolled");
        };
        assert_eq!(profile.rarity, Rarity::Legendary);
        assert_eq!(job.request.prompt, profile.prompt);
        assert_eq!(job.request.seed, profile.seed);
    }

    #[tokio::test]
    async fn roll_charges_and_saves_on_success() {
        let mut job = roll_job(true);
        job.apply_randomization(&FixedRandom(0));
        let done = outcome(&job, 200, json!({}));

        let mut repo = MockProfileRepo::new();
        repo.expect_save_rolled_profile()
            .withf(|profile, cost| profile.user_id == UserId::new(2) && *cost == ROLL_COST)
            .times(1)
            .returning(|profile, _| {
                let mut wallet = Wallet::empty(profile.guild_id, profile.user_id);
                wallet.credits = 5;
                Ok(wallet)
            });

        job.perform_local_work(&done, &repo).await.unwrap();
    }

    #[tokio::test]
    async fn refused_charge_surfaces_as_domain_error() {
        let mut job = roll_job(true);
        job.apply_randomization(&FixedRandom(0));
        let done = outcome(&job, 200, json!({}));

        let mut repo = MockProfileRepo::new();
        repo.expect_save_rolled_profile()
            .times(1)
            .returning(|_, cost| Err(DomainError::insufficient_credits(0, cost).into()));

        let err = job.perform_local_work(&done, &repo).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Domain(DomainError::InsufficientCredits { .. })
        ));
    }

    #[tokio::test]
    async fn test_roll_touches_no_storage() {
        let mut job = roll_job(false);
        job.apply_randomization(&FixedRandom(0));
        let done = outcome(&job, 200, json!({}));

        // No expectations: any repository call would panic
        let repo = MockProfileRepo::new();
        job.perform_local_work(&done, &repo).await.unwrap();
    }

    #[test]
    fn failed_outcome_renders_failure_message() {
        let job = roll_job(true);
        let failed = outcome(&job, 500, json!({ "error": "CUDA out of memory" }));

        let message = job.render_result(&failed);
        assert!(message.content.contains("<@2>"));
        assert!(message.content.contains("500 Internal Server Error"));
        assert!(message.content.contains("CUDA out of memory"));
        assert!(message.attachment.is_none());
    }

    #[test]
    fn successful_roll_renders_card_and_image() {
        let mut job = roll_job(true);
        job.apply_randomization(&FixedRandom(0));
        let done = outcome(&job, 200, json!({ "images": [STANDARD.encode(b"img")] }));

        let message = job.render_result(&done);
        assert!(message.content.starts_with("Mika rolled a new character!"));
        assert!(message.content.contains("(Common)"));
        assert_eq!(message.attachment.unwrap().data, b"img");
    }

    #[test]
    fn health_probe_renders_status_only() {
        let job = Job {
            header: header(JobKind::TestGet, false),
            request: GenerationRequest::new("probe", &GenerationDefaults::default()),
            body: JobBody::Probe,
        };
        let done = outcome(&job, 200, Value::Null);
        assert_eq!(
            job.render_result(&done).content,
            "Backend health check: 200 OK"
        );
    }
}
