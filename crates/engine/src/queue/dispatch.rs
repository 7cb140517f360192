//! Result delivery back on the requester's side.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::infrastructure::ports::{ProfileRepo, ResultPoster};
use crate::jobs::{Job, JobBehavior, JobOutcome};

/// The runtime a command arrived on. Results are delivered there, never on
/// the worker.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    handle: Handle,
}

impl ExecutionContext {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Capture the runtime of the calling task.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn spawn<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(work)
    }
}

/// Everything about a job that must not cross into the worker.
#[derive(Clone)]
pub struct JobMetadata {
    pub poster: Arc<dyn ResultPoster>,
    pub context: ExecutionContext,
    pub repo: Arc<dyn ProfileRepo>,
}

/// Finish a job: local side effects, rendering, posting.
///
/// Always posts exactly one message.
pub async fn deliver(mut job: Job, outcome: JobOutcome, metadata: JobMetadata) {
    let mut local_failure = None;
    if outcome.is_success() {
        if let Err(e) = job.perform_local_work(&outcome, metadata.repo.as_ref()).await {
            tracing::warn!(job_id = %outcome.id, error = %e, "Post-processing failed");
            local_failure = Some(e);
        }
    }

    let mut message = job.render_result(&outcome);
    if let Some(e) = local_failure {
        message.content.push_str(&format!("\nThis result was not saved: {e}"));
    }

    match metadata.poster.post(message).await {
        Ok(()) => tracing::debug!(
            job_id = %outcome.id,
            status = outcome.status,
            "Delivered job result"
        ),
        Err(e) => tracing::error!(
            job_id = %outcome.id,
            guild_id = %job.guild_id(),
            user_id = %job.user_id(),
            error = %e,
            "Failed to post job result"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        BackendResponse, MockProfileRepo, MockResultPoster, PostError,
    };
    use crate::jobs::{JobBody, JobHeader};
    use chrono::Utc;
    use gachadiff_domain::{
        CharacterProfile, DomainError, GenerationDefaults, GenerationRequest, GuildId, JobId,
        JobKind, UserId,
    };
    use serde_json::json;

    fn rolled_job() -> Job {
        let now = Utc::now();
        let profile = CharacterProfile::roll(GuildId::new(1), UserId::new(2), now, |min, _| min);
        Job {
            header: JobHeader {
                id: JobId::new(),
                kind: JobKind::Roll,
                guild_id: GuildId::new(1),
                user_id: UserId::new(2),
                user_name: None,
                randomize: true,
                requested_at: now,
            },
            request: GenerationRequest::new(profile.prompt.clone(), &GenerationDefaults::default()),
            body: JobBody::Roll {
                persist: true,
                profile: Some(profile),
            },
        }
    }

    fn metadata(poster: MockResultPoster, repo: MockProfileRepo) -> JobMetadata {
        JobMetadata {
            poster: Arc::new(poster),
            context: ExecutionContext::current(),
            repo: Arc::new(repo),
        }
    }

    #[tokio::test]
    async fn failed_outcome_skips_local_work() {
        let job = rolled_job();
        let outcome = JobOutcome::from_response(
            &job.build_request_payload(),
            BackendResponse::new(503, "Service Unavailable", json!({})),
        );

        let mut poster = MockResultPoster::new();
        poster
            .expect_post()
            .withf(|message| message.content.contains("503"))
            .times(1)
            .returning(|_| Ok(()));

        // Any repository call would panic
        deliver(job, outcome, metadata(poster, MockProfileRepo::new())).await;
    }

    #[tokio::test]
    async fn local_work_failure_is_reported_in_message() {
        let job = rolled_job();
        let outcome = JobOutcome::from_response(
            &job.build_request_payload(),
            BackendResponse::new(200, "OK", json!({})),
        );

        let mut repo = MockProfileRepo::new();
        repo.expect_save_rolled_profile()
            .returning(|_, cost| Err(DomainError::insufficient_credits(0, cost).into()));

        let mut poster = MockResultPoster::new();
        poster
            .expect_post()
            .withf(|message| message.content.contains("was not saved"))
            .times(1)
            .returning(|_| Ok(()));

        deliver(job, outcome, metadata(poster, repo)).await;
    }

    #[tokio::test]
    async fn poster_failure_does_not_panic() {
        let job = rolled_job();
        let outcome = JobOutcome::from_response(
            &job.build_request_payload(),
            BackendResponse::new(500, "Internal Server Error", json!({})),
        );

        let mut poster = MockResultPoster::new();
        poster.expect_post().times(1).returning(|_| {
            Err(PostError::Rejected {
                status: 404,
                body: "Unknown Webhook".to_string(),
            })
        });

        deliver(job, outcome, metadata(poster, MockProfileRepo::new())).await;
    }
}
