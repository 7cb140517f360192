//! Command intake: build a job and put it through admission.

use std::sync::Arc;

use gachadiff_domain::{DomainError, JobKind, ROLL_COST};

use crate::infrastructure::ports::{ProfileRepo, ResultPoster};
use crate::jobs::{JobError, JobFactory, JobOptions, RequestContext};
use crate::queue::{AdmissionOutcome, AdmissionQueue, ExecutionContext, JobMetadata};

/// Submit a command to the work queue.
///
/// Factory errors surface to the caller before admission; everything after
/// that is reported through the admission outcome.
pub struct SubmitCommand {
    factory: Arc<JobFactory>,
    queue: Arc<AdmissionQueue>,
    repo: Arc<dyn ProfileRepo>,
}

impl SubmitCommand {
    pub fn new(
        factory: Arc<JobFactory>,
        queue: Arc<AdmissionQueue>,
        repo: Arc<dyn ProfileRepo>,
    ) -> Self {
        Self {
            factory,
            queue,
            repo,
        }
    }

    pub async fn execute(
        &self,
        command: &str,
        ctx: &RequestContext,
        options: &JobOptions,
        poster: Arc<dyn ResultPoster>,
    ) -> Result<AdmissionOutcome, JobError> {
        let job = self.factory.create(command, ctx, options).await?;

        // Checked again when the roll is charged; this only spares the
        // member a wasted generation
        if job.kind() == JobKind::Roll {
            let wallet = self.repo.get_wallet(ctx.guild_id, ctx.user_id).await?;
            if !wallet.can_afford(ROLL_COST) {
                return Err(DomainError::insufficient_credits(wallet.credits, ROLL_COST).into());
            }
        }

        let metadata = JobMetadata {
            poster,
            context: ExecutionContext::current(),
            repo: self.repo.clone(),
        };
        Ok(self.queue.add(job, metadata))
    }
}
