//! The single serial consumer of the work channel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use gachadiff_domain::{BackendCall, JobPayload};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::admission::WorkInbox;
use super::{deliver, SharedTable};
use crate::infrastructure::ports::{BackendResponse, ImageGenPort};
use crate::jobs::JobOutcome;

/// Status reported when the backend could not be reached at all.
pub const UNAVAILABLE_STATUS: u16 = 404;
const UNAVAILABLE_REASON: &str = "Not Found: the image backend is unavailable, try again later";

/// Status reported for jobs discarded by a flush.
pub const FLUSHED_STATUS: u16 = 410;
const FLUSHED_REASON: &str = "Gone";

pub struct Worker {
    inbox: WorkInbox,
    backend: Arc<dyn ImageGenPort>,
    cooldown: Duration,
}

impl Worker {
    pub fn new(inbox: WorkInbox, backend: Arc<dyn ImageGenPort>, cooldown: Duration) -> Self {
        Self {
            inbox,
            backend,
            cooldown,
        }
    }

    /// Process jobs one at a time until `stop` is cancelled or every
    /// producer is gone.
    ///
    /// A job that has been dequeued always runs to completion.
    pub async fn run(mut self, stop: CancellationToken) {
        tracing::info!(cooldown_ms = self.cooldown.as_millis() as u64, "Worker started");

        loop {
            if stop.is_cancelled() {
                break;
            }

            if self.inbox.flush.take() {
                self.discard_buffered();
                continue;
            }

            let payload = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = self.inbox.flush.wake.notified() => continue,
                item = self.inbox.receiver.recv() => match item {
                    Some(payload) => payload,
                    None => break,
                },
            };

            let response = self.call_backend(&payload).await;
            self.complete(&payload, response);

            if !self.cooldown.is_zero() {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(self.cooldown) => {}
                }
            }
        }

        tracing::info!("Worker shutting down");
    }

    /// Backend call for one job. Transport errors and panics both come back
    /// as a synthetic failure response.
    async fn call_backend(&self, payload: &JobPayload) -> BackendResponse {
        tracing::debug!(
            job_id = %payload.id,
            kind = %payload.kind,
            guild_id = %payload.guild_id,
            "Running job"
        );

        let backend = self.backend.clone();
        let call = async move {
            match payload.kind.backend_call() {
                BackendCall::Health => backend.check_health().await,
                BackendCall::Generate => backend.generate(payload.request.clone()).await,
            }
        };

        let description = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(response)) => return response,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::warn!(
            job_id = %payload.id,
            error = %description,
            "Backend call failed"
        );
        BackendResponse::new(
            UNAVAILABLE_STATUS,
            UNAVAILABLE_REASON,
            json!({ "error": description }),
        )
    }

    /// Release the member's slot, then hand the result to their context.
    fn complete(&self, payload: &JobPayload, response: BackendResponse) {
        let outcome = JobOutcome::from_response(payload, response);

        let slot = {
            let mut table = self.inbox.table.lock();
            SharedTable::release(&mut table, payload.guild_id, payload.user_id)
        };

        match slot {
            Some(super::Slot {
                job: Some(job),
                metadata,
            }) => {
                let context = metadata.context.clone();
                context.spawn(deliver(job, outcome, metadata));
            }
            _ => tracing::warn!(
                job_id = %payload.id,
                guild_id = %payload.guild_id,
                user_id = %payload.user_id,
                "Finished job had no reservation; result dropped"
            ),
        }
    }

    /// Empty the channel without calling the backend.
    fn discard_buffered(&mut self) {
        let mut discarded = 0usize;
        while let Ok(payload) = self.inbox.receiver.try_recv() {
            let response = BackendResponse::new(
                FLUSHED_STATUS,
                FLUSHED_REASON,
                json!({ "error": "flushed by an administrator" }),
            );
            self.complete(&payload, response);
            discarded += 1;
        }
        tracing::info!(discarded, "Flushed the work queue");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("backend call panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("backend call panicked: {s}")
    } else {
        "backend call panicked".to_string()
    }
}
