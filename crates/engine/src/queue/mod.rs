//! Job admission and the serial worker.
//!
//! `AdmissionQueue` is the producer side: it enforces per-guild and
//! per-member limits and pushes plain `JobPayload`s onto a bounded channel.
//! `Worker` is the single consumer. The in-flight table is the only state
//! the two share; each side holds its lock only for bookkeeping, never
//! across an await.

mod admission;
mod dispatch;
mod worker;

pub use admission::{AdmissionOutcome, AdmissionQueue, WorkInbox};
pub use dispatch::{deliver, ExecutionContext, JobMetadata};
pub use worker::{Worker, FLUSHED_STATUS, UNAVAILABLE_STATUS};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gachadiff_domain::{GuildId, UserId};
use tokio::sync::Notify;

use crate::jobs::Job;

/// A member's reservation. `job` is filled once the payload is on the channel.
struct Slot {
    metadata: JobMetadata,
    job: Option<Job>,
}

type JobTable = HashMap<GuildId, HashMap<UserId, Slot>>;

/// In-flight bookkeeping shared by admission and the worker.
#[derive(Clone, Default)]
struct SharedTable(Arc<Mutex<JobTable>>);

impl SharedTable {
    fn lock(&self) -> MutexGuard<'_, JobTable> {
        // The table holds no invariants a panicking holder could break halfway
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Release a member's slot, dropping the guild entry once it is empty.
    fn release(table: &mut JobTable, guild_id: GuildId, user_id: UserId) -> Option<Slot> {
        let members = table.get_mut(&guild_id)?;
        let slot = members.remove(&user_id);
        if members.is_empty() {
            table.remove(&guild_id);
        }
        slot
    }
}

/// Administrative request to discard buffered work.
#[derive(Default)]
struct FlushSignal {
    requested: AtomicBool,
    wake: Notify,
}

impl FlushSignal {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// Read and clear the flag.
    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use chrono::Utc;
    use gachadiff_domain::{GenerationDefaults, GenerationRequest, GuildId, JobId, JobKind, UserId};

    use super::{ExecutionContext, JobMetadata};
    use crate::infrastructure::ports::{
        MockProfileRepo, MockResultPoster, RenderedMessage, ResultPoster,
    };
    use crate::jobs::{Job, JobBody, JobHeader};

    pub fn generate_job(guild: u64, user: u64) -> Job {
        job_of_kind(JobKind::Generate, guild, user)
    }

    pub fn job_of_kind(kind: JobKind, guild: u64, user: u64) -> Job {
        let body = match kind {
            JobKind::Generate => JobBody::Generate,
            _ => JobBody::Probe,
        };
        Job {
            header: JobHeader {
                id: JobId::new(),
                kind,
                guild_id: GuildId::new(guild),
                user_id: UserId::new(user),
                user_name: None,
                randomize: false,
                requested_at: Utc::now(),
            },
            request: GenerationRequest::new("a quiet harbor", &GenerationDefaults::default()),
            body,
        }
    }

    /// Metadata whose collaborators must never be called.
    pub fn inert_metadata() -> JobMetadata {
        metadata_with_poster(Arc::new(MockResultPoster::new()))
    }

    pub fn metadata_with_poster(poster: Arc<dyn ResultPoster>) -> JobMetadata {
        JobMetadata {
            poster,
            context: ExecutionContext::current(),
            repo: Arc::new(MockProfileRepo::new()),
        }
    }

    /// Poster that forwards every message to a channel.
    pub fn recording_poster() -> (
        Arc<dyn ResultPoster>,
        tokio::sync::mpsc::UnboundedReceiver<RenderedMessage>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut poster = MockResultPoster::new();
        poster.expect_post().returning(move |message| {
            let _ = tx.send(message);
            Ok(())
        });
        (Arc::new(poster), rx)
    }
}
