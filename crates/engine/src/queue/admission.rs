//! Admission control for the work channel.

use std::sync::Arc;

use gachadiff_domain::{GuildId, JobPayload, UserId};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{FlushSignal, JobMetadata, SharedTable, Slot};
use crate::infrastructure::config::QueueSettings;
use crate::infrastructure::ports::RandomPort;
use crate::jobs::{Job, JobBehavior};

/// Result of `AdmissionQueue::add`, one per user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Accepted,
    TooManyGuilds,
    GuildFull,
    AlreadyQueued,
    QueueFull,
    NotTransferable,
}

impl AdmissionOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Accepted => {
                "Your job was added to the queue.  Please wait for it to finish before posting another."
            }
            Self::TooManyGuilds => {
                "Bot is currently servicing the maximum number of allowed Guilds."
            }
            Self::GuildFull => {
                "Unable to add your job, too many jobs from this Guild are already in the queue."
            }
            Self::AlreadyQueued => {
                "You already have a job on the queue, please wait until it's finished."
            }
            Self::QueueFull => {
                "The work queue is currently full, please wait a bit before making another job."
            }
            Self::NotTransferable => {
                "Unable to add your job to the queue.  Are you sending more than text and numbers?"
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// The worker's end of the queue.
pub struct WorkInbox {
    pub(super) receiver: mpsc::Receiver<JobPayload>,
    pub(super) table: SharedTable,
    pub(super) flush: Arc<FlushSignal>,
}

/// Gatekeeper for every job submission.
pub struct AdmissionQueue {
    settings: QueueSettings,
    sender: mpsc::Sender<JobPayload>,
    table: SharedTable,
    flush: Arc<FlushSignal>,
    random: Arc<dyn RandomPort>,
}

impl AdmissionQueue {
    pub fn new(settings: QueueSettings, random: Arc<dyn RandomPort>) -> (Self, WorkInbox) {
        // tokio channels need a capacity of at least one; depth 0 is
        // enforced in `add` instead
        let (sender, receiver) = mpsc::channel(settings.depth.max(1));
        let table = SharedTable::default();
        let flush = Arc::new(FlushSignal::default());

        let queue = Self {
            settings,
            sender,
            table: table.clone(),
            flush: flush.clone(),
            random,
        };
        let inbox = WorkInbox {
            receiver,
            table,
            flush,
        };
        (queue, inbox)
    }

    /// Admit `job` or say why not.
    ///
    /// Rejections leave the in-flight table exactly as it was.
    pub fn add(&self, mut job: Job, metadata: JobMetadata) -> AdmissionOutcome {
        let guild_id = job.guild_id();
        let user_id = job.user_id();

        if let Err(outcome) = self.reserve(guild_id, user_id, metadata) {
            tracing::debug!(
                guild_id = %guild_id,
                user_id = %user_id,
                outcome = ?outcome,
                "Job rejected at admission"
            );
            return outcome;
        }

        // Runs with the slot held so a slow draw cannot let a duplicate in
        job.apply_randomization(self.random.as_ref());
        let payload = job.build_request_payload();
        let job_id = payload.id;
        let kind = payload.kind;

        let mut table = self.table.lock();
        let rejected = if self.settings.depth == 0 {
            Some(AdmissionOutcome::QueueFull)
        } else {
            match self.sender.try_send(payload) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => Some(AdmissionOutcome::QueueFull),
                Err(TrySendError::Closed(_)) => Some(AdmissionOutcome::NotTransferable),
            }
        };

        match rejected {
            None => {
                if let Some(slot) = table
                    .get_mut(&guild_id)
                    .and_then(|members| members.get_mut(&user_id))
                {
                    slot.job = Some(job);
                }
                drop(table);
                tracing::info!(
                    job_id = %job_id,
                    kind = %kind,
                    guild_id = %guild_id,
                    user_id = %user_id,
                    "Job added to the queue"
                );
                AdmissionOutcome::Accepted
            }
            Some(outcome) => {
                SharedTable::release(&mut table, guild_id, user_id);
                drop(table);
                tracing::debug!(
                    job_id = %job_id,
                    guild_id = %guild_id,
                    user_id = %user_id,
                    outcome = ?outcome,
                    "Job could not be enqueued"
                );
                outcome
            }
        }
    }

    /// Check limits and reserve the member's slot in one critical section.
    fn reserve(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        metadata: JobMetadata,
    ) -> Result<(), AdmissionOutcome> {
        let mut table = self.table.lock();

        let members_in_guild = match table.get(&guild_id) {
            Some(members) => members.len(),
            None if table.len() >= self.settings.max_guilds => {
                return Err(AdmissionOutcome::TooManyGuilds)
            }
            None => 0,
        };
        if members_in_guild >= self.settings.max_guild_reqs {
            return Err(AdmissionOutcome::GuildFull);
        }
        if table
            .get(&guild_id)
            .is_some_and(|members| members.contains_key(&user_id))
        {
            return Err(AdmissionOutcome::AlreadyQueued);
        }

        table
            .entry(guild_id)
            .or_default()
            .insert(user_id, Slot { metadata, job: None });
        Ok(())
    }

    /// Ask the worker to discard everything still buffered.
    pub fn flush(&self) {
        tracing::info!("Flush requested");
        self.flush.request();
    }

    /// Members with a job in flight, sorted.
    pub fn in_flight(&self) -> Vec<(GuildId, UserId)> {
        let table = self.table.lock();
        let mut pairs: Vec<_> = table
            .iter()
            .flat_map(|(guild, members)| members.keys().map(move |user| (*guild, *user)))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn guild_count(&self) -> usize {
        self.table.lock().len()
    }
}
