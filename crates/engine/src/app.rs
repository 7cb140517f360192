//! Application state and composition.

use std::sync::Arc;

use url::Url;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::ports::{ClockPort, ProfileRepo, RandomPort, ResultPoster};
use crate::infrastructure::webhook_poster::{LogPoster, WebhookPoster};
use crate::jobs::JobFactory;
use crate::queue::{AdmissionQueue, WorkInbox};
use crate::use_cases;

/// Main application state.
///
/// Passed to HTTP handlers via Axum state. The worker's end of the queue
/// is returned separately from `App::new` so the binary can run it.
pub struct App {
    pub queue: Arc<AdmissionQueue>,
    pub use_cases: UseCases,
    pub admin_token: Option<String>,
    http: reqwest::Client,
}

/// Container for all use cases.
pub struct UseCases {
    pub submit: use_cases::SubmitCommand,
    pub economy: use_cases::EconomyUseCases,
}

impl App {
    pub fn new(
        config: &AppConfig,
        repo: Arc<dyn ProfileRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> (Self, WorkInbox) {
        let (queue, inbox) = AdmissionQueue::new(config.queue.clone(), random);
        let queue = Arc::new(queue);

        let factory = Arc::new(JobFactory::new(
            repo.clone(),
            clock.clone(),
            config.generation.clone(),
        ));

        let use_cases = UseCases {
            submit: use_cases::SubmitCommand::new(factory, queue.clone(), repo.clone()),
            economy: use_cases::EconomyUseCases::new(repo, clock),
        };

        let app = Self {
            queue,
            use_cases,
            admin_token: config.admin_token.clone(),
            http: reqwest::Client::new(),
        };
        (app, inbox)
    }

    /// Where a command's result goes: its follow-up webhook, or the log.
    pub fn poster_for(&self, followup_url: Option<Url>) -> Arc<dyn ResultPoster> {
        match followup_url {
            Some(url) => Arc::new(WebhookPoster::new(self.http.clone(), url)),
            None => Arc::new(LogPoster),
        }
    }
}
