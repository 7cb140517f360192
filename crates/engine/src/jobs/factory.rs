//! Builds the right job variant for a command tag.

use std::collections::HashMap;
use std::sync::Arc;

use gachadiff_domain::{
    CharacterProfile, GenerationDefaults, GenerationRequest, GuildId, JobId, JobKind, UserId,
};
use serde::Deserialize;
use serde_json::Value;

use crate::infrastructure::ports::{ClockPort, ProfileRepo};

use super::{Job, JobBody, JobError, JobHeader};

/// Prompt used by the backend diagnostics.
const PROBE_PROMPT: &str = "a red apple on a wooden table";

/// Command options as they arrived, keyed by option name.
pub type JobOptions = HashMap<String, Value>;

/// Who asked, and where.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestContext {
    pub guild_id: GuildId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
}

pub struct JobFactory {
    repo: Arc<dyn ProfileRepo>,
    clock: Arc<dyn ClockPort>,
    defaults: GenerationDefaults,
}

impl JobFactory {
    pub fn new(
        repo: Arc<dyn ProfileRepo>,
        clock: Arc<dyn ClockPort>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            repo,
            clock,
            defaults,
        }
    }

    /// Build the job for `tag`.
    ///
    /// Fails with `UnknownJobType` for tags outside the closed set and with
    /// `InvalidRequest` when required options are missing or malformed.
    pub async fn create(
        &self,
        tag: &str,
        ctx: &RequestContext,
        options: &JobOptions,
    ) -> Result<Job, JobError> {
        let kind: JobKind = tag
            .parse()
            .map_err(|_| JobError::UnknownJobType(tag.to_string()))?;

        let mut header = JobHeader {
            id: JobId::new(),
            kind,
            guild_id: ctx.guild_id,
            user_id: ctx.user_id,
            user_name: ctx.user_name.clone(),
            randomize: false,
            requested_at: self.clock.now(),
        };

        let (request, body) = match kind {
            JobKind::Generate => {
                let prompt = required_string(options, "prompt")?;
                let mut request = GenerationRequest::new(prompt, &self.defaults);
                if let Some(negative) = optional_string(options, "negative_prompt")? {
                    request = request.with_negative_prompt(negative);
                }
                if let Some(seed) = optional_seed(options)? {
                    request = request.with_seed(seed);
                }
                header.randomize = optional_bool(options, "random")?.unwrap_or(false);
                (request, JobBody::Generate)
            }
            JobKind::Roll | JobKind::TestRoll => {
                header.randomize = true;
                (
                    GenerationRequest::new("", &self.defaults),
                    JobBody::Roll {
                        persist: kind == JobKind::Roll,
                        profile: None,
                    },
                )
            }
            JobKind::ShowProfile => {
                let profile = self
                    .repo
                    .get_profile(ctx.guild_id, ctx.user_id)
                    .await?
                    .ok_or_else(|| {
                        JobError::invalid("You don't have a character yet. Use `roll` first.")
                    })?;
                self.profile_job(profile)
            }
            JobKind::TestShow => {
                // Always the top roll, so the render path is stable
                let canned = CharacterProfile::roll(
                    ctx.guild_id,
                    ctx.user_id,
                    header.requested_at,
                    |_, max| max,
                );
                self.profile_job(canned)
            }
            JobKind::TestGet => (
                GenerationRequest::new(PROBE_PROMPT, &self.defaults),
                JobBody::Probe,
            ),
            JobKind::TestPost => {
                let mut request = GenerationRequest::new(PROBE_PROMPT, &self.defaults);
                request.steps = 1;
                (request, JobBody::Probe)
            }
        };

        Ok(Job {
            header,
            request,
            body,
        })
    }

    fn profile_job(&self, profile: CharacterProfile) -> (GenerationRequest, JobBody) {
        let request =
            GenerationRequest::new(profile.prompt.clone(), &self.defaults).with_seed(profile.seed);
        (request, JobBody::ShowProfile { profile })
    }
}

fn optional_string(options: &JobOptions, key: &str) -> Result<Option<String>, JobError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(JobError::invalid(format!("`{key}` must be text"))),
    }
}

fn required_string(options: &JobOptions, key: &str) -> Result<String, JobError> {
    optional_string(options, key)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| JobError::invalid(format!("`{key}` is required")))
}

fn optional_bool(options: &JobOptions, key: &str) -> Result<Option<bool>, JobError> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(JobError::invalid(format!("`{key}` must be true or false"))),
    }
}

/// `-1` asks the backend for a random seed.
fn optional_seed(options: &JobOptions) -> Result<Option<i64>, JobError> {
    match options.get("seed") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_i64() {
            Some(seed) if seed >= -1 => Ok(Some(seed)),
            _ => Err(JobError::invalid("`seed` must be a whole number, -1 or above")),
        },
    }
}
