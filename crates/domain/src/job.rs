//! Job descriptions that cross from the command path to the worker.
//!
//! `JobPayload` is the only thing the work channel carries: plain data, no
//! callbacks, no runtime handles, no database connections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{GuildId, JobId, UserId};

/// The closed set of commands the bot can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generate an image from a user prompt
    Generate,
    /// Roll a new character and generate its portrait
    Roll,
    /// Re-render the caller's stored character
    #[serde(rename = "profile")]
    ShowProfile,
    /// Backend health probe
    TestGet,
    /// Minimal generation against the backend
    TestPost,
    /// Roll without persisting anything
    TestRoll,
    /// Render a canned profile
    TestShow,
}

/// Which backend endpoint a job needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    /// Lightweight GET against the health endpoint
    Health,
    /// Full generation POST
    Generate,
}

impl JobKind {
    pub const ALL: [JobKind; 7] = [
        JobKind::Generate,
        JobKind::Roll,
        JobKind::ShowProfile,
        JobKind::TestGet,
        JobKind::TestPost,
        JobKind::TestRoll,
        JobKind::TestShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Generate => "generate",
            JobKind::Roll => "roll",
            JobKind::ShowProfile => "profile",
            JobKind::TestGet => "test_get",
            JobKind::TestPost => "test_post",
            JobKind::TestRoll => "test_roll",
            JobKind::TestShow => "test_show",
        }
    }

    pub fn backend_call(&self) -> BackendCall {
        match self {
            JobKind::TestGet => BackendCall::Health,
            _ => BackendCall::Generate,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            JobKind::TestGet | JobKind::TestPost | JobKind::TestRoll | JobKind::TestShow
        )
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        JobKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownJobType(s.to_string()))
    }
}

/// Body of a txt2img request, in the backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    /// -1 lets the backend pick
    pub seed: i64,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub sampler_name: String,
    pub batch_size: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, defaults: &GenerationDefaults) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: defaults.negative_prompt.clone(),
            seed: -1,
            steps: defaults.steps,
            cfg_scale: defaults.cfg_scale,
            width: defaults.width,
            height: defaults.height,
            sampler_name: defaults.sampler_name.clone(),
            batch_size: 1,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    /// Appends comma-separated tags to the prompt.
    pub fn append_tags<S: AsRef<str>>(&mut self, tags: &[S]) {
        for tag in tags {
            if self.prompt.trim().is_empty() {
                self.prompt = tag.as_ref().to_string();
            } else {
                self.prompt.push_str(", ");
                self.prompt.push_str(tag.as_ref());
            }
        }
    }
}

/// Generation settings applied to every request unless a job overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub sampler_name: String,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            negative_prompt: "lowres, bad anatomy, bad hands, blurry, watermark".to_string(),
            steps: 20,
            cfg_scale: 7.0,
            width: 512,
            height: 512,
            sampler_name: "Euler a".to_string(),
        }
    }
}

/// Everything the worker needs to execute a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: JobId,
    pub kind: JobKind,
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub randomize: bool,
    pub request: GenerationRequest,
}
