//! gachadiff domain.
//!
//! Pure data and rules shared by the engine: ids, job descriptions, and the
//! gacha layer (rarity, stats, profiles, wallets). No I/O lives here.

pub mod entities;
pub mod error;
pub mod ids;
pub mod job;
pub mod value_objects;

pub use entities::{CharacterProfile, Wallet, DAILY_CREDITS, ROLL_COST, ROLL_TAG_COUNT};
pub use error::DomainError;
pub use ids::{GuildId, JobId, UserId};
pub use job::{BackendCall, GenerationDefaults, GenerationRequest, JobKind, JobPayload};
pub use value_objects::{random_name, random_tags, Rarity, Stats, RARITY_WEIGHT_TOTAL};
