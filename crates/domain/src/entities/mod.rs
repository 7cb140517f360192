//! Stored gacha entities.

mod profile;
mod wallet;

pub use profile::{CharacterProfile, ROLL_TAG_COUNT};
pub use wallet::{Wallet, DAILY_CREDITS, ROLL_COST};
