//! Value objects for the gacha layer.

mod rarity;
mod stats;
mod tags;

pub use rarity::{Rarity, RARITY_WEIGHT_TOTAL};
pub use stats::Stats;
pub use tags::{random_name, random_tags, TAG_POOLS};
