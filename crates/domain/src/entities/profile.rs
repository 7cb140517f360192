//! Rolled character profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, UserId};
use crate::value_objects::{random_name, random_tags, Rarity, Stats};

/// Number of random tags mixed into a rolled character's prompt.
pub const ROLL_TAG_COUNT: usize = 4;

/// The character a member currently owns in a guild.
///
/// A member owns at most one character per guild; a new roll replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub name: String,
    pub rarity: Rarity,
    pub stats: Stats,
    /// Prompt that reproduces the portrait together with `seed`
    pub prompt: String,
    pub seed: i64,
    pub created_at: DateTime<Utc>,
}

impl CharacterProfile {
    /// Roll a complete character: rarity, stats, name, prompt and seed.
    pub fn roll(
        guild_id: GuildId,
        user_id: UserId,
        now: DateTime<Utc>,
        mut gen_range: impl FnMut(i32, i32) -> i32,
    ) -> Self {
        let rarity = Rarity::roll(&mut gen_range);
        let stats = Stats::roll(rarity, &mut gen_range);
        let name = random_name(&mut gen_range);

        let mut parts: Vec<&str> = vec!["1girl", "solo", "character portrait"];
        parts.extend(random_tags(ROLL_TAG_COUNT, &mut gen_range));
        parts.extend(rarity.prompt_flavor().iter().copied());
        let prompt = parts.join(", ");

        let seed = i64::from(gen_range(0, i32::MAX));

        Self {
            guild_id,
            user_id,
            name,
            rarity,
            stats,
            prompt,
            seed,
            created_at: now,
        }
    }

    /// One-line summary used in chat messages.
    pub fn headline(&self) -> String {
        format!("**{}** {} ({})", self.name, self.rarity.stars(), self.rarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn roll_with_minimum_generator() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let profile = CharacterProfile::roll(GuildId::new(1), UserId::new(2), now, |min, _| min);

        // ticket 1 lands in the common tier
        assert_eq!(profile.rarity, Rarity::Common);
        assert_eq!(profile.stats.attack, Rarity::Common.stat_range().0);
        assert_eq!(profile.name, "Aea the Bold");
        assert_eq!(profile.seed, 0);
        assert!(profile.prompt.starts_with("1girl, solo, character portrait, silver hair"));
        assert!(profile.prompt.ends_with("simple background"));
        assert_eq!(profile.created_at, now);
    }

    #[test]
    fn legendary_roll_carries_flavor() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let profile = CharacterProfile::roll(GuildId::new(1), UserId::new(2), now, |_, max| max);

        assert_eq!(profile.rarity, Rarity::Legendary);
        assert!(profile.prompt.contains("masterpiece"));
        assert_eq!(profile.seed, i64::from(i32::MAX));
        assert!(profile.headline().contains("Legendary"));
    }
}
