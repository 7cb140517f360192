use std::fmt;

use serde::{Deserialize, Serialize};

use super::rarity::Rarity;

/// Combat stats rolled alongside a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub luck: i32,
}

impl Stats {
    /// Roll every stat inside the rarity's range.
    pub fn roll(rarity: Rarity, mut gen_range: impl FnMut(i32, i32) -> i32) -> Self {
        let (min, max) = rarity.stat_range();
        Self {
            // HP scales x10 so it reads differently from the other stats
            hp: gen_range(min, max) * 10,
            attack: gen_range(min, max),
            defense: gen_range(min, max),
            speed: gen_range(min, max),
            luck: gen_range(min, max),
        }
    }

    pub fn total(&self) -> i32 {
        self.hp / 10 + self.attack + self.defense + self.speed + self.luck
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HP {} | ATK {} | DEF {} | SPD {} | LCK {}",
            self.hp, self.attack, self.defense, self.speed, self.luck
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_stays_in_rarity_range() {
        let (min, max) = Rarity::Epic.stat_range();
        let stats = Stats::roll(Rarity::Epic, |lo, hi| {
            assert_eq!((lo, hi), (min, max));
            hi
        });
        assert_eq!(stats.hp, max * 10);
        assert_eq!(stats.luck, max);
        assert_eq!(stats.total(), max * 5);
    }

    #[test]
    fn display_lists_every_stat() {
        let stats = Stats {
            hp: 120,
            attack: 5,
            defense: 6,
            speed: 7,
            luck: 8,
        };
        assert_eq!(stats.to_string(), "HP 120 | ATK 5 | DEF 6 | SPD 7 | LCK 8");
    }
}
