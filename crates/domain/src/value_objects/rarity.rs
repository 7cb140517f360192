//! Rarity tiers for rolled characters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sum of all tier weights.
pub const RARITY_WEIGHT_TOTAL: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Draw weight out of [`RARITY_WEIGHT_TOTAL`].
    pub fn weight(&self) -> i32 {
        match self {
            Rarity::Common => 600,
            Rarity::Uncommon => 250,
            Rarity::Rare => 100,
            Rarity::Epic => 40,
            Rarity::Legendary => 10,
        }
    }

    /// Inclusive range each stat is rolled in.
    pub fn stat_range(&self) -> (i32, i32) {
        match self {
            Rarity::Common => (1, 40),
            Rarity::Uncommon => (10, 55),
            Rarity::Rare => (20, 70),
            Rarity::Epic => (35, 85),
            Rarity::Legendary => (50, 100),
        }
    }

    /// Extra prompt tags that make higher tiers look the part.
    pub fn prompt_flavor(&self) -> &'static [&'static str] {
        match self {
            Rarity::Common => &["simple background"],
            Rarity::Uncommon => &["detailed background"],
            Rarity::Rare => &["detailed", "dramatic lighting"],
            Rarity::Epic => &["highly detailed", "dramatic lighting", "glowing aura"],
            Rarity::Legendary => &[
                "masterpiece",
                "best quality",
                "epic composition",
                "golden aura",
            ],
        }
    }

    pub fn stars(&self) -> &'static str {
        match self {
            Rarity::Common => "★",
            Rarity::Uncommon => "★★",
            Rarity::Rare => "★★★",
            Rarity::Epic => "★★★★",
            Rarity::Legendary => "★★★★★",
        }
    }

    /// Roll a tier using the weight table.
    ///
    /// `gen_range(min, max)` must return a value in the inclusive range.
    pub fn roll(mut gen_range: impl FnMut(i32, i32) -> i32) -> Rarity {
        let mut ticket = gen_range(1, RARITY_WEIGHT_TOTAL);
        for rarity in Rarity::ALL {
            ticket -= rarity.weight();
            if ticket <= 0 {
                return rarity;
            }
        }
        Rarity::Common
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        };
        f.write_str(name)
    }
}
