//! Name and prompt-tag randomization.

const NAME_PREFIXES: &[&str] = &[
    "Ae", "Bel", "Cor", "Dra", "El", "Fen", "Gal", "Hal", "Isa", "Jor", "Kae", "Lun", "Mir",
    "Nyx", "Or", "Pyr", "Quin", "Ryn", "Sol", "Tal", "Val", "Wyn", "Xan", "Yor", "Zel",
];

const NAME_SUFFIXES: &[&str] = &[
    "a", "ara", "dor", "eth", "ia", "ian", "is", "ith", "on", "or", "ra", "ren", "riel", "th",
    "us", "wyn",
];

const EPITHETS: &[&str] = &[
    "the Bold",
    "the Quiet",
    "of the Ember",
    "the Wanderer",
    "Starborn",
    "the Unbroken",
    "of the Tides",
    "Duskwalker",
];

pub const HAIR_TAGS: &[&str] = &[
    "silver hair",
    "black hair",
    "red hair",
    "blonde hair",
    "blue hair",
    "white hair",
    "twin tails",
    "short hair",
    "long flowing hair",
];

pub const OUTFIT_TAGS: &[&str] = &[
    "plate armor",
    "mage robes",
    "leather armor",
    "kimono",
    "school uniform",
    "royal gown",
    "hooded cloak",
    "pirate coat",
];

pub const SETTING_TAGS: &[&str] = &[
    "forest",
    "castle courtyard",
    "night sky",
    "cherry blossoms",
    "desert ruins",
    "snowy mountains",
    "neon city",
    "underwater temple",
];

pub const STYLE_TAGS: &[&str] = &[
    "anime style",
    "watercolor",
    "oil painting",
    "cel shading",
    "fantasy art",
    "portrait",
];

/// All tag pools in draw order.
pub const TAG_POOLS: &[&[&str]] = &[HAIR_TAGS, OUTFIT_TAGS, SETTING_TAGS, STYLE_TAGS];

fn pick<'a>(pool: &[&'a str], gen_range: &mut impl FnMut(i32, i32) -> i32) -> &'a str {
    let last = pool.len().saturating_sub(1) as i32;
    let idx = gen_range(0, last).clamp(0, last) as usize;
    pool[idx]
}

/// Build a random character name such as "Kaeriel the Bold".
pub fn random_name(mut gen_range: impl FnMut(i32, i32) -> i32) -> String {
    let prefix = pick(NAME_PREFIXES, &mut gen_range);
    let suffix = pick(NAME_SUFFIXES, &mut gen_range);
    let epithet = pick(EPITHETS, &mut gen_range);
    format!("{prefix}{suffix} {epithet}")
}

/// Draw `count` distinct tags, walking the pools round-robin.
///
/// Never returns more tags than exist across all pools.
pub fn random_tags(count: usize, mut gen_range: impl FnMut(i32, i32) -> i32) -> Vec<&'static str> {
    let available: usize = TAG_POOLS.iter().map(|p| p.len()).sum();
    let count = count.min(available);
    let mut drawn: Vec<&'static str> = Vec::with_capacity(count);

    let mut pool_idx = 0;
    while drawn.len() < count {
        let remaining: Vec<&'static str> = TAG_POOLS[pool_idx % TAG_POOLS.len()]
            .iter()
            .copied()
            .filter(|tag| !drawn.contains(tag))
            .collect();
        pool_idx += 1;
        if remaining.is_empty() {
            continue;
        }
        drawn.push(pick(&remaining, &mut gen_range));
    }
    drawn
}
