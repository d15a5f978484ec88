//! Challenge-mode dungeons of the current season.

use std::collections::HashMap;

/// A challenge-mode dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DungeonInfo {
    pub id: i64,
    pub name: &'static str,
    pub slug: &'static str,
}

/// Dungeons in rotation. The vendor's dungeon index endpoint is unreliable, so
/// this list is authoritative for fetching.
pub const DUNGEONS: &[DungeonInfo] = &[
    DungeonInfo { id: 2, name: "Temple of the Jade Serpent", slug: "temple-of-the-jade-serpent" },
    DungeonInfo { id: 56, name: "Stormstout Brewery", slug: "stormstout-brewery" },
    DungeonInfo { id: 57, name: "Gate of the Setting Sun", slug: "gate-of-the-setting-sun" },
    DungeonInfo { id: 58, name: "Shado-Pan Monastery", slug: "shado-pan-monastery" },
    DungeonInfo { id: 59, name: "Siege of Niuzao Temple", slug: "siege-of-niuzao-temple" },
    DungeonInfo { id: 60, name: "Mogu'shan Palace", slug: "mogu-shan-palace" },
    DungeonInfo { id: 76, name: "Scholomance", slug: "scholomance" },
    DungeonInfo { id: 77, name: "Scarlet Halls", slug: "scarlet-halls" },
    DungeonInfo { id: 78, name: "Scarlet Monastery", slug: "scarlet-monastery" },
];

/// Hand-picked abbreviations keyed by dungeon slug.
pub const SHORT_NAMES: &[(&str, &str)] = &[
    ("temple-of-the-jade-serpent", "TJS"),
    ("stormstout-brewery", "SB"),
    ("shado-pan-monastery", "SPM"),
    ("mogu-shan-palace", "MSP"),
    ("siege-of-niuzao-temple", "SNT"),
    ("gate-of-the-setting-sun", "GSS"),
    ("scarlet-halls", "SH"),
    ("scarlet-monastery", "SM"),
    ("scholomance", "SCHOLO"),
];

const MAX_ACRONYM_LEN: usize = 6;

/// Resolves display abbreviations for dungeons.
#[derive(Debug, Clone)]
pub struct ShortNames {
    overrides: HashMap<String, String>,
}

impl Default for ShortNames {
    fn default() -> Self {
        Self::new(SHORT_NAMES.iter().copied())
    }
}

impl ShortNames {
    pub fn new<'a>(overrides: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            overrides: overrides.into_iter().map(|(slug, short)| (slug.to_string(), short.to_string())).collect(),
        }
    }

    /// The override for `slug` if any, else an acronym derived from `name`.
    #[must_use]
    pub fn get(&self, slug: &str, name: &str) -> String {
        self.overrides.get(slug).cloned().unwrap_or_else(|| acronym(name))
    }
}

/// Initials of `name`, skipping `of` and `the`, capped at six characters.
#[must_use]
pub fn acronym(name: &str) -> String {
    name.split_whitespace()
        .filter(|word| *word != "of" && *word != "the")
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .take(MAX_ACRONYM_LEN)
        .collect()
}
