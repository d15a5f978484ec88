use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// A vendor API region.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
    ValueEnum,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Region {
    /// Americas and Oceania
    Us,
    /// Europe
    Eu,
    /// Korea
    Kr,
    /// Taiwan
    Tw,
}

impl Region {
    /// All regions in canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Namespace for leaderboard and season data.
    #[must_use]
    pub fn dynamic_namespace(self) -> String {
        format!("dynamic-classic-{self}")
    }

    /// Namespace for character profile data.
    #[must_use]
    pub fn profile_namespace(self) -> String {
        format!("profile-classic-{self}")
    }

    /// Default API base URL for the region.
    #[must_use]
    pub fn api_base(self) -> String {
        format!("https://{self}.api.blizzard.com")
    }
}
