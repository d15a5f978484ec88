use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Coarse quality tier derived from a ranking within a population.
///
/// Variants are declared best-first so that `Ord` follows
/// `artifact < legendary < epic < rare < uncommon < common`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Bracket {
    Artifact,
    Legendary,
    Epic,
    Rare,
    Uncommon,
    Common,
}

impl Bracket {
    /// Classify `rank` (1-based) within `total`.
    ///
    /// Rank 1 is `artifact`; the rest are bucketed on the share of the
    /// population ranked below. Out-of-range input is `common`.
    #[must_use]
    pub fn from_rank(rank: i64, total: i64) -> Self {
        if total <= 0 || rank <= 0 || rank > total {
            return Self::Common;
        }
        if rank == 1 {
            return Self::Artifact;
        }

        #[expect(clippy::cast_precision_loss, reason = "rankings are far below 2^52")]
        let percentile = (total - rank) as f64 / total as f64 * 100.0;

        if percentile >= 95.0 {
            Self::Legendary
        } else if percentile >= 80.0 {
            Self::Epic
        } else if percentile >= 60.0 {
            Self::Rare
        } else if percentile >= 40.0 {
            Self::Uncommon
        } else {
            Self::Common
        }
    }
}
