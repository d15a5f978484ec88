use super::types::LeaderboardResponse;
use super::{Client, FetchError};
use crate::wow::{DungeonInfo, RealmInfo, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "   periods";

/// Which periods to query, per region.
///
/// The vendor's period index is unreliable for this game, so the lists are
/// maintained by hand and walked newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodPlan {
    /// Period used when a single period is requested.
    pub primary: String,

    /// Fallback list, newest first.
    pub default: Vec<String>,

    /// Region-specific lists replacing `default`.
    #[serde(default)]
    pub regions: BTreeMap<Region, Vec<String>>,
}

impl PeriodPlan {
    /// Fallback list for `region`, newest first.
    #[must_use]
    pub fn for_region(&self, region: Region) -> &[String] {
        self.regions.get(&region).unwrap_or(&self.default)
    }
}

/// Walk `periods` until a non-empty leaderboard turns up.
///
/// 404s and empty responses move on to the next period. Any other failure
/// stops the walk. Returns `None` when every period is empty.
pub async fn fetch_with_period_fallback(
    client: &Client,
    realm: &RealmInfo,
    dungeon: &DungeonInfo,
    periods: &[String],
    cancel: &CancellationToken,
) -> Result<Option<(String, LeaderboardResponse)>, FetchError> {
    for period in periods {
        match client.fetch_leaderboard(realm, dungeon, period, cancel).await {
            Ok(lb) if !lb.is_empty() => {
                log::debug!(target: LOG_TARGET, "{}/{}: found runs in period {period}", realm.slug, dungeon.slug);
                return Ok(Some((period.clone(), lb)));
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    log::debug!(target: LOG_TARGET, "{}/{}: no runs in {} periods", realm.slug, dungeon.slug, periods.len());
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PeriodPlan {
        PeriodPlan {
            primary: "1034".to_string(),
            default: vec!["1034".to_string(), "1033".to_string()],
            regions: BTreeMap::from([(Region::Eu, vec!["1030".to_string(), "1030".to_string()])]),
        }
    }

    #[test]
    fn test_region_override() {
        let plan = plan();
        assert_eq!(plan.for_region(Region::Us), ["1034", "1033"]);
        assert_eq!(plan.for_region(Region::Eu), ["1030", "1030"]);
    }

    #[test]
    fn test_toml_shape() {
        let plan: PeriodPlan = toml::from_str(
            r#"
            primary = "1034"
            default = ["1034", "1033"]
            [regions]
            eu = ["1030", "1030"]
            "#,
        )
        .unwrap();
        assert_eq!(plan, self::plan());
    }
}
