//! SQLite access for the aggregation side.
//!
//! Readers are batched so that no `IN (...)` list exceeds [`BATCH_SIZE`]
//! parameters. Every loader returns fully owned rows; nothing borrows from the
//! connection past the call.

mod batch;
mod canonical;
mod connection;
mod equipment;
mod players;
mod rankings;
mod realm_groups;
mod reference;
mod runs;
mod schema;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{BATCH_SIZE, placeholders};
pub use canonical::{LeaderboardRow, LeaderboardScope, count_teams, load_canonical_runs};
pub use connection::{open, open_in_memory};
pub use equipment::{EnchantmentRow, EquipmentRow, EquipmentSet, load_equipment};
pub use players::{
    PlayerRef, PlayerRow, PlayerSeason, RankedPlayer, load_complete_coverage_players, load_player_refs, load_player_seasons, load_ranked_players,
    record_player_status,
};
pub use rankings::{RankingStats, compute_rankings};
pub use realm_groups::sync_realm_groups;
pub use reference::{
    DungeonRow, RealmRow, SeasonRow, current_season_number, load_dungeons, load_realms, load_seasons, realm_name, seed_reference_data,
};
pub use runs::{BestRun, BestRuns, TeamMember, load_best_runs, load_team_members};
pub use schema::ensure_schema;
