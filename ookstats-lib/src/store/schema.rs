//! Table bootstrap.
//!
//! Creates every table the loaders and the ingest step read from, so a fresh
//! file is usable. Existing tables are left alone; migrations are handled
//! elsewhere.

use crate::Result;
use ohno::IntoAppError;
use rusqlite::Connection;

const LOG_TARGET: &str = "     store";

const TABLES: &str = "
CREATE TABLE IF NOT EXISTS dungeons (
    id INTEGER PRIMARY KEY,
    slug TEXT UNIQUE,
    name TEXT,
    map_id INTEGER,
    map_challenge_mode_id INTEGER UNIQUE
);

CREATE TABLE IF NOT EXISTS realms (
    id INTEGER PRIMARY KEY,
    slug TEXT,
    name TEXT,
    region TEXT,
    connected_realm_id INTEGER UNIQUE,
    parent_realm_slug TEXT
);

CREATE TABLE IF NOT EXISTS realm_groups (
    child_realm_id INTEGER PRIMARY KEY,
    parent_realm_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS challenge_runs (
    id INTEGER PRIMARY KEY,
    duration INTEGER,
    completed_timestamp INTEGER,
    keystone_level INTEGER DEFAULT 1,
    dungeon_id INTEGER,
    realm_id INTEGER,
    period_id INTEGER,
    period_start_timestamp INTEGER,
    period_end_timestamp INTEGER,
    team_signature TEXT,
    season_id INTEGER
);

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    blizzard_character_id INTEGER,
    name TEXT,
    name_lower TEXT,
    realm_id INTEGER,
    is_valid INTEGER DEFAULT 1,
    status_checked_at INTEGER
);

CREATE TABLE IF NOT EXISTS run_members (
    run_id INTEGER,
    player_id INTEGER,
    spec_id INTEGER,
    faction TEXT
);

CREATE TABLE IF NOT EXISTS player_profiles (
    player_id INTEGER,
    season_id INTEGER NOT NULL,
    name TEXT,
    realm_id INTEGER,
    main_spec_id INTEGER,
    class_name TEXT,
    dungeons_completed INTEGER DEFAULT 0,
    total_runs INTEGER DEFAULT 0,
    combined_best_time INTEGER,
    average_best_time INTEGER,
    global_ranking INTEGER,
    regional_ranking INTEGER,
    realm_ranking INTEGER,
    global_ranking_bracket TEXT,
    regional_ranking_bracket TEXT,
    realm_ranking_bracket TEXT,
    has_complete_coverage INTEGER DEFAULT 0,
    last_updated INTEGER,
    PRIMARY KEY (player_id, season_id)
);

CREATE TABLE IF NOT EXISTS player_best_runs (
    player_id INTEGER,
    dungeon_id INTEGER,
    run_id INTEGER,
    duration INTEGER,
    season_id INTEGER NOT NULL,
    completed_timestamp INTEGER,
    PRIMARY KEY (player_id, dungeon_id, season_id)
);

CREATE TABLE IF NOT EXISTS player_details (
    player_id INTEGER PRIMARY KEY,
    race_id INTEGER,
    race_name TEXT,
    gender TEXT,
    class_id INTEGER,
    class_name TEXT,
    active_spec_id INTEGER,
    active_spec_name TEXT,
    guild_name TEXT,
    level INTEGER,
    average_item_level INTEGER,
    equipped_item_level INTEGER,
    avatar_url TEXT,
    last_login_timestamp INTEGER,
    last_updated INTEGER
);

CREATE TABLE IF NOT EXISTS player_equipment (
    id INTEGER PRIMARY KEY,
    player_id INTEGER,
    slot_type TEXT,
    item_id INTEGER,
    upgrade_id INTEGER,
    quality TEXT,
    item_name TEXT,
    snapshot_timestamp INTEGER
);

CREATE TABLE IF NOT EXISTS player_equipment_enchantments (
    id INTEGER PRIMARY KEY,
    equipment_id INTEGER,
    enchantment_id INTEGER,
    slot_id INTEGER,
    slot_type TEXT,
    display_string TEXT,
    source_item_id INTEGER,
    source_item_name TEXT,
    spell_id INTEGER
);

CREATE TABLE IF NOT EXISTS run_rankings (
    run_id INTEGER,
    dungeon_id INTEGER,
    ranking_type TEXT,
    ranking_scope TEXT,
    ranking INTEGER,
    percentile_bracket TEXT,
    season_id INTEGER NOT NULL,
    computed_at INTEGER,
    PRIMARY KEY (run_id, ranking_type, ranking_scope, season_id)
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY,
    name TEXT,
    icon TEXT,
    quality INTEGER,
    type INTEGER,
    stats TEXT
);

CREATE TABLE IF NOT EXISTS seasons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    season_number INTEGER NOT NULL,
    region TEXT NOT NULL,
    start_timestamp INTEGER,
    end_timestamp INTEGER,
    season_name TEXT,
    first_period_id INTEGER,
    last_period_id INTEGER,
    UNIQUE(season_number, region)
);

CREATE TABLE IF NOT EXISTS period_seasons (
    period_id INTEGER,
    season_id INTEGER,
    PRIMARY KEY (period_id, season_id)
);
";

const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_realms_region_slug ON realms(region, slug)",
    "CREATE INDEX IF NOT EXISTS idx_runs_dungeon_team_duration ON challenge_runs(dungeon_id, team_signature, duration, completed_timestamp, id)",
    "CREATE INDEX IF NOT EXISTS idx_challenge_runs_season ON challenge_runs(season_id, dungeon_id, completed_timestamp)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_run_members_pair ON run_members(run_id, player_id)",
    "CREATE INDEX IF NOT EXISTS idx_run_members_player_id ON run_members(player_id)",
    "CREATE INDEX IF NOT EXISTS idx_run_rankings_season ON run_rankings(season_id, ranking_type, ranking_scope, dungeon_id)",
    "CREATE INDEX IF NOT EXISTS idx_player_profiles_season_coverage ON player_profiles(season_id, has_complete_coverage, combined_best_time)",
    "CREATE INDEX IF NOT EXISTS idx_player_equipment_player_ts ON player_equipment(player_id, snapshot_timestamp)",
];

/// Create every table and index that does not exist yet.
///
/// A failing index is logged and skipped; a failing table is an error.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(TABLES).into_app_err("failed to create table")?;

    for stmt in INDEXES {
        if let Err(e) = conn.execute_batch(stmt) {
            log::warn!(target: LOG_TARGET, "index creation failed: {e}");
        }
    }

    log::debug!(target: LOG_TARGET, "schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::open_in_memory;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('realms', 'challenge_runs', 'run_rankings', 'realm_groups')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}
