use super::batch::{BATCH_SIZE, placeholders};
use crate::Result;
use ohno::IntoAppError;
use rusqlite::{Connection, params, params_from_iter};
use std::collections::HashMap;

const LOG_TARGET: &str = "    loader";

/// A player with complete coverage in at least one season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRow {
    pub id: i64,
    pub name: String,
    pub realm_slug: String,
    pub realm_name: String,
    pub region: String,
    pub class_name: Option<String>,
    pub active_spec_name: Option<String>,
    pub avatar_url: String,
    pub guild_name: Option<String>,
    pub race_name: Option<String>,
    pub average_item_level: Option<i64>,
    pub equipped_item_level: Option<i64>,
}

/// One player's aggregate stats for one season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSeason {
    pub season_id: i64,
    pub main_spec_id: Option<i64>,
    pub dungeons_completed: i64,
    pub total_runs: i64,
    pub combined_best_time: Option<i64>,
    pub global_ranking: Option<i64>,
    pub regional_ranking: Option<i64>,
    pub realm_ranking: Option<i64>,
    pub global_bracket: Option<String>,
    pub regional_bracket: Option<String>,
    pub realm_bracket: Option<String>,
    pub last_updated: Option<i64>,
}

/// Every player flagged with complete coverage in any season, with realm and
/// profile details.
pub fn load_complete_coverage_players(conn: &Connection) -> Result<Vec<PlayerRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT p.id, p.name, r.slug, r.name, r.region,
                    pd.class_name, pd.active_spec_name,
                    COALESCE(pd.avatar_url, ''),
                    pd.guild_name, pd.race_name, pd.average_item_level, pd.equipped_item_level
             FROM players p
             JOIN realms r ON p.realm_id = r.id
             JOIN player_profiles pp ON p.id = pp.player_id
             LEFT JOIN player_details pd ON p.id = pd.player_id
             WHERE pp.has_complete_coverage = 1
             ORDER BY p.id",
        )
        .into_app_err("query players")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(PlayerRow {
                id: row.get(0)?,
                name: row.get(1)?,
                realm_slug: row.get(2)?,
                realm_name: row.get(3)?,
                region: row.get(4)?,
                class_name: row.get(5)?,
                active_spec_name: row.get(6)?,
                avatar_url: row.get(7)?,
                guild_name: row.get(8)?,
                race_name: row.get(9)?,
                average_item_level: row.get(10)?,
                equipped_item_level: row.get(11)?,
            })
        })
        .into_app_err("query players")?;

    let players = rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan player")?;
    log::debug!(target: LOG_TARGET, "loaded {} players with complete coverage", players.len());
    Ok(players)
}

/// A complete-coverage player on a season's player leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedPlayer {
    pub id: i64,
    pub name: String,
    pub realm_slug: String,
    pub realm_name: String,
    pub region: String,

    /// Slug of the realm whose pages list this player: the merge parent, or the
    /// player's own realm.
    pub pool_slug: String,
    pub class_name: String,
    pub active_spec_name: String,
    pub main_spec_id: Option<i64>,
    pub dungeons_completed: i64,
    pub total_runs: i64,
    pub combined_best_time: i64,
    pub global_bracket: String,
    pub regional_bracket: String,
}

/// Players with complete coverage in `season`, fastest combined time first,
/// ties by name.
pub fn load_ranked_players(conn: &Connection, season: i64) -> Result<Vec<RankedPlayer>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.id, COALESCE(pp.name, p.name, ''), r.slug, COALESCE(r.name, r.slug), r.region,
                    COALESCE(pr.slug, r.slug),
                    COALESCE(pp.class_name, pd.class_name, ''), COALESCE(pd.active_spec_name, ''),
                    pp.main_spec_id, pp.dungeons_completed, pp.total_runs, pp.combined_best_time,
                    COALESCE(pp.global_ranking_bracket, ''), COALESCE(pp.regional_ranking_bracket, '')
             FROM player_profiles pp
             JOIN players p ON pp.player_id = p.id
             JOIN realms r ON p.realm_id = r.id
             LEFT JOIN realm_groups g ON g.child_realm_id = r.id
             LEFT JOIN realms pr ON g.parent_realm_id = pr.id
             LEFT JOIN player_details pd ON p.id = pd.player_id
             WHERE pp.season_id = ?1 AND pp.has_complete_coverage = 1 AND pp.combined_best_time IS NOT NULL
             ORDER BY pp.combined_best_time ASC, p.name ASC, p.id ASC",
        )
        .into_app_err("query ranked players")?;

    let rows = stmt
        .query_map([season], |row| {
            Ok(RankedPlayer {
                id: row.get(0)?,
                name: row.get(1)?,
                realm_slug: row.get(2)?,
                realm_name: row.get(3)?,
                region: row.get(4)?,
                pool_slug: row.get(5)?,
                class_name: row.get(6)?,
                active_spec_name: row.get(7)?,
                main_spec_id: row.get(8)?,
                dungeons_completed: row.get(9)?,
                total_runs: row.get(10)?,
                combined_best_time: row.get(11)?,
                global_bracket: row.get(12)?,
                regional_bracket: row.get(13)?,
            })
        })
        .into_app_err("query ranked players")?;

    let players = rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan ranked player")?;
    log::debug!(target: LOG_TARGET, "season {season}: {} ranked players", players.len());
    Ok(players)
}

/// Every season row for the given players, ordered by player then season.
pub fn load_player_seasons(conn: &Connection, player_ids: &[i64]) -> Result<HashMap<i64, Vec<PlayerSeason>>> {
    let mut by_player: HashMap<i64, Vec<PlayerSeason>> = HashMap::new();

    for (index, batch) in player_ids.chunks(BATCH_SIZE).enumerate() {
        let sql = format!(
            "SELECT player_id, season_id, main_spec_id, dungeons_completed, total_runs,
                    combined_best_time, global_ranking, regional_ranking, realm_ranking,
                    global_ranking_bracket, regional_ranking_bracket, realm_ranking_bracket,
                    last_updated
             FROM player_profiles
             WHERE player_id IN ({})
             ORDER BY player_id, season_id",
            placeholders(batch.len())
        );

        let mut stmt = conn.prepare(&sql).into_app_err_with(|| format!("batch {}: query player seasons", index + 1))?;
        let rows = stmt
            .query_map(params_from_iter(batch), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    PlayerSeason {
                        season_id: row.get(1)?,
                        main_spec_id: row.get(2)?,
                        dungeons_completed: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                        total_runs: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                        combined_best_time: row.get(5)?,
                        global_ranking: row.get(6)?,
                        regional_ranking: row.get(7)?,
                        realm_ranking: row.get(8)?,
                        global_bracket: row.get(9)?,
                        regional_bracket: row.get(10)?,
                        realm_bracket: row.get(11)?,
                        last_updated: row.get(12)?,
                    },
                ))
            })
            .into_app_err_with(|| format!("batch {}: query player seasons", index + 1))?;

        for row in rows {
            let (player_id, season) = row.into_app_err("scan player season")?;
            by_player.entry(player_id).or_default().push(season);
        }
    }

    Ok(by_player)
}

/// A stored player, with just enough to address its profile endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRef {
    pub id: i64,
    pub name: String,
    pub realm_slug: String,
    pub region: String,
}

/// Every stored player ordered by id, optionally capped at `limit`.
pub fn load_player_refs(conn: &Connection, limit: Option<usize>) -> Result<Vec<PlayerRef>> {
    // SQLite treats a negative limit as no limit
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.name, r.slug, r.region
             FROM players p
             JOIN realms r ON p.realm_id = r.id
             ORDER BY p.id
             LIMIT ?",
        )
        .into_app_err("query player refs")?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(PlayerRef {
                id: row.get(0)?,
                name: row.get(1)?,
                realm_slug: row.get(2)?,
                region: row.get(3)?,
            })
        })
        .into_app_err("query player refs")?;

    rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan player ref")
}

/// Store the outcome of a character status check.
///
/// A missing `character_id` leaves the stored vendor id untouched.
pub fn record_player_status(conn: &Connection, player_id: i64, is_valid: bool, checked_at: i64, character_id: Option<i64>) -> Result<()> {
    let _ = conn
        .execute(
            "UPDATE players
             SET is_valid = ?1, status_checked_at = ?2, blizzard_character_id = COALESCE(?3, blizzard_character_id)
             WHERE id = ?4",
            params![is_valid, checked_at, character_id, player_id],
        )
        .into_app_err("record player status")?;

    log::trace!(target: LOG_TARGET, "player {player_id} valid={is_valid}");
    Ok(())
}
