//! Paginated player leaderboards.
//!
//! Players with complete coverage, fastest combined best time first. Pages live
//! below `leaderboard/season/<sid>/players/` at `global/<page>.json`,
//! `regional/<region>/<page>.json`, and `realm/<region>/<realm>/<page>.json`;
//! the same three scopes repeat below `class/<class>/` for each class.

use super::{DEFAULT_PAGE_SIZE, DocumentSink, EmitStats, Pagination, season_path};
use crate::Result;
use crate::store::{self, RankedPlayer};
use crate::wow::{Bracket, CLASSES, Region, fill_class_and_spec};
use camino::Utf8Path;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "   players";

/// One page of a player leaderboard.
#[derive(Debug, Serialize)]
pub struct PlayerLeaderboardPage {
    pub leaderboard: Vec<PlayerEntry>,
    pub title: String,
    pub generated_timestamp: i64,
    pub pagination: PlayerPagination,
}

#[derive(Debug, Serialize)]
pub struct PlayerEntry {
    pub player_id: i64,
    pub name: String,
    pub realm_slug: String,
    pub realm_name: String,
    pub region: String,
    pub class_name: String,
    pub active_spec_name: String,
    pub dungeons_completed: i64,
    pub total_runs: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ranking_percentile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_spec_id: Option<i64>,
    pub combined_best_time: i64,
}

/// Page counters; `totalRuns` repeats the player count for older readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_players: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub total_runs: usize,
}

impl From<Pagination> for PlayerPagination {
    fn from(p: Pagination) -> Self {
        Self {
            current_page: p.current_page,
            page_size: p.page_size,
            total_players: p.total_runs,
            total_pages: p.total_pages,
            has_next_page: p.has_next_page,
            has_prev_page: p.has_prev_page,
            total_runs: p.total_runs,
        }
    }
}

/// Where a page's `ranking_percentile` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Percentile {
    Global,
    Regional,

    /// Recomputed from the position on this board.
    Position,
}

#[derive(Debug)]
struct Emitter<'a> {
    sink: DocumentSink,
    regions: &'a [Region],
    page_size: usize,
    generated_timestamp: i64,
}

/// Write global, regional, and realm player leaderboards for every stored
/// season, then the same boards filtered to each class.
///
/// Players on a realm merged into a parent are listed on the parent's pages.
pub fn emit_player_leaderboards(conn: &Connection, api: &Utf8Path, regions: &[Region], page_size: usize) -> Result<EmitStats> {
    let mut emitter = Emitter {
        sink: DocumentSink::new(),
        regions,
        page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        generated_timestamp: Utc::now().timestamp_millis(),
    };

    let seasons = store::load_seasons(conn)?;
    if seasons.is_empty() {
        log::warn!(target: LOG_TARGET, "no seasons stored, skipping player leaderboards");
        return Ok(emitter.sink.stats);
    }

    for season in seasons.iter().map(|s| s.number) {
        let players = store::load_ranked_players(conn, season)?;
        log::info!(target: LOG_TARGET, "season {season}: {} ranked players", players.len());

        let dir = season_path(api, season).join("players");
        let everyone: Vec<&RankedPlayer> = players.iter().collect();
        emitter.emit_scopes(&dir, &everyone);

        for class in CLASSES {
            let members: Vec<&RankedPlayer> = players.iter().filter(|p| class_and_spec(p).0 == class.name).collect();
            if !members.is_empty() {
                emitter.emit_scopes(&dir.join("class").join(class.key), &members);
            }
        }
    }

    let stats = emitter.sink.stats;
    log::info!(target: LOG_TARGET, "wrote {} player leaderboard pages ({} failed)", stats.written, stats.failed);
    Ok(stats)
}

impl Emitter<'_> {
    fn emit_scopes(&mut self, dir: &Utf8Path, players: &[&RankedPlayer]) {
        self.emit_board(&dir.join("global"), players, "Global Player Rankings", Percentile::Global);

        for region in self.regions {
            let regional: Vec<&RankedPlayer> = players.iter().copied().filter(|p| p.region == region.as_ref()).collect();
            let label = region.as_ref().to_uppercase();
            self.emit_board(
                &dir.join("regional").join(region.as_ref()),
                &regional,
                &format!("{label} Player Rankings"),
                Percentile::Regional,
            );

            let mut pools: BTreeMap<&str, Vec<&RankedPlayer>> = BTreeMap::new();
            for player in regional {
                pools.entry(player.pool_slug.as_str()).or_default().push(player);
            }
            for (pool, members) in &pools {
                self.emit_board(
                    &dir.join("realm").join(region.as_ref()).join(pool),
                    members,
                    &format!("{label}/{pool} Player Rankings"),
                    Percentile::Position,
                );
            }
        }
    }

    fn emit_board(&mut self, dir: &Utf8Path, players: &[&RankedPlayer], title: &str, percentile: Percentile) {
        let total = players.len();
        let total_rank = i64::try_from(total).unwrap_or(i64::MAX);

        for (index, chunk) in players.chunks(self.page_size).enumerate() {
            let page = index + 1;
            let offset = index * self.page_size;

            let leaderboard = chunk
                .iter()
                .enumerate()
                .map(|(i, player)| {
                    let ranking_percentile = match percentile {
                        Percentile::Global => player.global_bracket.clone(),
                        Percentile::Regional => player.regional_bracket.clone(),
                        Percentile::Position => {
                            let rank = i64::try_from(offset + i + 1).unwrap_or(i64::MAX);
                            Bracket::from_rank(rank, total_rank).to_string()
                        }
                    };
                    entry(player, ranking_percentile)
                })
                .collect();

            let doc = PlayerLeaderboardPage {
                leaderboard,
                title: title.to_string(),
                generated_timestamp: self.generated_timestamp,
                pagination: Pagination::new(page, self.page_size, total).into(),
            };
            self.sink.write(&dir.join(format!("{page}.json")), &doc);
        }
    }
}

/// Stored class and spec names, filled in from the main spec where missing.
fn class_and_spec(player: &RankedPlayer) -> (String, String) {
    let mut class_name = player.class_name.clone();
    let mut spec_name = player.active_spec_name.clone();
    fill_class_and_spec(&mut class_name, &mut spec_name, player.main_spec_id);
    (class_name, spec_name)
}

fn entry(player: &RankedPlayer, ranking_percentile: String) -> PlayerEntry {
    let (class_name, active_spec_name) = class_and_spec(player);

    PlayerEntry {
        player_id: player.id,
        name: player.name.clone(),
        realm_slug: player.realm_slug.clone(),
        realm_name: player.realm_name.clone(),
        region: player.region.clone(),
        class_name,
        active_spec_name,
        dungeons_completed: player.dungeons_completed,
        total_runs: player.total_runs,
        ranking_percentile,
        main_spec_id: player.main_spec_id,
        combined_best_time: player.combined_best_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::seeded;
    use camino::Utf8PathBuf;
    use serde_json::Value;
    use std::fs;

    fn read(path: &Utf8Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn temp_api() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let api = Utf8PathBuf::from_path_buf(dir.path().join("api")).unwrap();
        (dir, api)
    }

    fn with_more_players() -> Connection {
        let conn = seeded();
        conn.execute_batch(
            "INSERT INTO realm_groups (child_realm_id, parent_realm_id) VALUES (2, 1);
             INSERT INTO player_profiles (player_id, season_id, main_spec_id, class_name, dungeons_completed, total_runs,
                                          combined_best_time, global_ranking_bracket, regional_ranking_bracket,
                                          has_complete_coverage) VALUES
                 (3, 2, 270, 'Monk', 9, 11, 1400000, 'artifact', 'artifact', 1),
                 (2, 2, 250, NULL, 9, 9, 1600000, 'common', 'artifact', 1);",
        )
        .unwrap();
        conn
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_global_page_shape() {
        let (_guard, api) = temp_api();
        let stats = emit_player_leaderboards(&with_more_players(), &api, &[Region::Us, Region::Eu], 25).unwrap();
        assert_eq!(stats.failed, 0);

        let page = read(&api.join("leaderboard/season/2/players/global/1.json"));
        assert_eq!(page["title"], "Global Player Rankings");
        assert!(page["generated_timestamp"].as_i64().unwrap() > 0);
        assert_eq!(page["pagination"]["totalPlayers"], 3);
        assert_eq!(page["pagination"]["totalRuns"], 3);

        let board = page["leaderboard"].as_array().unwrap();
        let names: Vec<&str> = board.iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["Aak", "Ook", "Eek"]);

        let ook = &board[1];
        assert_eq!(ook["realm_name"], "Pagle");
        assert_eq!(ook["active_spec_name"], "Windwalker");
        assert_eq!(ook["ranking_percentile"], "epic");
        assert_eq!(ook["combined_best_time"], 1_500_000);

        // class and spec fall back to the main spec
        assert_eq!(board[2]["class_name"], "Death Knight");
        assert_eq!(board[2]["active_spec_name"], "Blood");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_regional_and_realm_pages() {
        let (_guard, api) = temp_api();
        let _ = emit_player_leaderboards(&with_more_players(), &api, &[Region::Us, Region::Eu], 25).unwrap();
        let players = api.join("leaderboard/season/2/players");

        let us = read(&players.join("regional/us/1.json"));
        assert_eq!(us["title"], "US Player Rankings");
        assert_eq!(us["pagination"]["totalPlayers"], 2);

        let eu = read(&players.join("regional/eu/1.json"));
        assert_eq!(eu["leaderboard"][0]["name"], "Eek");
        assert_eq!(eu["leaderboard"][0]["ranking_percentile"], "artifact");

        // Aak plays on nazgrim, merged into pagle
        let pagle = read(&players.join("realm/us/pagle/1.json"));
        assert_eq!(pagle["title"], "US/pagle Player Rankings");
        assert_eq!(pagle["leaderboard"][0]["realm_slug"], "nazgrim");
        assert_eq!(pagle["leaderboard"][0]["ranking_percentile"], "artifact");
        assert_eq!(pagle["leaderboard"][1]["ranking_percentile"], "common");
        assert!(!players.join("realm/us/nazgrim").exists());

        assert!(!players.join("regional/kr").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_class_pages() {
        let (_guard, api) = temp_api();
        let _ = emit_player_leaderboards(&with_more_players(), &api, &[Region::Us, Region::Eu], 25).unwrap();
        let class = api.join("leaderboard/season/2/players/class");

        let monk = read(&class.join("monk/global/1.json"));
        let names: Vec<&str> = monk["leaderboard"].as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["Aak", "Ook"]);
        assert!(class.join("monk/realm/us/pagle/1.json").exists());

        // Eek's class comes from the main spec alone
        let dk = read(&class.join("death_knight/regional/eu/1.json"));
        assert_eq!(dk["leaderboard"][0]["name"], "Eek");
        assert!(!class.join("death_knight/regional/us").exists());
        assert!(!class.join("mage").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_pages_split_by_size() {
        let (_guard, api) = temp_api();
        let _ = emit_player_leaderboards(&with_more_players(), &api, &[Region::Us], 2).unwrap();
        let global = api.join("leaderboard/season/2/players/global");

        let first = read(&global.join("1.json"));
        assert_eq!(first["pagination"]["totalPages"], 2);
        assert_eq!(first["pagination"]["hasNextPage"], true);

        let second = read(&global.join("2.json"));
        assert_eq!(second["leaderboard"].as_array().unwrap().len(), 1);
        assert_eq!(second["pagination"]["hasPrevPage"], true);
        assert!(!global.join("3.json").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_no_seasons_writes_nothing() {
        let conn = seeded();
        conn.execute_batch("DELETE FROM seasons").unwrap();

        let (_guard, api) = temp_api();
        let stats = emit_player_leaderboards(&conn, &api, &[Region::Us], 25).unwrap();
        assert_eq!(stats, EmitStats::default());
        assert!(!api.exists());
    }
}
