//! Paginated dungeon leaderboards.
//!
//! One canonical run per team, best first. Pages live at
//! `leaderboard/season/<sid>/global/<dungeon>/<page>.json`,
//! `.../<region>/all/<dungeon>/<page>.json`, and
//! `.../<region>/<realm>/<dungeon>/<page>.json`.

use super::{DocumentSink, EmitStats, season_path};
use crate::Result;
use crate::store::{self, DungeonRow, LeaderboardRow, LeaderboardScope};
use crate::wow::{RealmAliases, Region};
use camino::Utf8Path;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "    boards";

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One page of a dungeon leaderboard.
#[derive(Debug, Serialize)]
pub struct LeaderboardPage {
    pub leading_groups: Vec<LeadingGroup>,
    pub map: MapInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_realm: Option<ConnectedRealm>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct LeadingGroup {
    pub id: i64,
    pub duration: i64,
    pub completed_timestamp: i64,
    pub keystone_level: i64,
    pub dungeon_name: String,
    pub realm_name: String,
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ranking_percentile: String,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Serialize)]
pub struct GroupMember {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<i64>,
    pub region: String,
    pub realm_slug: String,
}

#[derive(Debug, Serialize)]
pub struct MapInfo {
    pub name: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectedRealm {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_runs: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    #[must_use]
    pub const fn new(current_page: usize, page_size: usize, total_runs: usize) -> Self {
        let total_pages = page_count(total_runs, page_size);
        Self {
            current_page,
            page_size,
            total_runs,
            total_pages,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }
}

/// Pages needed for `total` rows; zero rows need zero pages.
#[must_use]
pub const fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 { 0 } else { total.div_ceil(page_size) }
}

/// A single leaderboard to paginate.
#[derive(Debug, Clone, Copy)]
struct Board<'a> {
    dungeon: &'a DungeonRow,
    scope: LeaderboardScope<'a>,
    season: i64,
    realm_name: Option<&'a str>,
}

/// Write global, regional, and realm leaderboards for every stored season and
/// dungeon.
///
/// Realms merged into a parent get no pages of their own; their runs appear on
/// the parent's pages.
pub fn emit_leaderboards(
    conn: &Connection,
    api: &Utf8Path,
    regions: &[Region],
    aliases: &RealmAliases,
    page_size: usize,
) -> Result<EmitStats> {
    let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let mut sink = DocumentSink::new();

    let seasons = store::load_seasons(conn)?;
    if seasons.is_empty() {
        log::warn!(target: LOG_TARGET, "no seasons stored, skipping leaderboards");
        return Ok(sink.stats);
    }

    let dungeons = store::load_dungeons(conn)?;

    let mut realms = Vec::new();
    for region in regions {
        let listed: Vec<_> = store::load_realms(conn, region.as_ref())?
            .into_iter()
            .filter(|realm| aliases.parent_of(region.as_ref(), &realm.slug).is_none())
            .collect();
        realms.push((*region, listed));
    }

    for season in seasons.iter().map(|s| s.number) {
        let dir = season_path(api, season);
        log::info!(target: LOG_TARGET, "season {season}: generating leaderboards");

        for dungeon in &dungeons {
            let board = Board {
                dungeon,
                scope: LeaderboardScope::Global,
                season,
                realm_name: None,
            };
            emit_board(&mut sink, conn, &dir.join("global").join(&dungeon.slug), board, page_size)?;
        }

        for (region, listed) in &realms {
            let region_dir = dir.join(region.as_ref());

            for dungeon in &dungeons {
                let board = Board {
                    dungeon,
                    scope: LeaderboardScope::Region(region.as_ref()),
                    season,
                    realm_name: None,
                };
                emit_board(&mut sink, conn, &region_dir.join("all").join(&dungeon.slug), board, page_size)?;
            }

            for realm in listed {
                log::debug!(target: LOG_TARGET, "season {season}: realm {region}/{}", realm.slug);
                for dungeon in &dungeons {
                    let board = Board {
                        dungeon,
                        scope: LeaderboardScope::Realm {
                            region: region.as_ref(),
                            slug: &realm.slug,
                        },
                        season,
                        realm_name: Some(&realm.name),
                    };
                    emit_board(&mut sink, conn, &region_dir.join(&realm.slug).join(&dungeon.slug), board, page_size)?;
                }
            }
        }
    }

    log::info!(target: LOG_TARGET, "wrote {} leaderboard pages ({} failed)", sink.stats.written, sink.stats.failed);
    Ok(sink.stats)
}

fn emit_board(sink: &mut DocumentSink, conn: &Connection, dir: &Utf8Path, board: Board<'_>, page_size: usize) -> Result<()> {
    let total = store::count_teams(conn, board.dungeon.id, board.scope, board.season)?;
    let total = usize::try_from(total).unwrap_or_default();

    for page in 1..=page_count(total, page_size) {
        let rows = store::load_canonical_runs(conn, board.dungeon.id, board.scope, board.season, page_size, (page - 1) * page_size)?;
        let doc = build_page(rows, &board.dungeon.name, board.realm_name, Pagination::new(page, page_size, total));
        sink.write(&dir.join(format!("{page}.json")), &doc);
    }

    Ok(())
}

fn build_page(rows: Vec<LeaderboardRow>, dungeon_name: &str, realm_name: Option<&str>, pagination: Pagination) -> LeaderboardPage {
    let leading_groups = rows
        .into_iter()
        .map(|row| LeadingGroup {
            id: row.id,
            duration: row.duration,
            completed_timestamp: row.completed_timestamp,
            keystone_level: row.keystone_level,
            dungeon_name: row.dungeon_name,
            realm_name: row.realm_name,
            region: row.region,
            ranking_percentile: row.ranking_percentile,
            members: row
                .members
                .into_iter()
                .map(|m| GroupMember {
                    name: m.name,
                    spec_id: m.spec_id,
                    region: m.region,
                    realm_slug: m.realm_slug,
                })
                .collect(),
        })
        .collect();

    LeaderboardPage {
        leading_groups,
        map: MapInfo {
            name: BTreeMap::from([("en_US", dungeon_name.to_string())]),
        },
        connected_realm: realm_name.filter(|name| !name.is_empty()).map(|name| ConnectedRealm { name: name.to_string() }),
        pagination,
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

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 25), 0);
        assert_eq!(page_count(1, 25), 1);
        assert_eq!(page_count(25, 25), 1);
        assert_eq!(page_count(26, 25), 2);
        assert_eq!(page_count(10, 0), 0);
    }

    #[test]
    fn test_pagination_flags() {
        let first = Pagination::new(1, 2, 5);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next_page);
        assert!(!first.has_prev_page);

        let last = Pagination::new(3, 2, 5);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let json = serde_json::to_value(first).unwrap();
        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["totalRuns"], 5);
        assert_eq!(json["hasPrevPage"], false);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_global_page_shape() {
        let (_guard, api) = temp_api();
        let stats = emit_leaderboards(&seeded(), &api, &[Region::Us, Region::Eu], &RealmAliases::default(), 25).unwrap();
        assert_eq!(stats.failed, 0);

        let page = read(&api.join("leaderboard/season/2/global/scholomance/1.json"));
        assert_eq!(page["map"]["name"]["en_US"], "Scholomance");
        assert!(page.get("connected_realm").is_none());
        assert_eq!(page["pagination"]["totalRuns"], 1);

        let run = &page["leading_groups"][0];
        assert_eq!(run["id"], 11);
        assert_eq!(run["ranking_percentile"], "legendary");
        assert_eq!(run["members"][0]["name"], "Aak");
        assert_eq!(run["members"][0]["realm_slug"], "nazgrim");
        assert_eq!(run["members"][1]["spec_id"], 269);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_regional_and_realm_pages() {
        let (_guard, api) = temp_api();
        let _ = emit_leaderboards(&seeded(), &api, &[Region::Us, Region::Eu], &RealmAliases::default(), 25).unwrap();
        let season = api.join("leaderboard/season/1");

        let eu = read(&season.join("eu/all/scholomance/1.json"));
        assert_eq!(eu["leading_groups"][0]["id"], 13);
        assert_eq!(eu["leading_groups"][0]["ranking_percentile"], "artifact");

        let realm = read(&season.join("eu/everlook/scholomance/1.json"));
        assert_eq!(realm["connected_realm"]["name"], "Everlook");
        // no realm ranking row, so the field is omitted
        assert!(realm["leading_groups"][0].get("ranking_percentile").is_none());

        // empty leaderboards produce no pages
        assert!(!season.join("us/all/scholomance/1.json").exists());
        assert!(!season.join("kr").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_pages_split_by_size() {
        let conn = seeded();
        conn.execute_batch(
            "INSERT INTO challenge_runs (id, duration, completed_timestamp, dungeon_id, realm_id, period_id, team_signature) VALUES
                 (40, 100, 1, 9, 1, 1034, 'x'),
                 (41, 200, 1, 9, 1, 1034, 'y'),
                 (42, 300, 1, 9, 1, 1034, 'z');",
        )
        .unwrap();

        let (_guard, api) = temp_api();
        let _ = emit_leaderboards(&conn, &api, &[Region::Us], &RealmAliases::default(), 2).unwrap();
        let dir = api.join("leaderboard/season/2/us/pagle/stormstout-brewery");

        // runs 40, 41, 42 plus the stored run 20
        let first = read(&dir.join("1.json"));
        assert_eq!(first["pagination"]["totalPages"], 2);
        assert_eq!(first["leading_groups"].as_array().unwrap().len(), 2);

        let second = read(&dir.join("2.json"));
        assert_eq!(second["pagination"]["hasNextPage"], false);
        assert_eq!(second["leading_groups"][1]["id"], 20);
        assert!(!dir.join("3.json").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_merged_child_has_no_pages() {
        let table = BTreeMap::from([(
            "us".to_string(),
            BTreeMap::from([("nazgrim".to_string(), "pagle".to_string())]),
        )]);
        let (_guard, api) = temp_api();
        let _ = emit_leaderboards(&seeded(), &api, &[Region::Us], &RealmAliases::new(&table), 25).unwrap();

        assert!(!api.join("leaderboard/season/2/us/nazgrim").exists());
        assert!(api.join("leaderboard/season/2/us/pagle/scholomance/1.json").exists());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_no_seasons_writes_nothing() {
        let conn = seeded();
        conn.execute_batch("DELETE FROM seasons").unwrap();

        let (_guard, api) = temp_api();
        let stats = emit_leaderboards(&conn, &api, &[Region::Us], &RealmAliases::default(), 25).unwrap();
        assert_eq!(stats, EmitStats::default());
        assert!(!api.exists());
    }
}
