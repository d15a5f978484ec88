//! Seasons, dungeons, and realms as stored.

use crate::Result;
use crate::wow::{DungeonInfo, RealmInfo};
use ohno::IntoAppError;
use rusqlite::{Connection, OptionalExtension, params};

const LOG_TARGET: &str = "     store";

/// A season across all regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonRow {
    pub number: i64,
    pub name: Option<String>,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DungeonRow {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub map_challenge_mode_id: Option<i64>,
}

/// A realm with the number of players recorded on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmRow {
    pub slug: String,
    pub name: String,
    pub connected_realm_id: Option<i64>,
    pub parent_realm_slug: Option<String>,
    pub player_count: i64,
}

/// Insert the static realm and dungeon tables, leaving existing rows alone.
///
/// Returns the number of realms and dungeons newly inserted.
pub fn seed_reference_data(conn: &mut Connection, realms: &[RealmInfo], dungeons: &[DungeonInfo]) -> Result<(usize, usize)> {
    let tx = conn.transaction().into_app_err("begin reference data")?;
    let mut new_realms = 0;
    let mut new_dungeons = 0;

    {
        let mut stmt = tx
            .prepare(
                "INSERT OR IGNORE INTO realms (slug, name, region, connected_realm_id, parent_realm_slug)
                 VALUES (?1, ?2, ?3, ?4, NULL)",
            )
            .into_app_err("prepare realm insert")?;
        for realm in realms {
            new_realms += stmt
                .execute(params![realm.slug, realm.name, realm.region.as_ref(), realm.id])
                .into_app_err_with(|| format!("insert realm {}/{}", realm.region, realm.slug))?;
        }

        let mut stmt = tx
            .prepare("INSERT OR IGNORE INTO dungeons (id, slug, name, map_challenge_mode_id) VALUES (?1, ?2, ?3, ?1)")
            .into_app_err("prepare dungeon insert")?;
        for dungeon in dungeons {
            new_dungeons += stmt
                .execute(params![dungeon.id, dungeon.slug, dungeon.name])
                .into_app_err_with(|| format!("insert dungeon {}", dungeon.slug))?;
        }
    }

    tx.commit().into_app_err("commit reference data")?;
    log::debug!(target: LOG_TARGET, "seeded {new_realms} realms and {new_dungeons} dungeons");
    Ok((new_realms, new_dungeons))
}

/// Seasons grouped by number, widest start/end across regions, ascending.
pub fn load_seasons(conn: &Connection) -> Result<Vec<SeasonRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT season_number, MAX(season_name), MIN(start_timestamp), MAX(end_timestamp)
             FROM seasons
             GROUP BY season_number
             ORDER BY season_number ASC",
        )
        .into_app_err("query seasons")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(SeasonRow {
                number: row.get(0)?,
                name: row.get(1)?,
                start_timestamp: row.get(2)?,
                end_timestamp: row.get(3)?,
            })
        })
        .into_app_err("query seasons")?;

    rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan season")
}

/// The newest season still open, or the newest season if all have ended.
pub fn current_season_number(conn: &Connection) -> Result<Option<i64>> {
    let open: Option<i64> = conn
        .query_row("SELECT MAX(season_number) FROM seasons WHERE end_timestamp IS NULL", [], |row| row.get(0))
        .into_app_err("query current season")?;

    if open.is_some() {
        return Ok(open);
    }

    conn.query_row("SELECT MAX(season_number) FROM seasons", [], |row| row.get(0))
        .into_app_err("query latest season")
}

/// Dungeons ordered by name.
pub fn load_dungeons(conn: &Connection) -> Result<Vec<DungeonRow>> {
    let mut stmt = conn
        .prepare("SELECT id, slug, name, map_challenge_mode_id FROM dungeons ORDER BY name")
        .into_app_err("dungeons query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(DungeonRow {
                id: row.get(0)?,
                slug: row.get(1)?,
                name: row.get(2)?,
                map_challenge_mode_id: row.get(3)?,
            })
        })
        .into_app_err("dungeons query")?;

    rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan dungeon")
}

/// Realms of a region ordered by slug.
pub fn load_realms(conn: &Connection, region: &str) -> Result<Vec<RealmRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.slug, r.name, r.connected_realm_id, NULLIF(r.parent_realm_slug, ''), COUNT(DISTINCT p.id)
             FROM realms r
             LEFT JOIN players p ON p.realm_id = r.id
             WHERE r.region = ?1
             GROUP BY r.slug
             ORDER BY r.slug",
        )
        .into_app_err_with(|| format!("query realms for region {region}"))?;

    let rows = stmt
        .query_map([region], |row| {
            Ok(RealmRow {
                slug: row.get(0)?,
                name: row.get(1)?,
                connected_realm_id: row.get(2)?,
                parent_realm_slug: row.get(3)?,
                player_count: row.get(4)?,
            })
        })
        .into_app_err_with(|| format!("query realms for region {region}"))?;

    rows.collect::<rusqlite::Result<Vec<_>>>().into_app_err("scan realm")
}

/// Display name of a realm, if it is known.
pub fn realm_name(conn: &Connection, region: &str, slug: &str) -> Result<Option<String>> {
    conn.query_row("SELECT name FROM realms WHERE region = ?1 AND slug = ?2", [region, slug], |row| row.get(0))
        .optional()
        .into_app_err_with(|| format!("look up realm {region}/{slug}"))
}
