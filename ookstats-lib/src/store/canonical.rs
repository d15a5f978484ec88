//! Canonical team leaderboards.
//!
//! A team is identified by its signature; repeated clears by the same team
//! collapse to the single best one, ordered by duration, then completion time,
//! then run id.

use super::batch::placeholders;
use super::runs::{TeamMember, query_members};
use crate::Result;
use ohno::IntoAppError;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::collections::HashMap;

const LOG_TARGET: &str = "    loader";

/// Which runs a leaderboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardScope<'a> {
    Global,
    Region(&'a str),

    /// A realm plus every realm merged into it through `realm_groups`.
    Realm { region: &'a str, slug: &'a str },
}

impl LeaderboardScope<'_> {
    /// The `(ranking_type, ranking_scope)` key used in `run_rankings`.
    #[must_use]
    pub fn ranking_key(&self) -> (&'static str, String) {
        match self {
            Self::Global => ("global", "filtered".to_string()),
            Self::Region(region) => ("regional", format!("{region}_filtered")),
            Self::Realm { .. } => ("realm", "filtered".to_string()),
        }
    }

    fn filter(&self, season_id: i64, dungeon_id: i64) -> (String, Vec<Value>) {
        let mut clause = String::from("WHERE cr.dungeon_id = ?");
        let mut args = vec![Value::Integer(dungeon_id)];

        match self {
            Self::Global => {}
            Self::Region(region) => {
                clause.push_str(" AND r.region = ?");
                args.push(Value::Text((*region).to_string()));
            }
            Self::Realm { region, slug } => {
                clause.push_str(
                    " AND r.region = ? AND (r.slug = ? OR r.id IN (
                        SELECT g.child_realm_id FROM realm_groups g
                        JOIN realms pr ON g.parent_realm_id = pr.id
                        WHERE pr.region = ? AND pr.slug = ?))",
                );
                args.push(Value::Text((*region).to_string()));
                args.push(Value::Text((*slug).to_string()));
                args.push(Value::Text((*region).to_string()));
                args.push(Value::Text((*slug).to_string()));
            }
        }

        clause.push_str(" AND COALESCE(ps.season_id, 1) = ?");
        args.push(Value::Integer(season_id));
        (clause, args)
    }
}

/// One canonical run on a leaderboard page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub id: i64,
    pub duration: i64,
    pub completed_timestamp: i64,
    pub keystone_level: i64,
    pub dungeon_name: String,
    pub realm_name: String,
    pub region: String,
    pub ranking_percentile: String,
    pub members: Vec<TeamMember>,
}

/// Number of distinct teams with at least one run in scope.
pub fn count_teams(conn: &Connection, dungeon_id: i64, scope: LeaderboardScope<'_>, season_id: i64) -> Result<i64> {
    let (clause, args) = scope.filter(season_id, dungeon_id);
    let sql = format!(
        "SELECT COUNT(*) FROM (
             SELECT cr.team_signature
             FROM challenge_runs cr
             JOIN realms r ON cr.realm_id = r.id
             LEFT JOIN period_seasons ps ON cr.period_id = ps.period_id
             {clause}
             GROUP BY cr.team_signature
         )"
    );

    conn.query_row(&sql, params_from_iter(args), |row| row.get(0))
        .into_app_err("count teams")
}

/// One page of canonical runs, best first, with their scope bracket and members.
pub fn load_canonical_runs(
    conn: &Connection,
    dungeon_id: i64,
    scope: LeaderboardScope<'_>,
    season_id: i64,
    limit: usize,
    offset: usize,
) -> Result<Vec<LeaderboardRow>> {
    let ids = canonical_ids(conn, dungeon_id, scope, season_id, limit, offset)?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let (ranking_type, ranking_scope) = scope.ranking_key();
    let sql = format!(
        "SELECT cr.id, cr.duration, cr.completed_timestamp, COALESCE(cr.keystone_level, 1),
                d.name, rr.name, rr.region,
                COALESCE(rk.percentile_bracket, '')
         FROM challenge_runs cr
         JOIN dungeons d ON cr.dungeon_id = d.id
         JOIN realms rr ON cr.realm_id = rr.id
         LEFT JOIN run_rankings rk ON cr.id = rk.run_id
             AND rk.ranking_type = ? AND rk.ranking_scope = ? AND rk.season_id = ?
         WHERE cr.id IN ({})",
        placeholders(ids.len())
    );

    let mut args = vec![
        Value::Text(ranking_type.to_string()),
        Value::Text(ranking_scope),
        Value::Integer(season_id),
    ];
    args.extend(ids.iter().copied().map(Value::Integer));

    let mut stmt = conn.prepare(&sql).into_app_err("reload canonical runs")?;
    let rows = stmt
        .query_map(params_from_iter(args), |row| {
            Ok(LeaderboardRow {
                id: row.get(0)?,
                duration: row.get(1)?,
                completed_timestamp: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
                keystone_level: row.get(3)?,
                dungeon_name: row.get(4)?,
                realm_name: row.get(5)?,
                region: row.get(6)?,
                ranking_percentile: row.get(7)?,
                members: Vec::new(),
            })
        })
        .into_app_err("reload canonical runs")?;

    let mut by_id = HashMap::with_capacity(ids.len());
    for row in rows {
        let row = row.into_app_err("scan canonical run")?;
        let _ = by_id.insert(row.id, row);
    }

    for member in query_members(conn, &ids).into_app_err("canonical members")? {
        if let Some(row) = by_id.get_mut(&member.run_id) {
            row.members.push(member);
        }
    }

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

fn canonical_ids(
    conn: &Connection,
    dungeon_id: i64,
    scope: LeaderboardScope<'_>,
    season_id: i64,
    limit: usize,
    offset: usize,
) -> Result<Vec<i64>> {
    let (clause, mut args) = scope.filter(season_id, dungeon_id);
    let sql = format!(
        "WITH ranked AS (
             SELECT cr.id, cr.duration, cr.completed_timestamp,
                    ROW_NUMBER() OVER (
                        PARTITION BY cr.team_signature
                        ORDER BY cr.duration ASC, cr.completed_timestamp ASC, cr.id ASC
                    ) AS rn
             FROM challenge_runs cr
             JOIN realms r ON cr.realm_id = r.id
             LEFT JOIN period_seasons ps ON cr.period_id = ps.period_id
             {clause}
         )
         SELECT id FROM ranked WHERE rn = 1
         ORDER BY duration ASC, completed_timestamp ASC, id ASC
         LIMIT ? OFFSET ?"
    );

    args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    args.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

    let mut stmt = conn.prepare(&sql).into_app_err("canonical runs query")?;
    let ids = stmt
        .query_map(params_from_iter(args), |row| row.get::<_, i64>(0))
        .into_app_err("canonical runs query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .into_app_err("scan canonical run id")?;

    log::trace!(target: LOG_TARGET, "dungeon {dungeon_id} {scope:?} season {season_id}: {} canonical runs at offset {offset}", ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::seeded;

    const PALACE: i64 = 5;

    fn seeded_with_teams() -> Connection {
        let conn = seeded();
        conn.execute_batch(
            "INSERT INTO dungeons (id, slug, name, map_challenge_mode_id) VALUES (5, 'mogushan-palace', 'Mogu''shan Palace', 5);
             INSERT INTO challenge_runs (id, duration, completed_timestamp, dungeon_id, realm_id, period_id, team_signature) VALUES
                 (100, 100, 10, 5, 1, 1034, 'A'),
                 (101, 90, 20, 5, 1, 1034, 'A'),
                 (102, 120, 5, 5, 1, 1034, 'B'),
                 (103, 95, 30, 5, 2, 1034, 'C'),
                 (104, 80, 40, 5, 3, 1034, 'D');
             INSERT INTO realm_groups (child_realm_id, parent_realm_id) VALUES (2, 1);",
        )
        .unwrap();
        conn
    }

    fn ids(rows: &[LeaderboardRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_best_run_per_team() {
        let conn = seeded_with_teams();
        let scope = LeaderboardScope::Region("us");
        let rows = load_canonical_runs(&conn, PALACE, scope, 2, 10, 0).unwrap();

        // A's 90 beats A's 100; C is on a us realm too
        assert_eq!(ids(&rows), [101, 103, 102]);
        assert_eq!(rows[0].duration, 90);
        assert_eq!(count_teams(&conn, PALACE, scope, 2).unwrap(), 3);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_global_includes_every_region() {
        let conn = seeded_with_teams();
        let rows = load_canonical_runs(&conn, PALACE, LeaderboardScope::Global, 2, 10, 0).unwrap();
        assert_eq!(ids(&rows), [104, 101, 103, 102]);
        assert_eq!(count_teams(&conn, PALACE, LeaderboardScope::Global, 2).unwrap(), 4);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_limit_and_offset() {
        let conn = seeded_with_teams();
        let page = load_canonical_runs(&conn, PALACE, LeaderboardScope::Global, 2, 2, 2).unwrap();
        assert_eq!(ids(&page), [103, 102]);

        let past_end = load_canonical_runs(&conn, PALACE, LeaderboardScope::Global, 2, 2, 10).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_realm_scope_includes_merged_children() {
        let conn = seeded_with_teams();
        let pagle = LeaderboardScope::Realm { region: "us", slug: "pagle" };
        let rows = load_canonical_runs(&conn, PALACE, pagle, 2, 10, 0).unwrap();
        assert_eq!(ids(&rows), [101, 103, 102]);
        assert_eq!(rows[1].realm_name, "Nazgrim");

        let nazgrim = LeaderboardScope::Realm { region: "us", slug: "nazgrim" };
        assert_eq!(ids(&load_canonical_runs(&conn, PALACE, nazgrim, 2, 10, 0).unwrap()), [103]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_bracket_and_members() {
        let conn = seeded();
        let rows = load_canonical_runs(&conn, 2, LeaderboardScope::Global, 2, 25, 0).unwrap();
        assert_eq!(ids(&rows), [11]);

        let run = &rows[0];
        assert_eq!(run.ranking_percentile, "legendary");
        assert_eq!(run.dungeon_name, "Scholomance");
        assert_eq!(run.realm_name, "Pagle");
        let names: Vec<&str> = run.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Aak", "Ook"]);

        // regional bracket comes from the us_filtered row
        let regional = load_canonical_runs(&conn, 2, LeaderboardScope::Region("us"), 2, 25, 0).unwrap();
        assert_eq!(regional[0].ranking_percentile, "epic");

        // no realm ranking row
        let realm = LeaderboardScope::Realm { region: "us", slug: "pagle" };
        assert_eq!(load_canonical_runs(&conn, 2, realm, 2, 25, 0).unwrap()[0].ranking_percentile, "");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_unmapped_period_falls_back_to_first_season() {
        let conn = seeded();
        conn.execute_batch(
            "INSERT INTO challenge_runs (id, duration, completed_timestamp, dungeon_id, realm_id, period_id, team_signature)
             VALUES (30, 500, 1, 9, 1, 999, '4')",
        )
        .unwrap();

        let rows = load_canonical_runs(&conn, 9, LeaderboardScope::Global, 1, 25, 0).unwrap();
        assert_eq!(ids(&rows), [30]);
    }

    #[test]
    fn test_ranking_keys() {
        assert_eq!(LeaderboardScope::Global.ranking_key(), ("global", "filtered".to_string()));
        assert_eq!(LeaderboardScope::Region("eu").ranking_key(), ("regional", "eu_filtered".to_string()));
        let realm = LeaderboardScope::Realm { region: "eu", slug: "everlook" };
        assert_eq!(realm.ranking_key(), ("realm", "filtered".to_string()));
    }
}
