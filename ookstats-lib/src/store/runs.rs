use super::batch::{BATCH_SIZE, placeholders};
use crate::Result;
use ohno::IntoAppError;
use rusqlite::{Connection, params_from_iter};
use std::collections::{HashMap, HashSet};

const LOG_TARGET: &str = "    loader";

/// A player's best run for one dungeon in one season, with filtered rankings.
///
/// Missing ranking rows surface as `None` rankings and empty bracket strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestRun {
    pub dungeon_id: i64,
    pub dungeon_name: String,
    pub dungeon_slug: String,
    pub run_id: i64,
    pub duration: i64,
    pub completed_timestamp: i64,
    pub season_id: i64,
    pub global_ranking: Option<i64>,
    pub regional_ranking: Option<i64>,
    pub realm_ranking: Option<i64>,
    pub global_bracket: String,
    pub regional_bracket: String,
    pub realm_bracket: String,
}

/// One participant of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamMember {
    pub run_id: i64,
    pub name: String,
    pub spec_id: Option<i64>,
    pub region: String,
    pub realm_slug: String,
}

/// Best runs per player plus the distinct run ids they reference, in first-seen
/// order.
pub type BestRuns = (HashMap<i64, Vec<BestRun>>, Vec<i64>);

/// Best runs for the given players, each joined against its global, regional,
/// and realm rankings.
pub fn load_best_runs(conn: &Connection, player_ids: &[i64]) -> Result<BestRuns> {
    let mut by_player: HashMap<i64, Vec<BestRun>> = HashMap::new();
    let mut seen = HashSet::new();
    let mut run_ids = Vec::new();

    for (index, batch) in player_ids.chunks(BATCH_SIZE).enumerate() {
        let sql = format!(
            "SELECT pbr.player_id, pbr.dungeon_id, d.name, d.slug, pbr.run_id, pbr.duration, pbr.completed_timestamp,
                    pbr.season_id,
                    rr_global.ranking, rr_regional.ranking, rr_realm.ranking,
                    COALESCE(rr_global.percentile_bracket, ''),
                    COALESCE(rr_regional.percentile_bracket, ''),
                    COALESCE(rr_realm.percentile_bracket, '')
             FROM player_best_runs pbr
             JOIN dungeons d ON pbr.dungeon_id = d.id
             JOIN players p ON pbr.player_id = p.id
             JOIN realms r ON p.realm_id = r.id
             LEFT JOIN run_rankings rr_global ON pbr.run_id = rr_global.run_id
                 AND rr_global.ranking_type = 'global' AND rr_global.ranking_scope = 'filtered'
                 AND rr_global.season_id = pbr.season_id
             LEFT JOIN run_rankings rr_regional ON pbr.run_id = rr_regional.run_id
                 AND rr_regional.ranking_type = 'regional' AND rr_regional.ranking_scope = r.region || '_filtered'
                 AND rr_regional.season_id = pbr.season_id
             LEFT JOIN run_rankings rr_realm ON pbr.run_id = rr_realm.run_id
                 AND rr_realm.ranking_type = 'realm' AND rr_realm.ranking_scope = 'filtered'
                 AND rr_realm.season_id = pbr.season_id
             WHERE pbr.player_id IN ({})
             ORDER BY pbr.player_id, pbr.season_id, d.name",
            placeholders(batch.len())
        );

        let mut stmt = conn.prepare(&sql).into_app_err_with(|| format!("batch {}: query best runs", index + 1))?;
        let rows = stmt
            .query_map(params_from_iter(batch), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    BestRun {
                        dungeon_id: row.get(1)?,
                        dungeon_name: row.get(2)?,
                        dungeon_slug: row.get(3)?,
                        run_id: row.get(4)?,
                        duration: row.get(5)?,
                        completed_timestamp: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
                        season_id: row.get(7)?,
                        global_ranking: row.get(8)?,
                        regional_ranking: row.get(9)?,
                        realm_ranking: row.get(10)?,
                        global_bracket: row.get(11)?,
                        regional_bracket: row.get(12)?,
                        realm_bracket: row.get(13)?,
                    },
                ))
            })
            .into_app_err_with(|| format!("batch {}: query best runs", index + 1))?;

        for row in rows {
            let (player_id, run) = row.into_app_err("scan best run")?;
            if seen.insert(run.run_id) {
                run_ids.push(run.run_id);
            }
            by_player.entry(player_id).or_default().push(run);
        }
    }

    log::debug!(target: LOG_TARGET, "loaded best runs for {} players ({} distinct runs)", by_player.len(), run_ids.len());
    Ok((by_player, run_ids))
}

/// Members of the given runs, ordered by run then name.
pub fn load_team_members(conn: &Connection, run_ids: &[i64]) -> Result<HashMap<i64, Vec<TeamMember>>> {
    let mut by_run: HashMap<i64, Vec<TeamMember>> = HashMap::new();

    for (index, batch) in run_ids.chunks(BATCH_SIZE).enumerate() {
        for member in query_members(conn, batch).into_app_err_with(|| format!("batch {}", index + 1))? {
            by_run.entry(member.run_id).or_default().push(member);
        }
    }

    Ok(by_run)
}

/// Members of at most [`BATCH_SIZE`] runs, ordered by run then name.
pub(super) fn query_members(conn: &Connection, run_ids: &[i64]) -> rusqlite::Result<Vec<TeamMember>> {
    let sql = format!(
        "SELECT rm.run_id, p.name, rm.spec_id, r.region, r.slug
         FROM run_members rm
         JOIN players p ON rm.player_id = p.id
         JOIN realms r ON p.realm_id = r.id
         WHERE rm.run_id IN ({})
         ORDER BY rm.run_id, p.name",
        placeholders(run_ids.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(run_ids), |row| {
        Ok(TeamMember {
            run_id: row.get(0)?,
            name: row.get(1)?,
            spec_id: row.get(2)?,
            region: row.get(3)?,
            realm_slug: row.get(4)?,
        })
    })?;

    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::seeded;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_best_runs_with_rankings() {
        let conn = seeded();
        let (by_player, run_ids) = load_best_runs(&conn, &[1]).unwrap();

        let runs = &by_player[&1];
        // ordered by season, then dungeon name
        let names: Vec<&str> = runs.iter().map(|r| r.dungeon_name.as_str()).collect();
        assert_eq!(names, ["Scholomance", "Stormstout Brewery"]);

        let scholo = &runs[0];
        assert_eq!(scholo.run_id, 11);
        assert_eq!(scholo.global_ranking, Some(5));
        assert_eq!(scholo.global_bracket, "legendary");
        assert_eq!(scholo.regional_ranking, Some(3));
        assert_eq!(scholo.regional_bracket, "epic");

        // no realm ranking row
        assert_eq!(scholo.realm_ranking, None);
        assert_eq!(scholo.realm_bracket, "");

        assert_eq!(run_ids, [11, 20]);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_regional_scope_uses_player_region() {
        let conn = seeded();
        let (by_player, _) = load_best_runs(&conn, &[2]).unwrap();

        // run 13 is ranked under eu_filtered, not us_filtered
        let run = &by_player[&2][0];
        assert_eq!(run.regional_ranking, Some(1));
        assert_eq!(run.regional_bracket, "artifact");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_team_members_ordered_by_name() {
        let conn = seeded();
        let members = load_team_members(&conn, &[11]).unwrap();

        let names: Vec<&str> = members[&11].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Aak", "Ook"]);
        assert_eq!(members[&11][0].realm_slug, "nazgrim");
        assert_eq!(members[&11][1].spec_id, Some(269));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_team_members_batch_error_names_batch() {
        let conn = crate::store::open_in_memory().unwrap();
        let err = load_team_members(&conn, &[1]).unwrap_err();
        assert!(err.to_string().contains("batch 1"), "{err}");
    }
}
