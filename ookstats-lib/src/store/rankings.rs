//! Derived tables rebuilt from the raw runs.
//!
//! One pass fills missing team signatures, ranks canonical runs per dungeon and
//! season, picks each player's best runs, and rebuilds the per-season player
//! profiles with their own rankings. Everything runs in one transaction, so
//! readers see either the previous tables or the new ones.

use crate::Result;
use crate::wow::{Bracket, spec_info, team_signature};
use ohno::IntoAppError;
use rusqlite::{Connection, Transaction, params};
use std::collections::{BTreeMap, HashMap, HashSet};

const LOG_TARGET: &str = "  rankings";

/// Row counts written by [`compute_rankings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingStats {
    pub signatures: usize,
    pub run_rankings: usize,
    pub best_runs: usize,
    pub profiles: usize,
    pub ranked_players: usize,
}

/// Rebuild `run_rankings`, `player_best_runs`, and `player_profiles`.
///
/// `computed_at` is stamped on every ranking and profile row.
pub fn compute_rankings(conn: &mut Connection, computed_at: i64) -> Result<RankingStats> {
    let tx = conn.transaction().into_app_err("begin ranking pass")?;

    let signatures = fill_team_signatures(&tx)?;
    let run_rankings = rank_runs(&tx, computed_at)?;
    let best_runs = select_best_runs(&tx)?;
    let (profiles, ranked_players) = build_profiles(&tx, computed_at)?;

    tx.commit().into_app_err("commit ranking pass")?;

    let stats = RankingStats {
        signatures,
        run_rankings,
        best_runs,
        profiles,
        ranked_players,
    };
    log::info!(
        target: LOG_TARGET,
        "{} run rankings, {} best runs, {} profiles ({} ranked)",
        stats.run_rankings,
        stats.best_runs,
        stats.profiles,
        stats.ranked_players
    );
    Ok(stats)
}

fn fill_team_signatures(tx: &Transaction<'_>) -> Result<usize> {
    let mut members: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    {
        let mut stmt = tx
            .prepare(
                "SELECT rm.run_id, rm.player_id
                 FROM run_members rm
                 JOIN challenge_runs cr ON rm.run_id = cr.id
                 WHERE COALESCE(cr.team_signature, '') = ''",
            )
            .into_app_err("query unsigned runs")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .into_app_err("query unsigned runs")?;
        for row in rows {
            let (run_id, player_id) = row.into_app_err("scan run member")?;
            members.entry(run_id).or_default().push(player_id);
        }
    }

    let mut stmt = tx
        .prepare("UPDATE challenge_runs SET team_signature = ?1 WHERE id = ?2")
        .into_app_err("prepare signature update")?;
    for (run_id, player_ids) in &members {
        let _ = stmt
            .execute(params![team_signature(player_ids), run_id])
            .into_app_err_with(|| format!("failed signing run {run_id}"))?;
    }

    if !members.is_empty() {
        log::debug!(target: LOG_TARGET, "signed {} runs", members.len());
    }
    Ok(members.len())
}

#[derive(Debug)]
struct RunRow {
    id: i64,
    dungeon_id: i64,
    season_id: i64,
    region: String,
    pool_id: i64,
    signature: String,
    duration: i64,
    completed_timestamp: i64,
}

/// Leaderboard a run competes on: `(season, dungeon, ranking_type, ranking_scope, pool)`.
type BoardKey = (i64, i64, &'static str, String, Option<i64>);

fn rank_runs(tx: &Transaction<'_>, computed_at: i64) -> Result<usize> {
    let _ = tx.execute("DELETE FROM run_rankings", []).into_app_err("failed clearing run_rankings")?;

    let mut runs = Vec::new();
    {
        let mut stmt = tx
            .prepare(
                "SELECT cr.id, cr.dungeon_id, COALESCE(ps.season_id, 1), r.region, COALESCE(g.parent_realm_id, cr.realm_id),
                        COALESCE(cr.team_signature, ''), cr.duration, COALESCE(cr.completed_timestamp, 0)
                 FROM challenge_runs cr
                 JOIN realms r ON cr.realm_id = r.id
                 LEFT JOIN realm_groups g ON g.child_realm_id = cr.realm_id
                 LEFT JOIN period_seasons ps ON cr.period_id = ps.period_id
                 WHERE cr.duration IS NOT NULL AND cr.dungeon_id IS NOT NULL",
            )
            .into_app_err("query runs for ranking")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RunRow {
                    id: row.get(0)?,
                    dungeon_id: row.get(1)?,
                    season_id: row.get(2)?,
                    region: row.get(3)?,
                    pool_id: row.get(4)?,
                    signature: row.get(5)?,
                    duration: row.get(6)?,
                    completed_timestamp: row.get(7)?,
                })
            })
            .into_app_err("query runs for ranking")?;
        for row in rows {
            runs.push(row.into_app_err("scan run")?);
        }
    }

    runs.sort_by_key(|run| (run.duration, run.completed_timestamp, run.id));

    let mut boards: HashMap<BoardKey, Vec<&RunRow>> = HashMap::new();
    for run in &runs {
        let keys = [
            (run.season_id, run.dungeon_id, "global", "filtered".to_string(), None),
            (run.season_id, run.dungeon_id, "regional", format!("{}_filtered", run.region), None),
            (run.season_id, run.dungeon_id, "realm", "filtered".to_string(), Some(run.pool_id)),
        ];
        for key in keys {
            boards.entry(key).or_default().push(run);
        }
    }

    let mut stmt = tx
        .prepare(
            "INSERT INTO run_rankings (run_id, dungeon_id, ranking_type, ranking_scope, ranking, percentile_bracket, season_id, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .into_app_err("prepare run ranking insert")?;

    let mut written = 0;
    for ((season_id, dungeon_id, kind, scope, _), board) in &boards {
        let canonical = canonical_runs(board);
        let total = i64::try_from(canonical.len()).unwrap_or(i64::MAX);
        for (rank, run) in (1_i64..).zip(canonical) {
            let bracket = Bracket::from_rank(rank, total);
            let _ = stmt
                .execute(params![run.id, dungeon_id, kind, scope, rank, bracket.as_ref(), season_id, computed_at])
                .into_app_err_with(|| format!("failed ranking run {}", run.id))?;
            written += 1;
        }
    }

    log::debug!(target: LOG_TARGET, "ranked {} runs on {} boards", written, boards.len());
    Ok(written)
}

/// The first run of each team, given runs already in leaderboard order.
fn canonical_runs<'a>(board: &[&'a RunRow]) -> Vec<&'a RunRow> {
    let mut seen = HashSet::new();
    board.iter().copied().filter(|run| seen.insert(run.signature.as_str())).collect()
}

fn select_best_runs(tx: &Transaction<'_>) -> Result<usize> {
    let _ = tx
        .execute("DELETE FROM player_best_runs", [])
        .into_app_err("failed clearing player_best_runs")?;

    tx.execute(
        "INSERT INTO player_best_runs (player_id, dungeon_id, run_id, duration, season_id, completed_timestamp)
         SELECT player_id, dungeon_id, run_id, duration, season_id, completed_timestamp FROM (
             SELECT rm.player_id, cr.dungeon_id, cr.id AS run_id, cr.duration, COALESCE(ps.season_id, 1) AS season_id,
                    cr.completed_timestamp,
                    ROW_NUMBER() OVER (
                        PARTITION BY rm.player_id, cr.dungeon_id, COALESCE(ps.season_id, 1)
                        ORDER BY cr.duration ASC, cr.completed_timestamp ASC, cr.id ASC
                    ) AS best
             FROM run_members rm
             JOIN challenge_runs cr ON rm.run_id = cr.id
             LEFT JOIN period_seasons ps ON cr.period_id = ps.period_id
             WHERE cr.duration IS NOT NULL AND cr.dungeon_id IS NOT NULL
         ) WHERE best = 1",
        [],
    )
    .into_app_err("failed selecting best runs")
}

#[derive(Debug, Default)]
struct Profile {
    player_id: i64,
    season_id: i64,
    name: String,
    realm_id: i64,
    region: String,
    pool_id: i64,
    dungeons_completed: i64,
    total_runs: i64,
    best_time_sum: i64,
    main_spec_id: Option<i64>,
    global: Option<(i64, Bracket)>,
    regional: Option<(i64, Bracket)>,
    realm: Option<(i64, Bracket)>,
}

impl Profile {
    const fn has_complete_coverage(&self, dungeon_count: i64) -> bool {
        dungeon_count > 0 && self.dungeons_completed == dungeon_count
    }
}

fn build_profiles(tx: &Transaction<'_>, computed_at: i64) -> Result<(usize, usize)> {
    let _ = tx
        .execute("DELETE FROM player_profiles", [])
        .into_app_err("failed clearing player_profiles")?;

    let dungeon_count: i64 = tx
        .query_row("SELECT COUNT(*) FROM dungeons", [], |row| row.get(0))
        .into_app_err("count dungeons")?;

    let mut profiles = load_profiles(tx)?;
    count_total_runs(tx, &mut profiles)?;
    pick_main_specs(tx, &mut profiles)?;

    let ranked = {
        let mut by_season: BTreeMap<i64, Vec<&mut Profile>> = BTreeMap::new();
        for profile in profiles.values_mut().filter(|p| p.has_complete_coverage(dungeon_count)) {
            by_season.entry(profile.season_id).or_default().push(profile);
        }

        let mut ranked = 0;
        for players in by_season.values_mut() {
            players.sort_by(|a, b| (a.best_time_sum, &a.name, a.player_id).cmp(&(b.best_time_sum, &b.name, b.player_id)));
            ranked += players.len();
            rank_players(players, |_| (), |p, r| p.global = Some(r));
            rank_players(players, |p| p.region.clone(), |p, r| p.regional = Some(r));
            rank_players(players, |p| p.pool_id, |p, r| p.realm = Some(r));
        }
        ranked
    };

    let mut stmt = tx
        .prepare(
            "INSERT INTO player_profiles (player_id, season_id, name, realm_id, main_spec_id, class_name,
                                          dungeons_completed, total_runs, combined_best_time, average_best_time,
                                          global_ranking, regional_ranking, realm_ranking,
                                          global_ranking_bracket, regional_ranking_bracket, realm_ranking_bracket,
                                          has_complete_coverage, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        )
        .into_app_err("prepare profile insert")?;

    for profile in profiles.values() {
        let complete = profile.has_complete_coverage(dungeon_count);
        let class_name = profile.main_spec_id.and_then(spec_info).map(|info| info.class_name);
        let average = (profile.dungeons_completed > 0).then(|| profile.best_time_sum / profile.dungeons_completed);
        let _ = stmt
            .execute(params![
                profile.player_id,
                profile.season_id,
                profile.name,
                profile.realm_id,
                profile.main_spec_id,
                class_name,
                profile.dungeons_completed,
                profile.total_runs,
                complete.then_some(profile.best_time_sum),
                average,
                profile.global.map(|(rank, _)| rank),
                profile.regional.map(|(rank, _)| rank),
                profile.realm.map(|(rank, _)| rank),
                profile.global.map(|(_, bracket)| bracket.as_ref().to_string()),
                profile.regional.map(|(_, bracket)| bracket.as_ref().to_string()),
                profile.realm.map(|(_, bracket)| bracket.as_ref().to_string()),
                complete,
                computed_at,
            ])
            .into_app_err_with(|| format!("failed writing profile for player {}", profile.player_id))?;
    }

    Ok((profiles.len(), ranked))
}

/// Rank `players`, already in ranking order, within each group `group_of` yields.
fn rank_players<K, G, S>(players: &mut [&mut Profile], group_of: G, mut store: S)
where
    K: Eq + core::hash::Hash,
    G: Fn(&Profile) -> K,
    S: FnMut(&mut Profile, (i64, Bracket)),
{
    let mut totals: HashMap<K, i64> = HashMap::new();
    for player in players.iter() {
        *totals.entry(group_of(&**player)).or_default() += 1;
    }

    let mut next: HashMap<K, i64> = HashMap::new();
    for player in players.iter_mut() {
        let key = group_of(&**player);
        let total = totals.get(&key).copied().unwrap_or_default();
        let rank = next.entry(key).or_default();
        *rank += 1;
        let rank = *rank;
        store(&mut **player, (rank, Bracket::from_rank(rank, total)));
    }
}

fn load_profiles(tx: &Transaction<'_>) -> Result<BTreeMap<(i64, i64), Profile>> {
    let mut stmt = tx
        .prepare(
            "SELECT pbr.player_id, pbr.season_id, COALESCE(p.name, ''), p.realm_id, r.region,
                    COALESCE(g.parent_realm_id, p.realm_id), COUNT(*), SUM(pbr.duration)
             FROM player_best_runs pbr
             JOIN players p ON pbr.player_id = p.id
             JOIN realms r ON p.realm_id = r.id
             LEFT JOIN realm_groups g ON g.child_realm_id = p.realm_id
             GROUP BY pbr.player_id, pbr.season_id",
        )
        .into_app_err("query best run totals")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(Profile {
                player_id: row.get(0)?,
                season_id: row.get(1)?,
                name: row.get(2)?,
                realm_id: row.get(3)?,
                region: row.get(4)?,
                pool_id: row.get(5)?,
                dungeons_completed: row.get(6)?,
                best_time_sum: row.get(7)?,
                ..Profile::default()
            })
        })
        .into_app_err("query best run totals")?;

    let mut profiles = BTreeMap::new();
    for row in rows {
        let profile = row.into_app_err("scan best run totals")?;
        let _ = profiles.insert((profile.player_id, profile.season_id), profile);
    }
    Ok(profiles)
}

fn count_total_runs(tx: &Transaction<'_>, profiles: &mut BTreeMap<(i64, i64), Profile>) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "SELECT rm.player_id, COALESCE(ps.season_id, 1), COUNT(*)
             FROM run_members rm
             JOIN challenge_runs cr ON rm.run_id = cr.id
             LEFT JOIN period_seasons ps ON cr.period_id = ps.period_id
             GROUP BY rm.player_id, COALESCE(ps.season_id, 1)",
        )
        .into_app_err("query run counts")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)))
        .into_app_err("query run counts")?;

    for row in rows {
        let (player_id, season_id, count) = row.into_app_err("scan run count")?;
        if let Some(profile) = profiles.get_mut(&(player_id, season_id)) {
            profile.total_runs = count;
        }
    }
    Ok(())
}

/// The spec a player used most across their best runs; ties go to the lowest spec id.
fn pick_main_specs(tx: &Transaction<'_>, profiles: &mut BTreeMap<(i64, i64), Profile>) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "SELECT pbr.player_id, pbr.season_id, rm.spec_id, COUNT(*)
             FROM player_best_runs pbr
             JOIN run_members rm ON rm.run_id = pbr.run_id AND rm.player_id = pbr.player_id
             WHERE rm.spec_id IS NOT NULL
             GROUP BY pbr.player_id, pbr.season_id, rm.spec_id
             ORDER BY pbr.player_id, pbr.season_id, COUNT(*) DESC, rm.spec_id ASC",
        )
        .into_app_err("query spec usage")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)))
        .into_app_err("query spec usage")?;

    for row in rows {
        let (player_id, season_id, spec_id) = row.into_app_err("scan spec usage")?;
        if let Some(profile) = profiles.get_mut(&(player_id, season_id)) {
            let _ = profile.main_spec_id.get_or_insert(spec_id);
        }
    }
    Ok(())
}
