//! `ookstats fetch ...`: pull leaderboards, profiles, and season data from the
//! vendor API.
//!
//! Responses are persisted as JSON files for the ingest step:
//! `<out>/<region>/<realm>/<dungeon>/<period>.json` for leaderboards and
//! `<out>/profiles/<region>/<realm>/<player>.json` for profiles. Status checks
//! are written straight back to the database. Ctrl-C cancels outstanding
//! requests; whatever finished is kept.

use super::Host;
use super::common::{CommonArgs, Session, TokenArgs, regions_or_all};
use crate::Result;
use crate::blizzard::{
    CharacterEquipment, CharacterMedia, CharacterSummary, Client, FetchResult, LeaderboardResponse, PlayerTarget, ProfileResult,
    StatusResult, fetch_with_period_fallback,
};
use crate::emit::write_json_compact;
use crate::store;
use crate::wow::{DUNGEONS, DungeonInfo, REALMS, RealmInfo, Region, find_realm, safe_slug_name};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use clap::{Args, Subcommand};
use rusqlite::Connection;
use futures_util::StreamExt;
use futures_util::stream;
use ohno::app_err;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "     fetch";

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(subcommand)]
    pub command: FetchCommand,
}

#[derive(Subcommand, Debug)]
pub enum FetchCommand {
    /// Fetch leaderboards for every realm and dungeon
    Leaderboards(LeaderboardsArgs),
    /// Fetch summary, equipment, and media for stored players
    Profiles(ProfilesArgs),
    /// List the seasons known to a region
    Seasons(SeasonsArgs),
    /// Check whether stored characters still exist and record the result
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct LeaderboardsArgs {
    /// Regions to fetch (default: all)
    #[arg(long, value_name = "REGION", value_delimiter = ',', ignore_case = true)]
    pub regions: Vec<Region>,

    /// Restrict to these realm slugs
    #[arg(long, value_name = "SLUG", value_delimiter = ',')]
    pub realms: Vec<String>,

    /// Period to fetch (default: the configured primary period)
    #[arg(long, value_name = "PERIOD", conflicts_with = "fallback")]
    pub period: Option<String>,

    /// Walk the configured period list newest first and keep the first non-empty leaderboard
    #[arg(long)]
    pub fallback: bool,

    /// Directory receiving the leaderboard files
    #[arg(long, value_name = "DIR")]
    pub out: Utf8PathBuf,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// SQLite database listing the players to refresh
    #[arg(long, value_name = "PATH")]
    pub db: Utf8PathBuf,

    /// Directory receiving the `profiles/` tree
    #[arg(long, value_name = "DIR")]
    pub out: Utf8PathBuf,

    /// Fetch at most this many players
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args, Debug)]
pub struct SeasonsArgs {
    /// Region to query
    #[arg(long, value_name = "REGION", default_value = "us", ignore_case = true)]
    pub region: Region,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// SQLite database listing the players to check; results are written back to it
    #[arg(long, value_name = "PATH")]
    pub db: Utf8PathBuf,

    /// Check at most this many players
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Also fetch achievements of valid characters into this directory
    #[arg(long, value_name = "DIR")]
    pub achievements: Option<Utf8PathBuf>,

    /// Request pace for this run, replacing the configured one
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub rps: Option<u32>,

    #[command(flatten)]
    pub token: TokenArgs,
}

/// Tallies of one fetch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchTally {
    pub saved: usize,
    pub empty: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl FetchTally {
    fn summary(self) -> String {
        format!(
            "{} saved, {} empty, {} failed, {} cancelled",
            self.saved, self.empty, self.failed, self.cancelled
        )
    }
}

/// Tallies of one status pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub valid: usize,
    pub invalid: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl StatusTally {
    fn summary(self) -> String {
        format!(
            "{} valid, {} invalid, {} failed, {} cancelled",
            self.valid, self.invalid, self.failed, self.cancelled
        )
    }
}

pub async fn process_fetch<H: Host>(host: &mut H, common: &CommonArgs, args: &FetchArgs) -> Result<()> {
    let mut session = Session::new(host, common)?;

    match &args.command {
        FetchCommand::Leaderboards(args) => fetch_leaderboards(&mut session, args).await,
        FetchCommand::Profiles(args) => fetch_profiles(&mut session, args).await,
        FetchCommand::Seasons(args) => fetch_seasons(&mut session, args).await,
        FetchCommand::Status(args) => fetch_statuses(&mut session, args).await,
    }
}

/// A token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    drop(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!(target: LOG_TARGET, "interrupt received, cancelling outstanding requests");
            trigger.cancel();
        }
    }));

    cancel
}

/// Realms selected by region and optional slug filter.
fn select_realms(regions: &[Region], slugs: &[String]) -> Result<Vec<RealmInfo>> {
    let regions = regions_or_all(regions);

    if slugs.is_empty() {
        return Ok(REALMS.iter().filter(|r| regions.contains(&r.region)).copied().collect());
    }

    let mut selected = Vec::new();
    for slug in slugs {
        let matches: Vec<RealmInfo> = regions.iter().filter_map(|region| find_realm(*region, slug)).copied().collect();
        if matches.is_empty() {
            return Err(app_err!("unknown realm '{slug}'"));
        }
        selected.extend(matches);
    }

    Ok(selected)
}

fn leaderboard_path(out: &Utf8Path, realm: &RealmInfo, dungeon: &DungeonInfo, period: &str) -> Utf8PathBuf {
    out.join(realm.region.as_ref())
        .join(realm.slug)
        .join(dungeon.slug)
        .join(format!("{period}.json"))
}

async fn fetch_leaderboards<H: Host>(session: &mut Session<'_, H>, args: &LeaderboardsArgs) -> Result<()> {
    let client = session.client(&args.token)?;
    let realms = select_realms(&args.regions, &args.realms)?;
    let cancel = cancel_on_ctrl_c();

    let tally = if args.fallback {
        fetch_with_fallback(session, &client, &realms, &args.out, &cancel).await
    } else {
        let period = args.period.clone().unwrap_or_else(|| session.config.periods.primary.clone());
        session.status("Fetching", &format!("{} realms x {} dungeons, period {period}", realms.len(), DUNGEONS.len()));
        fetch_single_period(session, &client, &realms, &period, &args.out, &cancel).await
    };

    let verb = if cancel.is_cancelled() { "Cancelled" } else { "Finished" };
    session.status(verb, &tally.summary());
    session.print_fetch_stats(client.stats());
    Ok(())
}

async fn fetch_single_period<H: Host>(
    session: &Session<'_, H>,
    client: &Client,
    realms: &[RealmInfo],
    period: &str,
    out: &Utf8Path,
    cancel: &CancellationToken,
) -> FetchTally {
    let progress = session.progress("Fetching", realms.len() * DUNGEONS.len());
    let mut rx = client.fetch_all_realms(realms, DUNGEONS, period, cancel);
    let mut tally = FetchTally::default();

    while let Some(result) = rx.recv().await {
        progress.advance(format!("{}/{}", result.realm.slug, result.dungeon.slug));
        record_leaderboard(&mut tally, out, result);
    }

    progress.done();
    tally
}

fn record_leaderboard(tally: &mut FetchTally, out: &Utf8Path, result: FetchResult) {
    let empty = result.is_empty_observation();
    let FetchResult {
        realm,
        dungeon,
        period,
        outcome,
    } = result;

    match outcome {
        _ if empty => tally.empty += 1,
        Ok(leaderboard) => save_leaderboard(tally, &leaderboard_path(out, &realm, &dungeon, &period), &leaderboard),
        Err(e) if e.is_cancelled() => tally.cancelled += 1,
        Err(e) => {
            log::warn!(target: LOG_TARGET, "{}/{}/{} period {period}: {e}", realm.region, realm.slug, dungeon.slug);
            tally.failed += 1;
        }
    }
}

fn save_leaderboard(tally: &mut FetchTally, path: &Utf8Path, leaderboard: &LeaderboardResponse) {
    match write_json_compact(path, leaderboard) {
        Ok(()) => tally.saved += 1,
        Err(e) => {
            log::warn!(target: LOG_TARGET, "could not save '{path}': {e}");
            tally.failed += 1;
        }
    }
}

async fn fetch_with_fallback<H: Host>(
    session: &mut Session<'_, H>,
    client: &Client,
    realms: &[RealmInfo],
    out: &Utf8Path,
    cancel: &CancellationToken,
) -> FetchTally {
    let pairs: Vec<(RealmInfo, DungeonInfo)> = realms.iter().flat_map(|realm| DUNGEONS.iter().map(|dungeon| (*realm, *dungeon))).collect();
    session.status("Fetching", &format!("{} realm/dungeon pairs with period fallback", pairs.len()));

    let plan = session.config.periods.clone();
    let width = session.config.fetch.concurrency.max(1);
    let progress = session.progress("Fetching", pairs.len());
    let mut tally = FetchTally::default();

    let mut results = stream::iter(pairs)
        .map(|(realm, dungeon)| {
            let periods = plan.for_region(realm.region).to_vec();
            async move {
                let outcome = fetch_with_period_fallback(client, &realm, &dungeon, &periods, cancel).await;
                (realm, dungeon, outcome)
            }
        })
        .buffer_unordered(width);

    while let Some((realm, dungeon, outcome)) = results.next().await {
        progress.advance(format!("{}/{}", realm.slug, dungeon.slug));
        match outcome {
            Ok(Some((period, leaderboard))) => save_leaderboard(&mut tally, &leaderboard_path(out, &realm, &dungeon, &period), &leaderboard),
            Ok(None) => tally.empty += 1,
            Err(e) if e.is_cancelled() => tally.cancelled += 1,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "{}/{}/{}: {e}", realm.region, realm.slug, dungeon.slug);
                tally.failed += 1;
            }
        }
    }

    progress.done();
    tally
}

/// What gets written for one profile fetch.
#[derive(Debug, Serialize)]
struct ProfileDocument<'a> {
    player_id: i64,
    name: &'a str,
    realm_slug: &'a str,
    region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a CharacterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    equipment: Option<&'a CharacterEquipment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<&'a CharacterMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ProfileDocument<'a> {
    fn new(result: &'a ProfileResult) -> Self {
        Self {
            player_id: result.player.id,
            name: &result.player.name,
            realm_slug: &result.player.realm_slug,
            region: result.player.region,
            summary: result.summary.as_ref(),
            equipment: result.equipment.as_ref(),
            media: result.media.as_ref(),
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

/// `<root>/<region>/<realm>/<player>.json`
fn player_path(root: &Utf8Path, player: &PlayerTarget) -> Utf8PathBuf {
    root.join(player.region.as_ref())
        .join(&player.realm_slug)
        .join(format!("{}.json", safe_slug_name(&player.name)))
}

fn profile_path(out: &Utf8Path, player: &PlayerTarget) -> Utf8PathBuf {
    player_path(&out.join("profiles"), player)
}

/// Stored players as profile targets; rows with an unknown region are skipped.
fn profile_targets(db: &Utf8Path, limit: Option<usize>) -> Result<Vec<PlayerTarget>> {
    let conn = store::open(db)?;
    let refs = store::load_player_refs(&conn, limit)?;

    Ok(refs
        .into_iter()
        .filter_map(|player| match player.region.parse::<Region>() {
            Ok(region) => Some(PlayerTarget {
                id: player.id,
                name: player.name,
                realm_slug: player.realm_slug,
                region,
            }),
            Err(_) => {
                log::warn!(target: LOG_TARGET, "skipping {} (unknown region '{}')", player.name, player.region);
                None
            }
        })
        .collect())
}

async fn fetch_profiles<H: Host>(session: &mut Session<'_, H>, args: &ProfilesArgs) -> Result<()> {
    let client = session.client(&args.token)?;
    let players = profile_targets(&args.db, args.limit)?;
    let cancel = cancel_on_ctrl_c();

    session.status("Fetching", &format!("profiles for {} players", players.len()));
    let progress = session.progress("Profiles", players.len());
    let mut rx = client.fetch_player_profiles(players, &cancel);
    let mut tally = FetchTally::default();

    while let Some(result) = rx.recv().await {
        progress.advance(result.player.name.clone());

        if result.is_empty() {
            match &result.error {
                Some(e) if e.is_cancelled() => tally.cancelled += 1,
                Some(e) => {
                    log::warn!(target: LOG_TARGET, "{}-{}: {e}", result.player.name, result.player.realm_slug);
                    tally.failed += 1;
                }
                None => tally.failed += 1,
            }
            continue;
        }

        let path = profile_path(&args.out, &result.player);
        match write_json_compact(&path, &ProfileDocument::new(&result)) {
            Ok(()) => tally.saved += 1,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "could not save '{path}': {e}");
                tally.failed += 1;
            }
        }
    }

    progress.done();

    let verb = if cancel.is_cancelled() { "Cancelled" } else { "Finished" };
    session.status(verb, &tally.summary());
    session.print_fetch_stats(client.stats());
    Ok(())
}

async fn fetch_seasons<H: Host>(session: &mut Session<'_, H>, args: &SeasonsArgs) -> Result<()> {
    let client = session.client(&args.token)?;
    let cancel = cancel_on_ctrl_c();

    let index = client.fetch_season_index(args.region, &cancel).await?;
    session.status("Current", &format!("season {} in {}", index.current_season.id, args.region));

    for season in &index.seasons {
        let detail = client.fetch_season_detail(args.region, season.id, &cancel).await?;
        let first = detail.periods.first().map(|p| p.id);
        let last = detail.periods.last().map(|p| p.id);
        let periods = match (first, last) {
            (Some(first), Some(last)) => format!("periods {first}-{last}"),
            _ => "no periods".to_string(),
        };
        let end = detail.end_timestamp.map_or_else(|| "ongoing".to_string(), |end| end.to_string());

        session.status(
            "Season",
            &format!("{} {:?} start {} end {end}, {periods}", detail.id, detail.season_name, detail.start_timestamp),
        );
    }

    session.print_fetch_stats(client.stats());
    Ok(())
}

async fn fetch_statuses<H: Host>(session: &mut Session<'_, H>, args: &StatusArgs) -> Result<()> {
    let client = session.client(&args.token)?;
    if let Some(rps) = args.rps {
        client.set_request_rate(rps).await;
    }

    let players = profile_targets(&args.db, args.limit)?;
    let conn = store::open(&args.db)?;
    let cancel = cancel_on_ctrl_c();

    session.status("Checking", &format!("status of {} players", players.len()));
    let progress = session.progress("Status", players.len());
    let mut rx = client.fetch_player_statuses(players, args.achievements.is_some(), &cancel);
    let checked_at = Utc::now().timestamp_millis();
    let mut tally = StatusTally::default();

    while let Some(result) = rx.recv().await {
        progress.advance(result.player.name.clone());
        record_status(&conn, &mut tally, args.achievements.as_deref(), checked_at, &result);
    }

    progress.done();

    let verb = if cancel.is_cancelled() { "Cancelled" } else { "Finished" };
    session.status(verb, &tally.summary());
    session.print_fetch_stats(client.stats());
    Ok(())
}

fn record_status(conn: &Connection, tally: &mut StatusTally, achievements_dir: Option<&Utf8Path>, checked_at: i64, result: &StatusResult) {
    let player = &result.player;
    let invalid = result.is_invalid();

    match &result.status {
        Err(e) if e.is_cancelled() => {
            tally.cancelled += 1;
            return;
        }
        Err(e) if !invalid => {
            log::warn!(target: LOG_TARGET, "status of {}-{}: {e}", player.name, player.realm_slug);
            tally.failed += 1;
            return;
        }
        _ => {}
    }

    let character_id = result.status.as_ref().ok().map(|s| s.character.id).filter(|id| *id > 0);
    if let Err(e) = store::record_player_status(conn, player.id, !invalid, checked_at, character_id) {
        log::warn!(target: LOG_TARGET, "could not record status of {}-{}: {e}", player.name, player.realm_slug);
        tally.failed += 1;
        return;
    }

    if invalid {
        log::info!(target: LOG_TARGET, "{}-{} ({}) no longer exists", player.name, player.realm_slug, player.region);
        tally.invalid += 1;
    } else {
        tally.valid += 1;
    }

    match (achievements_dir, &result.achievements) {
        (Some(dir), Some(Ok(achievements))) => {
            let path = player_path(dir, player);
            if let Err(e) = write_json_compact(&path, achievements) {
                log::warn!(target: LOG_TARGET, "could not save '{path}': {e}");
            }
        }
        (_, Some(Err(e))) => log::warn!(target: LOG_TARGET, "achievements of {}-{}: {e}", player.name, player.realm_slug),
        _ => {}
    }
}
