use super::Host;
use super::common::{CommonArgs, Session, regions_or_all};
use crate::Result;
use crate::emit::{DEFAULT_PAGE_SIZE, EmitStats, emit_indexes, emit_leaderboards, emit_player_leaderboards, emit_player_profiles};
use crate::store;
use crate::wow::Region;
use camino::Utf8PathBuf;
use clap::{Args, Subcommand};
use ohno::EnrichableExt;
use std::time::Instant;

const LOG_TARGET: &str = "  generate";

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(subcommand)]
    pub command: GenerateCommand,
}

#[derive(Subcommand, Debug)]
pub enum GenerateCommand {
    /// Write the static JSON API from the database
    Api(ApiArgs),
}

#[derive(Args, Debug)]
pub struct ApiArgs {
    /// SQLite database to read
    #[arg(long, value_name = "PATH")]
    pub db: Utf8PathBuf,

    /// Site root; documents land below `<DIR>/api`
    #[arg(long, value_name = "DIR")]
    pub out: Utf8PathBuf,

    /// Runs or players per leaderboard page
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Regions to generate leaderboards for (default: all)
    #[arg(long, value_name = "REGION", value_delimiter = ',', ignore_case = true)]
    pub regions: Vec<Region>,

    /// Skip player profile documents
    #[arg(long)]
    pub no_players: bool,

    /// Skip dungeon and player leaderboard pages
    #[arg(long)]
    pub no_leaderboards: bool,
}

pub fn process_generate<H: Host>(host: &mut H, common: &CommonArgs, args: &GenerateArgs) -> Result<()> {
    let mut session = Session::new(host, common)?;

    match &args.command {
        GenerateCommand::Api(args) => generate_api(&mut session, args),
    }
}

fn generate_api<H: Host>(session: &mut Session<'_, H>, args: &ApiArgs) -> Result<()> {
    let started = Instant::now();
    let mut conn = store::open(&args.db)?;
    store::ensure_schema(&conn)?;

    let aliases = session.config.realm_aliases();
    let groups = store::sync_realm_groups(&mut conn, &aliases)?;
    log::debug!(target: LOG_TARGET, "synced {groups} realm groups");

    let api = args.out.join("api");
    let mut stats = EmitStats::default();

    session.status("Generating", &format!("indexes in {api}"));
    stats.merge(emit_indexes(&conn, &api, &aliases).map_err(|e| e.enrich("generating indexes"))?);

    if !args.no_leaderboards {
        session.status("Generating", "leaderboard pages");
        let emitted = emit_leaderboards(&conn, &api, &regions_or_all(&args.regions), &aliases, args.page_size)
            .map_err(|e| e.enrich("generating leaderboard pages"))?;
        stats.merge(emitted);

        session.status("Generating", "player leaderboard pages");
        let emitted = emit_player_leaderboards(&conn, &api, &regions_or_all(&args.regions), args.page_size)
            .map_err(|e| e.enrich("generating player leaderboard pages"))?;
        stats.merge(emitted);
    }

    if !args.no_players {
        session.status("Generating", "player profiles");
        stats.merge(emit_player_profiles(&conn, &api).map_err(|e| e.enrich("generating player profiles"))?);
    }

    session.status(
        "Finished",
        &format!("{} documents written, {} failed in {:.1}s", stats.written, stats.failed, started.elapsed().as_secs_f64()),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use crate::commands::run;
    use crate::store::test_support::FIXTURE;

    fn seeded_file(dir: &tempfile::TempDir) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("ookstats.db")).unwrap();
        let conn = store::open(&path).unwrap();
        store::ensure_schema(&conn).unwrap();
        conn.execute_batch(FIXTURE).unwrap();
        path
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    async fn test_generate_api_tree() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_file(&dir);
        let out = Utf8PathBuf::from_path_buf(dir.path().join("site")).unwrap();

        let mut host = TestHost::new();
        run(&mut host, ["ookstats", "generate", "api", "--db", db.as_str(), "--out", out.as_str(), "--regions", "us,eu", "--color", "never"])
            .await
            .unwrap();

        let api = out.join("api");
        assert!(api.join("index.json").exists());
        assert!(api.join("leaderboard/season/index.json").exists());
        assert!(api.join("leaderboard/season/2/global/scholomance/1.json").exists());
        assert!(api.join("player/us/pagle/ook.json").exists());
        assert!(api.join("leaderboard/season/2/players/global/1.json").exists());
        assert!(api.join("leaderboard/season/1/players/regional/eu/1.json").exists());
        assert!(!api.join("leaderboard/season/2/kr").exists());

        let output = host.output_text();
        assert!(output.contains("Finished"), "{output}");
        assert!(output.contains("0 failed"), "{output}");
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    async fn test_generate_without_players_or_leaderboards() {
        let dir = tempfile::tempdir().unwrap();
        let db = seeded_file(&dir);
        let out = Utf8PathBuf::from_path_buf(dir.path().join("site")).unwrap();

        let mut host = TestHost::new();
        run(
            &mut host,
            ["ookstats", "generate", "api", "--db", db.as_str(), "--out", out.as_str(), "--no-players", "--no-leaderboards"],
        )
        .await
        .unwrap();

        let api = out.join("api");
        assert!(api.join("leaderboard/season/2/index.json").exists());
        assert!(!api.join("player").exists());
        assert!(!api.join("leaderboard/season/2/global/scholomance").exists());
        assert!(!api.join("leaderboard/season/2/players/global").exists());
    }
}
