use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::store;
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[command(subcommand)]
    pub command: ProcessCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProcessCommand {
    /// Rebuild run rankings, player best runs, and player profiles
    Rankings(RankingsArgs),
}

#[derive(Args, Debug)]
pub struct RankingsArgs {
    /// SQLite database to update
    #[arg(long, value_name = "PATH")]
    pub db: Utf8PathBuf,
}

pub fn process_process<H: Host>(host: &mut H, common: &CommonArgs, args: &ProcessArgs) -> Result<()> {
    let mut session = Session::new(host, common)?;

    match &args.command {
        ProcessCommand::Rankings(args) => rankings(&mut session, args),
    }
}

fn rankings<H: Host>(session: &mut Session<'_, H>, args: &RankingsArgs) -> Result<()> {
    let mut conn = store::open(&args.db)?;
    store::ensure_schema(&conn)?;

    let stats = store::compute_rankings(&mut conn, Utc::now().timestamp_millis())?;
    if stats.signatures > 0 {
        session.status("Signed", &format!("{} runs", stats.signatures));
    }
    session.status("Ranked", &format!("{} run rankings, {} best runs", stats.run_rankings, stats.best_runs));
    session.status(
        "Profiled",
        &format!("{} player seasons, {} with complete coverage", stats.profiles, stats.ranked_players),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::commands::host::TestHost;
    use crate::commands::run;
    use crate::store;
    use camino::Utf8PathBuf;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    async fn test_rankings_on_synced_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Utf8PathBuf::from_path_buf(dir.path().join("ookstats.db")).unwrap();

        let mut host = TestHost::new();
        run(&mut host, ["ookstats", "realms", "sync", "--db", db.as_str()]).await.unwrap();

        {
            let conn = store::open(&db).unwrap();
            conn.execute_batch(
                "INSERT INTO players (id, name, name_lower, realm_id)
                     SELECT 1, 'Ook', 'ook', id FROM realms WHERE region = 'us' AND slug = 'pagle';
                 INSERT INTO challenge_runs (id, duration, completed_timestamp, dungeon_id, realm_id, period_id)
                     SELECT 10, 1500000, 100, d.id, p.realm_id, 1034 FROM dungeons d, players p WHERE d.slug = 'scholomance';
                 INSERT INTO run_members (run_id, player_id, spec_id) VALUES (10, 1, 269);",
            )
            .unwrap();
        }

        let mut host = TestHost::new();
        run(&mut host, ["ookstats", "process", "rankings", "--db", db.as_str()]).await.unwrap();

        let output = host.output_text();
        assert!(output.contains("Signed 1 runs"), "{output}");
        assert!(output.contains("3 run rankings, 1 best runs"), "{output}");
        assert!(output.contains("1 player seasons, 0 with complete coverage"), "{output}");

        let conn = store::open(&db).unwrap();
        let bracket: String = conn
            .query_row(
                "SELECT percentile_bracket FROM run_rankings WHERE run_id = 10 AND ranking_type = 'global'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(bracket, "artifact");
    }
}
