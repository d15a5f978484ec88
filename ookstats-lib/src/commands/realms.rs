use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::store;
use crate::wow::{DUNGEONS, REALMS};
use camino::Utf8PathBuf;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct RealmsArgs {
    #[command(subcommand)]
    pub command: RealmsCommand,
}

#[derive(Subcommand, Debug)]
pub enum RealmsCommand {
    /// Seed realms and dungeons, then rebuild merged-realm groups
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// SQLite database to update (created if missing)
    #[arg(long, value_name = "PATH")]
    pub db: Utf8PathBuf,
}

pub fn process_realms<H: Host>(host: &mut H, common: &CommonArgs, args: &RealmsArgs) -> Result<()> {
    let mut session = Session::new(host, common)?;

    match &args.command {
        RealmsCommand::Sync(args) => sync(&mut session, args),
    }
}

fn sync<H: Host>(session: &mut Session<'_, H>, args: &SyncArgs) -> Result<()> {
    let mut conn = store::open(&args.db)?;
    store::ensure_schema(&conn)?;

    let (realms, dungeons) = store::seed_reference_data(&mut conn, REALMS, DUNGEONS)?;
    session.status("Seeded", &format!("{realms} new realms, {dungeons} new dungeons"));

    let groups = store::sync_realm_groups(&mut conn, &session.config.realm_aliases())?;
    session.status("Synced", &format!("{groups} merged realm groups"));
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
    async fn test_sync_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = Utf8PathBuf::from_path_buf(dir.path().join("ookstats.db")).unwrap();

        let mut host = TestHost::new();
        run(&mut host, ["ookstats", "realms", "sync", "--db", db.as_str()]).await.unwrap();
        let first = host.output_text();
        assert!(first.contains(&format!("{} new realms", crate::wow::REALMS.len())), "{first}");

        let mut host = TestHost::new();
        run(&mut host, ["ookstats", "realms", "sync", "--db", db.as_str()]).await.unwrap();
        assert!(host.output_text().contains("0 new realms, 0 new dungeons"));

        let conn = store::open(&db).unwrap();
        let groups: i64 = conn.query_row("SELECT COUNT(*) FROM realm_groups", [], |row| row.get(0)).unwrap();
        assert!(groups > 0);
    }
}
