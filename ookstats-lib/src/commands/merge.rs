use super::Host;
use super::common::{CommonArgs, Session};
use crate::Result;
use crate::merge::{MergeConfig, MergeStatus, check_merges};
use crate::store;
use camino::Utf8PathBuf;
use clap::{Args, Subcommand};
use ohno::app_err;

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[command(subcommand)]
    pub command: MergeCommand,
}

#[derive(Subcommand, Debug)]
pub enum MergeCommand {
    /// Load a merge file and report how each entry resolves
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Merge file (`{"merges": [{"from": {...}, "to": {...}}]}`)
    #[arg(long = "file", value_name = "PATH")]
    pub file: Utf8PathBuf,

    /// Resolve every identity against this database
    #[arg(long, value_name = "PATH")]
    pub db: Option<Utf8PathBuf>,
}

pub fn process_merge<H: Host>(host: &mut H, common: &CommonArgs, args: &MergeArgs) -> Result<()> {
    let mut session = Session::new(host, common)?;

    match &args.command {
        MergeCommand::Check(args) => check(&mut session, args),
    }
}

fn check<H: Host>(session: &mut Session<'_, H>, args: &CheckArgs) -> Result<()> {
    let config = MergeConfig::load(&args.file)?;
    session.status("Loaded", &format!("{} merge entries from {}", config.merges.len(), args.file));

    let Some(db) = &args.db else {
        for entry in &config.merges {
            session.status("Merge", &format!("{} -> {}", entry.from, entry.to));
        }
        return Ok(());
    };

    let conn = store::open(db)?;
    let statuses = check_merges(&conn, &config)?;

    let mut unresolved = 0;
    for (entry, status) in config.merges.iter().zip(statuses) {
        let line = match status {
            MergeStatus::Ready { from_id, to_id } => format!("{} ({from_id}) -> {} ({to_id})", entry.from, entry.to),
            MergeStatus::SamePlayer(id) => format!("{} and {} are the same player ({id}), skipped", entry.from, entry.to),
            MergeStatus::MissingSource => {
                unresolved += 1;
                format!("source player {} not found", entry.from)
            }
            MergeStatus::MissingTarget => {
                unresolved += 1;
                format!("target player {} not found", entry.to)
            }
        };
        session.status("Merge", &line);
    }

    if unresolved > 0 {
        return Err(app_err!("{unresolved} merge entries could not be resolved"));
    }

    Ok(())
}
