//! Command dispatch logic for ookstats

use super::common::CommonArgs;
use super::{
    FetchArgs, GenerateArgs, MergeArgs, ProcessArgs, RealmsArgs, process_fetch, process_generate, process_merge, process_process,
    process_realms,
};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "ookstats", version, author, long_about = None)]
#[command(about = "Harvest Mythic Keystone leaderboards and publish them as a static JSON API")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: OokstatsSubcommand,
}

#[derive(Subcommand, Debug)]
enum OokstatsSubcommand {
    /// Pull data from the vendor API
    Fetch(FetchArgs),
    /// Derive rankings and profiles from stored runs
    Process(ProcessArgs),
    /// Emit static documents from the database
    Generate(GenerateArgs),
    /// Maintain realm and dungeon reference data
    Realms(RealmsArgs),
    /// Inspect player merge files
    Merge(MergeArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        OokstatsSubcommand::Fetch(args) => process_fetch(host, &cli.common, args).await,
        OokstatsSubcommand::Process(args) => process_process(host, &cli.common, args),
        OokstatsSubcommand::Generate(args) => process_generate(host, &cli.common, args),
        OokstatsSubcommand::Realms(args) => process_realms(host, &cli.common, args),
        OokstatsSubcommand::Merge(args) => process_merge(host, &cli.common, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ookstats", "realms", "sync", "--db", "x.db", "--log-level", "debug", "--color", "never"]).unwrap();
        assert_eq!(cli.common.log_level, super::super::common::LogLevel::Debug);
        assert!(matches!(cli.command, OokstatsSubcommand::Realms(_)));
    }

    #[test]
    fn test_fetch_leaderboards_flags() {
        let cli = Cli::try_parse_from([
            "ookstats",
            "fetch",
            "leaderboards",
            "--regions",
            "us,eu",
            "--realms",
            "pagle",
            "--fallback",
            "--out",
            "raw",
        ])
        .unwrap();

        let OokstatsSubcommand::Fetch(FetchArgs {
            command: super::super::fetch::FetchCommand::Leaderboards(args),
        }) = cli.command
        else {
            panic!("expected fetch leaderboards");
        };
        assert_eq!(args.regions.len(), 2);
        assert!(args.fallback);
        assert!(args.period.is_none());
    }

    #[test]
    fn test_period_conflicts_with_fallback() {
        let result = Cli::try_parse_from(["ookstats", "fetch", "leaderboards", "--period", "1030", "--fallback", "--out", "raw"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_region_names_ignore_case() {
        let cli = Cli::try_parse_from(["ookstats", "fetch", "seasons", "--region", "EU"]).unwrap();
        let OokstatsSubcommand::Fetch(FetchArgs {
            command: super::super::fetch::FetchCommand::Seasons(args),
        }) = cli.command
        else {
            panic!("expected fetch seasons");
        };
        assert_eq!(args.region, crate::wow::Region::Eu);

        assert!(Cli::try_parse_from(["ookstats", "fetch", "seasons", "--region", "cn"]).is_err());
    }

    #[test]
    fn test_fetch_status_flags() {
        let cli = Cli::try_parse_from(["ookstats", "fetch", "status", "--db", "x.db", "--achievements", "ach", "--rps", "20"]).unwrap();
        let OokstatsSubcommand::Fetch(FetchArgs {
            command: super::super::fetch::FetchCommand::Status(args),
        }) = cli.command
        else {
            panic!("expected fetch status");
        };
        assert_eq!(args.rps, Some(20));
        assert_eq!(args.achievements.as_deref().map(camino::Utf8Path::as_str), Some("ach"));

        assert!(Cli::try_parse_from(["ookstats", "fetch", "status", "--db", "x.db", "--rps", "0"]).is_err());
    }

    #[test]
    fn test_process_rankings_needs_db() {
        let cli = Cli::try_parse_from(["ookstats", "process", "rankings", "--db", "x.db"]).unwrap();
        assert!(matches!(cli.command, OokstatsSubcommand::Process(_)));
        assert!(Cli::try_parse_from(["ookstats", "process", "rankings"]).is_err());
    }

    #[tokio::test]
    async fn test_fetch_with_blank_token_exits_1() {
        let mut host = TestHost::new();

        let result = run(&mut host, ["ookstats", "fetch", "seasons", "--region", "us", "--token", " "]).await;
        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
        assert_eq!(host.error_text(), "Error: BLIZZARD_API_TOKEN environment variable is required\n");
    }
}
