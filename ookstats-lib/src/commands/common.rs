//! Flags, logging, and console helpers shared by every subcommand.

use super::Host;
use super::config::Config;
use super::progress_reporter::ProgressReporter;
use crate::Result;
use crate::blizzard::{Client, MetricsSnapshot};
use crate::wow::Region;
use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use ohno::app_err;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write, stderr, stdout};

/// Message printed when a fetch command starts without credentials.
pub const MISSING_TOKEN: &str = "BLIZZARD_API_TOKEN environment variable is required";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments accepted by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file (default is `ookstats.toml` if present)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Arguments for commands that call the vendor API
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// OAuth bearer token for the vendor API
    #[arg(long, value_name = "TOKEN", env = "BLIZZARD_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Send requests to this base URL instead of the regional vendor hosts
    #[arg(long, value_name = "URL", hide = true)]
    pub api_base: Option<String>,
}

/// Per-invocation state: loaded configuration plus console settings.
#[derive(Debug)]
pub struct Session<'a, H: Host> {
    pub config: Config,
    pub host: &'a mut H,
    use_colors: bool,
    show_progress: bool,
}

impl<'a, H: Host> Session<'a, H> {
    /// Initialize logging and load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded
    pub fn new(host: &'a mut H, args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);
        let config = Config::load(args.config.as_deref())?;

        Ok(Self {
            config,
            host,
            use_colors: use_colors(args.color, stdout().is_terminal()),
            show_progress: args.log_level == LogLevel::None && stderr().is_terminal(),
        })
    }

    /// Build an API client, or report the missing token and exit with status 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is absent or the client cannot be built
    pub fn client(&mut self, args: &TokenArgs) -> Result<Client> {
        let Some(token) = args.token.as_deref().filter(|t| !t.trim().is_empty()) else {
            let _ = writeln!(self.host.error(), "Error: {MISSING_TOKEN}");
            self.host.exit(1);
            return Err(app_err!("{MISSING_TOKEN}"));
        };

        let mut options = self.config.client_options();
        options.api_base.clone_from(&args.api_base);
        Client::new(token, &options)
    }

    #[must_use]
    pub fn progress(&self, phase: &str, total: usize) -> ProgressReporter {
        ProgressReporter::new(phase, total as u64, self.show_progress, self.use_colors)
    }

    /// Print a cargo-style status line: a right-aligned verb and a message.
    pub fn status(&mut self, verb: &str, message: &str) {
        if self.use_colors {
            let _ = writeln!(self.host.output(), "{:>12} {message}", verb.green().bold());
        } else {
            let _ = writeln!(self.host.output(), "{verb:>12} {message}");
        }
    }

    /// Print the request counters of a finished fetch.
    pub fn print_fetch_stats(&mut self, stats: MetricsSnapshot) {
        self.status("Requests", &stats.to_string());
    }
}

/// Initialize logger based on log level
///
/// `RUST_LOG` takes precedence over the flag. Calling this twice is harmless.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

#[must_use]
pub const fn use_colors(mode: ColorMode, is_terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_terminal,
    }
}

/// Parse the `--regions` list, defaulting to every region.
#[must_use]
pub fn regions_or_all(regions: &[Region]) -> Vec<Region> {
    if regions.is_empty() { Region::all().collect() } else { regions.to_vec() }
}
