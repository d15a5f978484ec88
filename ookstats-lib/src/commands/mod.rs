//! Command-line interface and orchestration for ookstats
//!
//! This module wires the vendor client, the store, and the document emitters
//! into the subcommands users run. It handles argument parsing, configuration
//! loading, console output, and the high-level workflows.
//!
//! # Commands
//!
//! - **fetch**: Pull leaderboards, player profiles, or season metadata from the
//!   vendor API and save the raw JSON under an output directory
//! - **generate**: Read the database and write the static JSON API tree
//! - **process**: Rebuild rankings, best runs, and player profiles from stored runs
//! - **realms**: Seed realm and dungeon reference rows and rebuild merged-realm groups
//! - **merge**: Load a player merge file and report how each entry resolves
//!
//! The `run` function parses the arguments with clap and routes to the
//! matching handler. Every handler opens a `Session`, which initializes logging,
//! loads the TOML configuration, and owns the console conventions shared by all
//! commands.

mod common;
mod config;
mod fetch;
mod generate;
mod host;
mod merge;
mod process;
mod progress_reporter;
mod realms;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use fetch::{FetchArgs, process_fetch};
pub use generate::{GenerateArgs, process_generate};
pub use host::Host;
pub use merge::{MergeArgs, process_merge};
pub use process::{ProcessArgs, process_process};
pub use progress_reporter::ProgressReporter;
pub use realms::{RealmsArgs, process_realms};
pub use run::run;
