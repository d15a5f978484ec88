#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for ookstats
//!
//! This library holds all functionality for the ookstats tool, which harvests
//! Mythic Keystone leaderboards from the vendor API into SQLite and publishes
//! them as a tree of static JSON documents.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`wow`]: Regions, realms, dungeons, specializations, and other game tables
//! - [`blizzard`]: Rate-limited vendor API client and fetch orchestration
//! - [`store`]: SQLite schema, ingestion, and queries
//! - [`emit`]: Static JSON document generation
//! - [`merge`]: Player merge configuration

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod blizzard;
#[cfg(not(any(debug_assertions, test)))]
mod blizzard;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod emit;
#[cfg(not(any(debug_assertions, test)))]
mod emit;

#[cfg(any(debug_assertions, test))]
pub mod merge;
#[cfg(not(any(debug_assertions, test)))]
mod merge;

#[cfg(any(debug_assertions, test))]
pub mod store;
#[cfg(not(any(debug_assertions, test)))]
mod store;

#[cfg(any(debug_assertions, test))]
pub mod wow;
#[cfg(not(any(debug_assertions, test)))]
mod wow;

pub use crate::commands::{Host, run};
