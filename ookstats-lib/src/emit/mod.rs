//! Static JSON API emission.
//!
//! Everything is written below a single `api/` root. Index documents share a
//! `{data, metadata}` envelope; leaderboard and player pages have their own
//! shapes. A failed write is logged and counted, and emission moves on to the
//! next document.

mod indexes;
mod leaderboards;
mod player_leaderboards;
mod players;
mod writer;

pub use indexes::emit_indexes;
pub use leaderboards::{DEFAULT_PAGE_SIZE, LeaderboardPage, Pagination, emit_leaderboards, page_count};
pub use player_leaderboards::emit_player_leaderboards;
pub use players::{PROFILE_WORKERS, PlayerDocument, ProfileData, build_player_document, emit_player_profiles};
pub use writer::{write_json_compact, write_json_pretty};

use camino::Utf8Path;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

const LOG_TARGET: &str = "      emit";

/// Documents written and documents that failed during one emission pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub written: usize,
    pub failed: usize,
}

impl EmitStats {
    pub fn merge(&mut self, other: Self) {
        self.written += other.written;
        self.failed += other.failed;
    }

    fn record(&mut self, path: &Utf8Path, result: crate::Result<()>) {
        match result {
            Ok(()) => self.written += 1,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "could not write '{path}': {e}");
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Link {
    href: String,
}

impl Link {
    fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Metadata {
    total_count: usize,
    last_updated: String,
}

#[derive(Debug, Serialize)]
struct Index<T> {
    data: Vec<T>,
    metadata: Metadata,
}

/// Pretty-writes documents and tallies the outcome, stamping every index with
/// the same `last_updated` instant.
#[derive(Debug)]
struct DocumentSink {
    stats: EmitStats,
    last_updated: String,
}

impl DocumentSink {
    fn new() -> Self {
        Self {
            stats: EmitStats::default(),
            last_updated: now_rfc3339(),
        }
    }

    fn metadata(&self, total_count: usize) -> Metadata {
        Metadata {
            total_count,
            last_updated: self.last_updated.clone(),
        }
    }

    fn write<T: Serialize>(&mut self, path: &Utf8Path, doc: &T) {
        self.stats.record(path, write_json_pretty(path, doc));
    }

    fn index<T: Serialize>(&mut self, path: &Utf8Path, data: Vec<T>) {
        let doc = Index {
            metadata: self.metadata(data.len()),
            data,
        };
        self.write(path, &doc);
    }
}

/// The current UTC instant as RFC 3339 with second precision.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The season-scoped site path segment, `leaderboard/season/<sid>`.
fn season_path(api: &Utf8Path, season: i64) -> camino::Utf8PathBuf {
    api.join("leaderboard").join("season").join(season.to_string())
}
