//! Player merge configuration.
//!
//! A merge file maps a stale player identity onto the identity that replaces
//! it, for example after a character rename or realm transfer. Applying merges
//! is done by a separate tool; this module loads the file and resolves each
//! identity against the store so a file can be checked before it is used.

use crate::Result;
use camino::Utf8Path;
use ohno::{IntoAppError, app_err};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fs;

/// A player as written in a merge file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub name: String,
    pub realm: String,
    pub region: String,
}

impl core::fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{} ({})", self.name, self.realm, self.region)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeEntry {
    pub from: PlayerIdentity,
    pub to: PlayerIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub merges: Vec<MergeEntry>,
}

impl MergeConfig {
    /// Read and parse a merge file. A file without entries is rejected.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("read config file '{path}'"))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).into_app_err("parse config")?;
        if config.merges.is_empty() {
            return Err(app_err!("config contains no merge entries"));
        }

        Ok(config)
    }
}

/// How one merge entry resolves against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Both players exist and are distinct.
    Ready { from_id: i64, to_id: i64 },
    /// Both identities name the same stored player.
    SamePlayer(i64),
    MissingSource,
    MissingTarget,
}

/// Stored id of a player, matched case-insensitively on name and realm slug.
pub fn find_player_id(conn: &Connection, who: &PlayerIdentity) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT p.id FROM players p
         JOIN realms r ON p.realm_id = r.id
         WHERE p.name_lower = lower(?1) AND r.slug = lower(?2) AND r.region = lower(?3)",
        [who.name.trim(), who.realm.trim(), who.region.trim()],
        |row| row.get(0),
    )
    .optional()
    .into_app_err_with(|| format!("look up player {who}"))
}

/// Resolve every entry of `config`, in file order.
pub fn check_merges(conn: &Connection, config: &MergeConfig) -> Result<Vec<MergeStatus>> {
    config
        .merges
        .iter()
        .map(|entry| {
            let Some(from_id) = find_player_id(conn, &entry.from)? else {
                return Ok(MergeStatus::MissingSource);
            };
            let Some(to_id) = find_player_id(conn, &entry.to)? else {
                return Ok(MergeStatus::MissingTarget);
            };

            Ok(if from_id == to_id {
                MergeStatus::SamePlayer(from_id)
            } else {
                MergeStatus::Ready { from_id, to_id }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::seeded;
    use camino::Utf8PathBuf;

    const ONE_MERGE: &str = r#"{
        "merges": [
            {"from": {"name": "Aak", "realm": "nazgrim", "region": "us"},
             "to":   {"name": "Ook", "realm": "pagle",   "region": "us"}}
        ]
    }"#;

    fn identity(name: &str, realm: &str, region: &str) -> PlayerIdentity {
        PlayerIdentity {
            name: name.into(),
            realm: realm.into(),
            region: region.into(),
        }
    }

    #[test]
    fn test_parse() {
        let config = MergeConfig::parse(ONE_MERGE).unwrap();
        assert_eq!(config.merges.len(), 1);
        assert_eq!(config.merges[0].to.realm, "pagle");
        assert_eq!(config.merges[0].from.to_string(), "Aak-nazgrim (us)");
    }

    #[test]
    fn test_empty_merges_rejected() {
        let err = MergeConfig::parse(r#"{"merges": []}"#).unwrap_err();
        assert!(err.to_string().contains("config contains no merge entries"), "{err}");
    }

    #[test]
    fn test_malformed_rejected() {
        let err = MergeConfig::parse(r#"{"merges": [{"from": {}}]}"#).unwrap_err();
        assert!(err.to_string().contains("parse config"), "{err}");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("merges.json")).unwrap();

        let err = MergeConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("read config file"), "{err}");

        fs::write(&path, ONE_MERGE).unwrap();
        assert_eq!(MergeConfig::load(&path).unwrap().merges.len(), 1);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_find_player_is_case_insensitive() {
        let conn = seeded();
        assert_eq!(find_player_id(&conn, &identity("OOK", "Pagle", "US")).unwrap(), Some(1));
        assert_eq!(find_player_id(&conn, &identity("Ook", "everlook", "eu")).unwrap(), None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_check_merges() {
        let conn = seeded();
        let config = MergeConfig {
            merges: vec![
                MergeEntry {
                    from: identity("Aak", "nazgrim", "us"),
                    to: identity("Ook", "pagle", "us"),
                },
                MergeEntry {
                    from: identity("Ook", "pagle", "us"),
                    to: identity("ook", "pagle", "us"),
                },
                MergeEntry {
                    from: identity("Nobody", "pagle", "us"),
                    to: identity("Ook", "pagle", "us"),
                },
                MergeEntry {
                    from: identity("Eek", "everlook", "eu"),
                    to: identity("Nobody", "everlook", "eu"),
                },
            ],
        };

        let statuses = check_merges(&conn, &config).unwrap();
        assert_eq!(
            statuses,
            [
                MergeStatus::Ready { from_id: 3, to_id: 1 },
                MergeStatus::SamePlayer(1),
                MergeStatus::MissingSource,
                MergeStatus::MissingTarget,
            ]
        );
    }
}
