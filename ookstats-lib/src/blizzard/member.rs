//! Leaderboard participants.
//!
//! The API has shipped two shapes for a member:
//!
//! ```json
//! {"id": 1, "name": "Ook", "realm_slug": "pagle", "spec_id": 250, "faction": "HORDE"}
//! {"profile": {"id": 1, "name": "Ook", "realm": {"slug": "pagle"}},
//!  "specialization": {"id": 250}, "faction": {"type": "HORDE"}}
//! ```
//!
//! Both decode into the same flat [`Member`]; the flat field wins when both are
//! present. Serialization always produces the flat shape.

use serde::{Deserialize, Serialize};

/// A run participant in flat form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMember")]
pub struct Member {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realm_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    faction: Option<String>,
}

impl Member {
    #[must_use]
    pub const fn new(id: i64, name: String, realm_slug: String, spec_id: Option<i64>, faction: Option<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name),
            realm_slug: Some(realm_slug),
            spec_id,
            faction,
        }
    }

    #[must_use]
    pub const fn player_id(&self) -> Option<i64> {
        self.id
    }

    #[must_use]
    pub fn player_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn realm_slug(&self) -> Option<&str> {
        self.realm_slug.as_deref()
    }

    #[must_use]
    pub const fn spec_id(&self) -> Option<i64> {
        self.spec_id
    }

    #[must_use]
    pub fn faction(&self) -> Option<&str> {
        self.faction.as_deref()
    }
}

#[derive(Deserialize)]
struct WireMember {
    id: Option<i64>,
    name: Option<String>,
    realm_slug: Option<String>,
    spec_id: Option<i64>,
    faction: Option<WireFaction>,
    profile: Option<WireProfile>,
    specialization: Option<WireId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFaction {
    Flat(String),
    Nested {
        #[serde(rename = "type", default)]
        kind: String,
    },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireProfile {
    id: i64,
    name: String,
    realm: WireRealm,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireRealm {
    slug: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireId {
    id: i64,
}

impl From<WireMember> for Member {
    fn from(wire: WireMember) -> Self {
        let profile = wire.profile;
        Self {
            id: wire.id.or_else(|| profile.as_ref().map(|p| p.id)),
            name: wire.name.or_else(|| profile.as_ref().map(|p| p.name.clone())),
            realm_slug: wire.realm_slug.or_else(|| profile.as_ref().map(|p| p.realm.slug.clone())),
            spec_id: wire.spec_id.or_else(|| wire.specialization.map(|s| s.id)),
            faction: wire.faction.map(|f| match f {
                WireFaction::Flat(value) | WireFaction::Nested { kind: value } => value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Member {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flat_shape() {
        let m = decode(r#"{"id": 7, "name": "Ook", "realm_slug": "pagle", "spec_id": 268, "faction": "HORDE"}"#);
        assert_eq!(m.player_id(), Some(7));
        assert_eq!(m.player_name(), Some("Ook"));
        assert_eq!(m.realm_slug(), Some("pagle"));
        assert_eq!(m.spec_id(), Some(268));
        assert_eq!(m.faction(), Some("HORDE"));
    }

    #[test]
    fn test_nested_shape() {
        let m = decode(
            r#"{"profile": {"id": 9, "name": "Eek", "realm": {"slug": "everlook"}},
                "specialization": {"id": 64}, "faction": {"type": "ALLIANCE"}}"#,
        );
        assert_eq!(m.player_id(), Some(9));
        assert_eq!(m.player_name(), Some("Eek"));
        assert_eq!(m.realm_slug(), Some("everlook"));
        assert_eq!(m.spec_id(), Some(64));
        assert_eq!(m.faction(), Some("ALLIANCE"));
    }

    #[test]
    fn test_flat_preferred_over_nested() {
        let m = decode(r#"{"id": 1, "name": "Flat", "profile": {"id": 2, "name": "Nested", "realm": {"slug": "x"}}}"#);
        assert_eq!(m.player_id(), Some(1));
        assert_eq!(m.player_name(), Some("Flat"));
        assert_eq!(m.realm_slug(), Some("x"));
    }

    #[test]
    fn test_absent_everywhere() {
        let m = decode("{}");
        assert_eq!(m, Member::default());
        assert!(m.player_id().is_none());
        assert!(m.faction().is_none());
    }

    #[test]
    fn test_serializes_flat() {
        let m = decode(r#"{"profile": {"id": 3, "name": "N", "realm": {"slug": "r"}}, "specialization": {"id": 5}}"#);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"N","realm_slug":"r","spec_id":5}"#);
        assert_eq!(decode(&json), m);
    }
}
