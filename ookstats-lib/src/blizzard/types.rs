//! Wire types for the vendor API.
//!
//! Every struct tolerates missing fields; the API omits keys freely and a
//! missing field is not a decode failure.

use super::Member;
use serde::{Deserialize, Serialize};

/// Top-level body of a mythic leaderboard response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardResponse {
    pub leading_groups: Vec<ChallengeRun>,
    pub period: i64,
    pub period_start_timestamp: i64,
    pub period_end_timestamp: i64,
}

impl LeaderboardResponse {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leading_groups.is_empty()
    }
}

/// One timed run on a leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeRun {
    /// Milliseconds.
    pub duration: i64,
    pub completed_timestamp: i64,
    pub keystone_level: i64,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRef {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildRef {
    pub name: String,
}

/// `/profile/wow/character/{realm}/{name}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSummary {
    pub id: i64,
    pub name: String,
    pub level: i64,
    pub race: NamedRef,
    pub character_class: NamedRef,
    pub active_spec: NamedRef,
    pub gender: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild: Option<GuildRef>,
    pub average_item_level: i64,
    pub equipped_item_level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_timestamp: Option<i64>,
}

/// `/profile/wow/character/{realm}/{name}/equipment`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterEquipment {
    pub equipped_items: Vec<EquippedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRef {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquippedItem {
    pub item: ItemRef,
    pub slot: TypeRef,
    pub name: String,
    pub quality: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enchantments: Vec<ItemEnchantment>,
}

/// An enchantment, gem, or tinker on an equipped item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemEnchantment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enchantment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enchantment_slot: Option<EnchantmentSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_item: Option<NamedRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spell: Option<SpellRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnchantmentSlot {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellRef {
    pub spell: ItemRef,
}

/// `/profile/wow/character/{realm}/{name}/character-media`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterMedia {
    pub assets: Vec<MediaAsset>,
}

impl CharacterMedia {
    /// URL of the `avatar` asset, if any.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.assets.iter().find(|a| a.key == "avatar").map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaAsset {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmBrief {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub id: i64,
    pub slug: String,
}

#[expect(clippy::trivially_copy_pass_by_ref, reason = "signature required by serde")]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterRef {
    pub name: String,
    pub id: i64,
    pub realm: RealmBrief,
}

/// `/profile/wow/character/{realm}/{name}/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStatus {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub character: CharacterRef,
}

/// `/profile/wow/character/{realm}/{name}/achievements`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAchievements {
    pub achievements: Vec<CharacterAchievement>,
    pub character: CharacterRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterAchievement {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_timestamp: Option<i64>,
    pub criteria: AchievementCriteria,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementCriteria {
    pub id: i64,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Href {
    pub href: String,
}

/// A `{key: {href}, id}` reference as used by index documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyedRef {
    pub key: Href,
    pub id: i64,
}

/// `/data/wow/mythic-keystone/season/index`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonIndex {
    pub seasons: Vec<KeyedRef>,
    pub current_season: KeyedRef,
}

/// `/data/wow/mythic-keystone/season/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonDetail {
    pub id: i64,
    pub start_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<i64>,
    pub season_name: String,
    pub periods: Vec<KeyedRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_decodes_both_member_shapes() {
        let body = r#"{
            "leading_groups": [
                {"duration": 1200000, "completed_timestamp": 1700000000000, "keystone_level": 12,
                 "members": [
                    {"id": 1, "name": "Ook", "realm_slug": "pagle", "spec_id": 250, "faction": "HORDE"},
                    {"profile": {"id": 2, "name": "Eek", "realm": {"slug": "everlook"}},
                     "specialization": {"id": 105}, "faction": {"type": "ALLIANCE"}}
                 ]}
            ],
            "period": 1034
        }"#;

        let lb: LeaderboardResponse = serde_json::from_str(body).unwrap();
        assert_eq!(lb.period, 1034);
        assert_eq!(lb.period_start_timestamp, 0);
        let members = &lb.leading_groups[0].members;
        assert_eq!(members[0].player_id(), Some(1));
        assert_eq!(members[1].player_id(), Some(2));
        assert_eq!(members[1].realm_slug(), Some("everlook"));
        assert_eq!(members[1].faction(), Some("ALLIANCE"));
    }

    #[test]
    fn test_summary_tolerates_missing_fields() {
        let summary: CharacterSummary = serde_json::from_str(r#"{"id": 5, "name": "Ook"}"#).unwrap();
        assert_eq!(summary.id, 5);
        assert!(summary.guild.is_none());
        assert_eq!(summary.active_spec.id, 0);
    }

    #[test]
    fn test_avatar_url() {
        let media: CharacterMedia =
            serde_json::from_str(r#"{"assets": [{"key": "inset", "value": "a"}, {"key": "avatar", "value": "b"}]}"#).unwrap();
        assert_eq!(media.avatar_url(), Some("b"));
        assert_eq!(CharacterMedia::default().avatar_url(), None);
    }

    #[test]
    fn test_enchantment_shape() {
        let item: EquippedItem = serde_json::from_str(
            r#"{"item": {"id": 10}, "slot": {"type": "HEAD"}, "name": "Helm", "quality": {"type": "EPIC"},
                "enchantments": [{"enchantment_id": 4, "enchantment_slot": {"id": 0, "type": "PERMANENT"},
                                  "source_item": {"id": 7, "name": "Gem"}, "spell": {"spell": {"id": 99}}}]}"#,
        )
        .unwrap();
        assert_eq!(item.slot.kind, "HEAD");
        let ench = &item.enchantments[0];
        assert_eq!(ench.enchantment_slot.as_ref().unwrap().kind, "PERMANENT");
        assert_eq!(ench.spell.as_ref().unwrap().spell.id, 99);
    }
}
