//! Realm directory and merged-realm aliasing.

use super::Region;
use std::collections::BTreeMap;

/// A realm as known to the vendor API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmInfo {
    /// Connected realm id used in leaderboard URLs.
    pub id: i64,
    pub region: Region,
    pub name: &'static str,
    pub slug: &'static str,
}

const fn realm(id: i64, region: Region, name: &'static str, slug: &'static str) -> RealmInfo {
    RealmInfo { id, region, name, slug }
}

/// Every realm that carries Mythic Keystone leaderboards.
///
/// Slugs are unique within a region only (`golemagg` and `windseeker` exist in
/// more than one region).
pub const REALMS: &[RealmInfo] = &[
    realm(4372, Region::Us, "Atiesh", "atiesh"),
    realm(4373, Region::Us, "Myzrael", "myzrael"),
    realm(4374, Region::Us, "Old Blanchy", "old-blanchy"),
    realm(4376, Region::Us, "Azuresong", "azuresong"),
    realm(4384, Region::Us, "Mankrik", "mankrik"),
    realm(4385, Region::Us, "Pagle", "pagle"),
    realm(4387, Region::Us, "Ashkandi", "ashkandi"),
    realm(4388, Region::Us, "Westfall", "westfall"),
    realm(4395, Region::Us, "Whitemane", "whitemane"),
    realm(4408, Region::Us, "Faerlina", "faerlina"),
    realm(4647, Region::Us, "Grobbulus", "grobbulus"),
    realm(4648, Region::Us, "Bloodsail Buccaneers", "bloodsail-buccaneers"),
    realm(4667, Region::Us, "Remulos (AU)", "remulos-au"),
    realm(4669, Region::Us, "Arugal (AU)", "arugal-au"),
    realm(4670, Region::Us, "Yojamba (AU)", "yojamba-au"),
    realm(4725, Region::Us, "Skyfury", "skyfury"),
    realm(4726, Region::Us, "Sulfuras", "sulfuras"),
    realm(4727, Region::Us, "Windseeker", "windseeker"),
    realm(4728, Region::Us, "Benediction", "benediction"),
    realm(4731, Region::Us, "Earthfury", "earthfury"),
    realm(4738, Region::Us, "Maladath", "maladath"),
    realm(4795, Region::Us, "Angerforge", "angerforge"),
    realm(4800, Region::Us, "Eranikus", "eranikus"),
    realm(6359, Region::Us, "Nazgrim", "nazgrim"),
    realm(6360, Region::Us, "Galakras", "galakras"),
    realm(6361, Region::Us, "Ra-den", "raden"),
    realm(6362, Region::Us, "Lei Shen", "lei-shen"),
    realm(6363, Region::Us, "Immerseus", "immerseus"),
    realm(4440, Region::Eu, "Everlook", "everlook"),
    realm(4441, Region::Eu, "Auberdine", "auberdine"),
    realm(4442, Region::Eu, "Lakeshire", "lakeshire"),
    realm(4452, Region::Eu, "Chromie", "chromie"),
    realm(4453, Region::Eu, "Pyrewood Village", "pyrewood-village"),
    realm(4454, Region::Eu, "Mirage Raceway", "mirage-raceway"),
    realm(4455, Region::Eu, "Razorfen", "razorfen"),
    realm(4456, Region::Eu, "Nethergarde Keep", "nethergarde-keep"),
    realm(4464, Region::Eu, "Sulfuron", "sulfuron"),
    realm(4465, Region::Eu, "Golemagg", "golemagg"),
    realm(4466, Region::Eu, "Patchwerk", "patchwerk"),
    realm(4467, Region::Eu, "Firemaw", "firemaw"),
    realm(4474, Region::Eu, "Flamegor", "flamegor"),
    realm(4476, Region::Eu, "Gehennas", "gehennas"),
    realm(4477, Region::Eu, "Venoxis", "venoxis"),
    realm(4678, Region::Eu, "Hydraxian Waterlords", "hydraxian-waterlords"),
    realm(4701, Region::Eu, "Mograine", "mograine"),
    realm(4703, Region::Eu, "Amnennar", "amnennar"),
    realm(4742, Region::Eu, "Ashbringer", "ashbringer"),
    realm(4745, Region::Eu, "Transcendence", "transcendence"),
    realm(4749, Region::Eu, "Earthshaker", "earthshaker"),
    realm(4811, Region::Eu, "Giantstalker", "giantstalker"),
    realm(4813, Region::Eu, "Mandokir", "mandokir"),
    realm(4815, Region::Eu, "Thekal", "thekal"),
    realm(4816, Region::Eu, "Jin'do", "jindo"),
    realm(6364, Region::Eu, "Shek'zeer", "shekzeer"),
    realm(6365, Region::Eu, "Garalon", "garalon"),
    realm(6366, Region::Eu, "Norushen", "norushen"),
    realm(6367, Region::Eu, "Hoptallus", "hoptallus"),
    realm(6368, Region::Eu, "Ook Ook", "ook-ook"),
    realm(4417, Region::Kr, "Shimmering Flats", "shimmering-flats"),
    realm(4419, Region::Kr, "Lokholar", "lokholar"),
    realm(4420, Region::Kr, "Iceblood", "iceblood"),
    realm(4421, Region::Kr, "Ragnaros", "ragnaros"),
    realm(4840, Region::Kr, "Frostmourne", "frostmourne"),
    realm(4485, Region::Tw, "Maraudon", "maraudon"),
    realm(4487, Region::Tw, "Ivus", "ivus"),
    realm(4488, Region::Tw, "Wushoolay", "wushoolay"),
    realm(4489, Region::Tw, "Zeliek", "zeliek"),
    realm(5740, Region::Tw, "Arathi Basin", "arathi-basin"),
    realm(5741, Region::Tw, "Murloc", "murloc"),
    realm(5742, Region::Tw, "Golemagg", "golemagg"),
    realm(5743, Region::Tw, "Windseeker", "windseeker"),
];

/// Realms belonging to `region`, in table order.
pub fn realms_in(region: Region) -> impl Iterator<Item = &'static RealmInfo> {
    REALMS.iter().filter(move |r| r.region == region)
}

/// Look up a realm by region and (normalized) slug.
#[must_use]
pub fn find_realm(region: Region, slug: &str) -> Option<&'static RealmInfo> {
    let slug = normalize_realm_slug(region, &normalize(slug));
    REALMS.iter().find(|r| r.region == region && r.slug == slug)
}

/// Apply the vendor's region-specific realm renames.
///
/// The US Oceanic realms moved to `-au` slugs; the old slugs 404.
#[must_use]
pub fn normalize_realm_slug(region: Region, slug: &str) -> String {
    match (region, slug) {
        (Region::Us, "arugal") => "arugal-au".to_string(),
        (Region::Us, "remulos") => "remulos-au".to_string(),
        (Region::Us, "yojamba") => "yojamba-au".to_string(),
        _ => slug.to_string(),
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Child → parent slug mapping for merged realms, per region.
///
/// Child realms still receive leaderboard traffic, but output is grouped under
/// the parent's slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealmAliases {
    by_region: BTreeMap<String, BTreeMap<String, String>>,
}

impl RealmAliases {
    /// Build from a region → (child → parent) table. Keys and values are normalized.
    #[must_use]
    pub fn new(table: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let by_region = table
            .iter()
            .map(|(region, children)| {
                let children = children.iter().map(|(child, parent)| (normalize(child), normalize(parent))).collect();
                (normalize(region), children)
            })
            .collect();

        Self { by_region }
    }

    /// The leaderboard slug for a realm: its parent when merged, else itself.
    ///
    /// Returns an empty string for an empty slug.
    #[must_use]
    pub fn effective_slug(&self, region: &str, slug: &str) -> String {
        let slug = normalize(slug);
        if slug.is_empty() {
            return slug;
        }

        self.by_region
            .get(&normalize(region))
            .and_then(|children| children.get(&slug))
            .cloned()
            .unwrap_or(slug)
    }

    /// Parent slug of `slug`, when it is a merged child.
    #[must_use]
    pub fn parent_of(&self, region: &str, slug: &str) -> Option<&str> {
        self.by_region.get(&normalize(region))?.get(&normalize(slug)).map(String::as_str)
    }

    /// Every `(region, child, parent)` triple.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.by_region.iter().flat_map(|(region, children)| {
            children
                .iter()
                .map(move |(child, parent)| (region.as_str(), child.as_str(), parent.as_str()))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_region.values().all(BTreeMap::is_empty)
    }
}
