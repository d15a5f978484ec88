//! Navigation indexes for the static API.
//!
//! Indexes only link; they never embed leaderboard rows. Page-bearing links
//! carry the literal `{page}` token and dungeon-bearing links `{dungeon}`.

use super::{DocumentSink, EmitStats, Link, season_path};
use crate::Result;
use crate::store::{self, DungeonRow, RealmRow, SeasonRow};
use crate::wow::{CLASSES, RealmAliases, Region, ShortNames, sorted_spec_names};
use camino::Utf8Path;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "   indexes";

const API_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
struct RootIndex {
    #[serde(rename = "_links")]
    links: SelfLink,
    indexes: BTreeMap<&'static str, &'static str>,
    endpoints: BTreeMap<&'static str, &'static str>,
    api_version: &'static str,
    last_updated: String,
}

#[derive(Debug, Serialize)]
struct SelfLink {
    #[serde(rename = "self")]
    self_: Link,
}

#[derive(Debug, Serialize)]
struct SeasonData {
    id: i64,
    name: String,
    start_timestamp: Option<i64>,
    end_timestamp: Option<i64>,
    is_current: bool,
    #[serde(rename = "_links")]
    links: SeasonLinks,
}

#[derive(Debug, Serialize)]
struct SeasonLinks {
    #[serde(rename = "self")]
    self_: Link,
    scopes: Link,
}

#[derive(Debug, Serialize)]
struct ScopeData {
    scope: &'static str,
    #[serde(rename = "_links")]
    links: LeaderboardLink,
}

#[derive(Debug, Serialize)]
struct LeaderboardLink {
    leaderboard: Link,
}

#[derive(Debug, Serialize)]
struct DungeonData {
    id: i64,
    slug: String,
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    short_name: String,
    map_challenge_mode_id: Option<i64>,
    #[serde(rename = "_links")]
    links: LeaderboardLink,
}

#[derive(Debug, Serialize)]
struct RealmData {
    slug: String,
    name: String,
    connected_realm_id: Option<i64>,
    parent_realm: Option<String>,
    player_count: i64,
    #[serde(rename = "_links")]
    links: RealmLinks,
}

#[derive(Debug, Serialize)]
struct RealmLinks {
    dungeons: Link,
}

#[derive(Debug, Serialize)]
struct RegionalRealmsIndex {
    all: AggregateLink,
    data: Vec<RealmData>,
    metadata: super::Metadata,
}

#[derive(Debug, Serialize)]
struct AggregateLink {
    href: String,
    note: &'static str,
}

#[derive(Debug, Serialize)]
struct RegionData {
    region: String,
    href: String,
}

#[derive(Debug, Serialize)]
struct ClassData {
    id: u32,
    key: &'static str,
    name: &'static str,
    specs: Vec<&'static str>,
    #[serde(rename = "_links")]
    links: ClassLinks,
}

#[derive(Debug, Serialize)]
struct ClassLinks {
    scopes: Link,
}

#[derive(Debug, Serialize)]
struct ClassScopeData {
    scope: &'static str,
    href: String,
}

/// Write the full index tree below `api`.
///
/// Season-scoped indexes are written for every stored season, or for season 1
/// when none is stored yet. Realms merged into another realm are left out of
/// realm listings, since their runs are published under the parent.
pub fn emit_indexes(conn: &Connection, api: &Utf8Path, aliases: &RealmAliases) -> Result<EmitStats> {
    let mut sink = DocumentSink::new();

    write_root(&mut sink, api);

    let seasons = store::load_seasons(conn)?;
    write_seasons(&mut sink, api, &seasons);

    let mut season_ids: Vec<i64> = seasons.iter().map(|s| s.number).collect();
    if season_ids.is_empty() {
        log::warn!(target: LOG_TARGET, "no seasons stored, indexing season 1");
        season_ids.push(1);
    }

    let dungeons = store::load_dungeons(conn)?;
    let mut realms = Vec::new();
    for region in Region::all() {
        let listed: Vec<RealmRow> = store::load_realms(conn, region.as_ref())?
            .into_iter()
            .filter(|realm| aliases.parent_of(region.as_ref(), &realm.slug).is_none())
            .collect();
        realms.push((region, listed));
    }

    let short_names = ShortNames::default();
    for season in season_ids {
        write_season_scope(&mut sink, api, season);
        write_dungeon_indexes(&mut sink, api, season, &dungeons, &realms, &short_names);
        write_regional_indexes(&mut sink, api, season, &realms);
        write_player_indexes(&mut sink, api, season, &realms);
        write_class_indexes(&mut sink, api, season, &realms);
    }

    log::info!(target: LOG_TARGET, "wrote {} index documents ({} failed)", sink.stats.written, sink.stats.failed);
    Ok(sink.stats)
}

fn write_root(sink: &mut DocumentSink, api: &Utf8Path) {
    let root = RootIndex {
        links: SelfLink {
            self_: Link::new("/api/index.json"),
        },
        indexes: BTreeMap::from([("seasons", "/api/leaderboard/season/index.json")]),
        endpoints: BTreeMap::from([
            ("dungeon_leaderboard", "/api/leaderboard/season/{season_id}/{scope}/{dungeon}/{page}.json"),
            ("player_leaderboard", "/api/leaderboard/season/{season_id}/players/{scope}/{page}.json"),
            ("player_profile", "/api/player/{region}/{realm}/{name}.json"),
            ("search", "/api/search/players-{shard}.json"),
        ]),
        api_version: API_VERSION,
        last_updated: sink.last_updated.clone(),
    };
    sink.write(&api.join("index.json"), &root);
}

fn write_seasons(sink: &mut DocumentSink, api: &Utf8Path, seasons: &[SeasonRow]) {
    let mut data: Vec<SeasonData> = seasons
        .iter()
        .map(|season| {
            let href = format!("/api/leaderboard/season/{}/index.json", season.number);
            SeasonData {
                id: season.number,
                name: season
                    .name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("Season {}", season.number)),
                start_timestamp: season.start_timestamp,
                end_timestamp: season.end_timestamp,
                is_current: season.end_timestamp.is_none(),
                links: SeasonLinks {
                    self_: Link::new(href.clone()),
                    scopes: Link::new(href),
                },
            }
        })
        .collect();

    if !data.iter().any(|s| s.is_current)
        && let Some(last) = data.last_mut()
    {
        last.is_current = true;
    }

    sink.index(&api.join("leaderboard/season/index.json"), data);
}

fn write_season_scope(sink: &mut DocumentSink, api: &Utf8Path, season: i64) {
    let scopes = ["global", "us", "eu", "kr", "tw", "players"]
        .into_iter()
        .map(|scope| ScopeData {
            scope,
            links: LeaderboardLink {
                leaderboard: Link::new(format!("/api/leaderboard/season/{season}/{scope}/index.json")),
            },
        })
        .collect();

    sink.index(&season_path(api, season).join("index.json"), scopes);
}

fn dungeon_data(dungeons: &[DungeonRow], short_names: &ShortNames, href: impl Fn(&str) -> String) -> Vec<DungeonData> {
    dungeons
        .iter()
        .map(|d| DungeonData {
            id: d.id,
            slug: d.slug.clone(),
            name: d.name.clone(),
            short_name: short_names.get(&d.slug, &d.name),
            map_challenge_mode_id: d.map_challenge_mode_id,
            links: LeaderboardLink {
                leaderboard: Link::new(href(&d.slug)),
            },
        })
        .collect()
}

fn write_dungeon_indexes(
    sink: &mut DocumentSink,
    api: &Utf8Path,
    season: i64,
    dungeons: &[DungeonRow],
    realms: &[(Region, Vec<RealmRow>)],
    short_names: &ShortNames,
) {
    let dir = season_path(api, season);

    let global = dungeon_data(dungeons, short_names, |slug| {
        format!("/api/leaderboard/season/{season}/global/{slug}/{{page}}.json")
    });
    sink.index(&dir.join("global/index.json"), global);

    for (region, listed) in realms {
        for realm in listed {
            let data = dungeon_data(dungeons, short_names, |slug| {
                format!("/api/leaderboard/season/{season}/{region}/{}/{slug}/{{page}}.json", realm.slug)
            });
            sink.index(&dir.join(region.as_ref()).join(&realm.slug).join("index.json"), data);
        }
    }
}

fn write_regional_indexes(sink: &mut DocumentSink, api: &Utf8Path, season: i64, realms: &[(Region, Vec<RealmRow>)]) {
    for (region, listed) in realms {
        let data: Vec<RealmData> = listed
            .iter()
            .map(|realm| RealmData {
                slug: realm.slug.clone(),
                name: realm.name.clone(),
                connected_realm_id: realm.connected_realm_id,
                parent_realm: realm.parent_realm_slug.clone(),
                player_count: realm.player_count,
                links: RealmLinks {
                    dungeons: Link::new(format!("/api/leaderboard/season/{season}/{region}/{}/index.json", realm.slug)),
                },
            })
            .collect();

        let doc = RegionalRealmsIndex {
            all: AggregateLink {
                href: format!("/api/leaderboard/season/{season}/{region}/all/{{dungeon}}/{{page}}.json"),
                note: "Regional aggregate leaderboard (all realms combined)",
            },
            metadata: sink.metadata(data.len()),
            data,
        };
        sink.write(&season_path(api, season).join(region.as_ref()).join("index.json"), &doc);
    }
}

fn region_links(prefix: &str, suffix: &str) -> Vec<RegionData> {
    Region::all()
        .map(|region| RegionData {
            region: region.to_string(),
            href: format!("{prefix}/{region}/{suffix}"),
        })
        .collect()
}

fn realm_links(prefix: &str, region: Region, realms: &[RealmRow]) -> Vec<RegionData> {
    realms
        .iter()
        .map(|realm| RegionData {
            region: realm.slug.clone(),
            href: format!("{prefix}/{region}/{}/{{page}}.json", realm.slug),
        })
        .collect()
}

fn write_player_indexes(sink: &mut DocumentSink, api: &Utf8Path, season: i64, realms: &[(Region, Vec<RealmRow>)]) {
    let dir = season_path(api, season).join("players");
    let base = format!("/api/leaderboard/season/{season}/players");

    let scopes = [
        ("global", format!("{base}/global/{{page}}.json")),
        ("regional", format!("{base}/regional/index.json")),
        ("realm", format!("{base}/realm/index.json")),
        ("class", format!("{base}/class/index.json")),
    ]
    .into_iter()
    .map(|(scope, href)| ScopeData {
        scope,
        links: LeaderboardLink { leaderboard: Link::new(href) },
    })
    .collect();
    sink.index(&dir.join("index.json"), scopes);

    sink.index(&dir.join("regional/index.json"), region_links(&format!("{base}/regional"), "{page}.json"));
    sink.index(&dir.join("realm/index.json"), region_links(&format!("{base}/realm"), "index.json"));

    for (region, listed) in realms {
        sink.index(
            &dir.join("realm").join(region.as_ref()).join("index.json"),
            realm_links(&format!("{base}/realm"), *region, listed),
        );
    }
}

fn write_class_indexes(sink: &mut DocumentSink, api: &Utf8Path, season: i64, realms: &[(Region, Vec<RealmRow>)]) {
    let dir = season_path(api, season).join("players/class");
    let base = format!("/api/leaderboard/season/{season}/players/class");

    let classes = CLASSES
        .iter()
        .map(|class| ClassData {
            id: class.id,
            key: class.key,
            name: class.name,
            specs: sorted_spec_names(class),
            links: ClassLinks {
                scopes: Link::new(format!("{base}/{}/index.json", class.key)),
            },
        })
        .collect();
    sink.index(&dir.join("index.json"), classes);

    for class in CLASSES {
        let class_dir = dir.join(class.key);
        let class_base = format!("{base}/{}", class.key);

        let scopes = vec![
            ClassScopeData {
                scope: "global",
                href: format!("{class_base}/global/{{page}}.json"),
            },
            ClassScopeData {
                scope: "regional",
                href: format!("{class_base}/regional/index.json"),
            },
            ClassScopeData {
                scope: "realm",
                href: format!("{class_base}/realm/index.json"),
            },
        ];
        sink.index(&class_dir.join("index.json"), scopes);

        sink.index(&class_dir.join("regional/index.json"), region_links(&format!("{class_base}/regional"), "{page}.json"));
        sink.index(&class_dir.join("realm/index.json"), region_links(&format!("{class_base}/realm"), "index.json"));

        for (region, listed) in realms {
            sink.index(
                &class_dir.join("realm").join(region.as_ref()).join("index.json"),
                realm_links(&format!("{class_base}/realm"), *region, listed),
            );
        }
    }
}
