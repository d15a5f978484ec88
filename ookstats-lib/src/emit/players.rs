//! Per-player profile documents.
//!
//! Every player with complete coverage gets
//! `player/<region>/<realm>/<slug>.json`, written compactly by a small pool of
//! worker threads sharing the preloaded data.

use super::EmitStats;
use super::writer::write_json_compact;
use crate::Result;
use crate::store::{self, BestRun, EnchantmentRow, EquipmentRow, EquipmentSet, PlayerRow, PlayerSeason, TeamMember};
use crate::wow::{fill_class_and_spec, safe_slug_name};
use camino::Utf8Path;
use chrono::Utc;
use core::sync::atomic::{AtomicUsize, Ordering};
use ohno::app_err;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::thread;

const LOG_TARGET: &str = "   players";

/// Threads writing player documents.
pub const PROFILE_WORKERS: usize = 10;

const PROGRESS_EVERY: usize = 500;

/// The full contents of one player's document.
#[derive(Debug, Serialize)]
pub struct PlayerDocument {
    pub player: PlayerJson,
    pub equipment: BTreeMap<String, EquipmentJson>,
    pub generated_at: i64,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PlayerJson {
    pub id: i64,
    pub name: String,
    pub realm_slug: String,
    pub realm_name: String,
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub active_spec_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub avatar_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub guild_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub race_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipped_item_level: Option<i64>,
    pub seasons: BTreeMap<String, SeasonJson>,
}

#[derive(Debug, Serialize)]
pub struct SeasonJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_spec_id: Option<i64>,
    pub dungeons_completed: i64,
    pub total_runs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_best_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_ranking: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_ranking: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_ranking: Option<i64>,
    #[serde(rename = "global_ranking_bracket", skip_serializing_if = "String::is_empty")]
    pub global_bracket: String,
    #[serde(rename = "regional_ranking_bracket", skip_serializing_if = "String::is_empty")]
    pub regional_bracket: String,
    #[serde(rename = "realm_ranking_bracket", skip_serializing_if = "String::is_empty")]
    pub realm_bracket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
    pub best_runs: BTreeMap<String, BestRunJson>,
}

#[derive(Debug, Serialize)]
pub struct BestRunJson {
    pub dungeon_id: i64,
    pub dungeon_name: String,
    pub dungeon_slug: String,
    pub run_id: i64,
    pub duration: i64,
    pub completed_timestamp: i64,
    #[serde(rename = "global_ranking_filtered", skip_serializing_if = "Option::is_none")]
    pub global_ranking: Option<i64>,
    #[serde(rename = "regional_ranking_filtered", skip_serializing_if = "Option::is_none")]
    pub regional_ranking: Option<i64>,
    #[serde(rename = "realm_ranking_filtered", skip_serializing_if = "Option::is_none")]
    pub realm_ranking: Option<i64>,
    #[serde(rename = "global_percentile_bracket", skip_serializing_if = "String::is_empty")]
    pub global_bracket: String,
    #[serde(rename = "regional_percentile_bracket", skip_serializing_if = "String::is_empty")]
    pub regional_bracket: String,
    #[serde(rename = "realm_percentile_bracket", skip_serializing_if = "String::is_empty")]
    pub realm_bracket: String,
    pub team_members: Vec<TeamMemberJson>,
}

#[derive(Debug, Serialize)]
pub struct TeamMemberJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<i64>,
    pub region: String,
    pub realm_slug: String,
}

/// One equipped item. Absent ids serialize as `null`.
#[derive(Debug, Serialize)]
pub struct EquipmentJson {
    pub id: i64,
    pub slot_type: String,
    pub item_id: Option<i64>,
    pub upgrade_id: Option<i64>,
    pub quality: String,
    pub item_name: String,
    pub snapshot_timestamp: i64,
    pub item_icon_slug: String,
    pub item_type: String,
    pub enchantments: Vec<EnchantmentJson>,
}

#[derive(Debug, Serialize)]
pub struct EnchantmentJson {
    pub enchantment_id: Option<i64>,
    pub slot_id: Option<i64>,
    pub slot_type: String,
    pub display_string: String,
    pub source_item_id: Option<i64>,
    pub source_item_name: String,
    pub spell_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gem_icon_slug: Option<String>,
}

/// Everything preloaded for the players being written, keyed by player id
/// (members by run id).
#[derive(Debug, Default)]
pub struct ProfileData {
    pub seasons: HashMap<i64, Vec<PlayerSeason>>,
    pub best_runs: HashMap<i64, Vec<BestRun>>,
    pub members: HashMap<i64, Vec<TeamMember>>,
    pub equipment: EquipmentSet,
}

/// Write one compact document per complete-coverage player below
/// `api/player/`.
///
/// All data is loaded up front with batched queries; loader failures abort the
/// pass, while an individual write failure is logged and counted.
pub fn emit_player_profiles(conn: &Connection, api: &Utf8Path) -> Result<EmitStats> {
    let players = store::load_complete_coverage_players(conn)?;
    if players.is_empty() {
        log::info!(target: LOG_TARGET, "no players with complete coverage");
        return Ok(EmitStats::default());
    }

    let ids: Vec<i64> = players.iter().map(|p| p.id).collect();
    let seasons = store::load_player_seasons(conn, &ids)?;
    let (best_runs, run_ids) = store::load_best_runs(conn, &ids)?;
    let members = store::load_team_members(conn, &run_ids)?;
    let equipment = store::load_equipment(conn, &ids)?;
    log::info!(
        target: LOG_TARGET,
        "loaded {} players, {} runs, equipment for {} players",
        players.len(),
        run_ids.len(),
        equipment.by_player.len()
    );

    let loaded = ProfileData {
        seasons,
        best_runs,
        members,
        equipment,
    };

    write_all(&players, &loaded, &api.join("player"))
}

fn write_all(players: &[PlayerRow], loaded: &ProfileData, out: &Utf8Path) -> Result<EmitStats> {
    let cursor = AtomicUsize::new(0);
    let next = &cursor;
    let generated_at = Utc::now().timestamp_millis();

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..PROFILE_WORKERS.min(players.len()))
            .map(|_| {
                scope.spawn(move || {
                    let mut stats = EmitStats::default();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(player) = players.get(index) else {
                            break;
                        };

                        let doc = build_player_document(player, loaded, generated_at);
                        let path = out
                            .join(&player.region)
                            .join(&player.realm_slug)
                            .join(format!("{}.json", safe_slug_name(&player.name)));
                        stats.record(&path, write_json_compact(&path, &doc));

                        if (index + 1) % PROGRESS_EVERY == 0 {
                            log::info!(target: LOG_TARGET, "{} players generated", index + 1);
                        }
                    }
                    stats
                })
            })
            .collect();

        handles.into_iter().map(thread::ScopedJoinHandle::join).collect::<Vec<_>>()
    });

    let mut total = EmitStats::default();
    for result in results {
        total.merge(result.map_err(|panic| app_err!("player writer thread panicked: {panic:?}"))?);
    }

    log::info!(target: LOG_TARGET, "wrote {} player documents ({} failed)", total.written, total.failed);
    Ok(total)
}

/// Assemble a player's document from preloaded data.
///
/// Best runs attach to the season they were set in and are skipped when that
/// season has no stats row. Only the latest equipment snapshot is present.
#[must_use]
pub fn build_player_document(player: &PlayerRow, loaded: &ProfileData, generated_at: i64) -> PlayerDocument {
    let mut class_name = player.class_name.clone().unwrap_or_default();
    let mut active_spec_name = player.active_spec_name.clone().unwrap_or_default();

    let mut seasons = BTreeMap::new();
    for season in loaded.seasons.get(&player.id).map_or(&[][..], Vec::as_slice) {
        fill_class_and_spec(&mut class_name, &mut active_spec_name, season.main_spec_id);
        let _ = seasons.insert(season.season_id.to_string(), season_json(season));
    }

    for run in loaded.best_runs.get(&player.id).map_or(&[][..], Vec::as_slice) {
        if let Some(season) = seasons.get_mut(&run.season_id.to_string()) {
            let members = loaded.members.get(&run.run_id).map_or(&[][..], Vec::as_slice);
            let _ = season.best_runs.insert(run.dungeon_slug.clone(), best_run_json(run, members));
        }
    }

    let equipment = loaded
        .equipment
        .by_player
        .get(&player.id)
        .map_or(&[][..], Vec::as_slice)
        .iter()
        .map(|row| {
            let enchantments = loaded.equipment.enchantments.get(&row.id).map_or(&[][..], Vec::as_slice);
            (row.slot_type.clone(), equipment_json(row, enchantments))
        })
        .collect();

    PlayerDocument {
        player: PlayerJson {
            id: player.id,
            name: player.name.clone(),
            realm_slug: player.realm_slug.clone(),
            realm_name: player.realm_name.clone(),
            region: player.region.clone(),
            class_name,
            active_spec_name,
            avatar_url: player.avatar_url.clone(),
            guild_name: player.guild_name.clone().unwrap_or_default(),
            race_name: player.race_name.clone().unwrap_or_default(),
            average_item_level: player.average_item_level,
            equipped_item_level: player.equipped_item_level,
            seasons,
        },
        equipment,
        generated_at,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn season_json(season: &PlayerSeason) -> SeasonJson {
    SeasonJson {
        main_spec_id: season.main_spec_id,
        dungeons_completed: season.dungeons_completed,
        total_runs: season.total_runs,
        combined_best_time: season.combined_best_time,
        global_ranking: season.global_ranking,
        regional_ranking: season.regional_ranking,
        realm_ranking: season.realm_ranking,
        global_bracket: season.global_bracket.clone().unwrap_or_default(),
        regional_bracket: season.regional_bracket.clone().unwrap_or_default(),
        realm_bracket: season.realm_bracket.clone().unwrap_or_default(),
        last_updated: season.last_updated,
        best_runs: BTreeMap::new(),
    }
}

fn best_run_json(run: &BestRun, members: &[TeamMember]) -> BestRunJson {
    BestRunJson {
        dungeon_id: run.dungeon_id,
        dungeon_name: run.dungeon_name.clone(),
        dungeon_slug: run.dungeon_slug.clone(),
        run_id: run.run_id,
        duration: run.duration,
        completed_timestamp: run.completed_timestamp,
        global_ranking: run.global_ranking,
        regional_ranking: run.regional_ranking,
        realm_ranking: run.realm_ranking,
        global_bracket: run.global_bracket.clone(),
        regional_bracket: run.regional_bracket.clone(),
        realm_bracket: run.realm_bracket.clone(),
        team_members: members
            .iter()
            .map(|m| TeamMemberJson {
                name: m.name.clone(),
                spec_id: m.spec_id,
                region: m.region.clone(),
                realm_slug: m.realm_slug.clone(),
            })
            .collect(),
    }
}

fn equipment_json(row: &EquipmentRow, enchantments: &[EnchantmentRow]) -> EquipmentJson {
    EquipmentJson {
        id: row.id,
        slot_type: row.slot_type.clone(),
        item_id: row.item_id,
        upgrade_id: row.upgrade_id,
        quality: row.quality.clone(),
        item_name: row.item_name.clone(),
        snapshot_timestamp: row.snapshot_timestamp,
        item_icon_slug: row.icon.clone().unwrap_or_default(),
        item_type: row.item_type.clone().unwrap_or_default(),
        enchantments: enchantments
            .iter()
            .map(|e| EnchantmentJson {
                enchantment_id: e.enchantment_id,
                slot_id: e.slot_id,
                slot_type: e.slot_type.clone().unwrap_or_default(),
                display_string: e.display_string.clone().unwrap_or_default(),
                source_item_id: e.source_item_id,
                source_item_name: e.source_item_name.clone().unwrap_or_default(),
                spell_id: e.spell_id,
                gem_icon_slug: e.gem_icon.clone(),
            })
            .collect(),
    }
}
