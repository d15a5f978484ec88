use super::batch::{BATCH_SIZE, placeholders};
use crate::Result;
use ohno::IntoAppError;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::collections::HashMap;

const LOG_TARGET: &str = "    loader";

/// One equipped item from a player's latest snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquipmentRow {
    pub id: i64,
    pub slot_type: String,
    pub item_id: Option<i64>,
    pub upgrade_id: Option<i64>,
    pub quality: String,
    pub item_name: String,
    pub snapshot_timestamp: i64,
    pub icon: Option<String>,
    pub item_type: Option<String>,
}

/// An enchantment, gem, or tinker attached to an equipment row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnchantmentRow {
    pub equipment_id: i64,
    pub enchantment_id: Option<i64>,
    pub slot_id: Option<i64>,
    pub slot_type: Option<String>,
    pub display_string: Option<String>,
    pub source_item_id: Option<i64>,
    pub source_item_name: Option<String>,
    pub spell_id: Option<i64>,
    pub gem_icon: Option<String>,
}

/// Latest equipment per player, and enchantments keyed by equipment id.
#[derive(Debug, Clone, Default)]
pub struct EquipmentSet {
    pub by_player: HashMap<i64, Vec<EquipmentRow>>,
    pub enchantments: HashMap<i64, Vec<EnchantmentRow>>,
}

/// Each player's latest equipment snapshot with its enchantments.
///
/// Runs in three steps: latest snapshot timestamp per player, then every row
/// matching a `(player, timestamp)` pair through a `VALUES` join, then
/// enchantments for the resulting equipment ids.
pub fn load_equipment(conn: &Connection, player_ids: &[i64]) -> Result<EquipmentSet> {
    let latest = latest_snapshots(conn, player_ids)?;
    if latest.is_empty() {
        return Ok(EquipmentSet::default());
    }

    let mut set = EquipmentSet::default();
    let mut equipment_ids = Vec::new();

    // two parameters per pair
    for (index, pairs) in latest.chunks(BATCH_SIZE / 2).enumerate() {
        let values = vec!["(?, ?)"; pairs.len()].join(", ");
        let sql = format!(
            "WITH latest(player_id, ts) AS (VALUES {values})
             SELECT e.player_id, e.id, e.slot_type, e.item_id, e.upgrade_id, e.quality, e.item_name, e.snapshot_timestamp,
                    i.icon, CAST(i.type AS TEXT)
             FROM player_equipment e
             JOIN latest l ON e.player_id = l.player_id AND e.snapshot_timestamp = l.ts
             LEFT JOIN items i ON e.item_id = i.id
             ORDER BY e.player_id, e.slot_type"
        );

        let params: Vec<Value> = pairs
            .iter()
            .flat_map(|&(player, ts)| [Value::Integer(player), Value::Integer(ts)])
            .collect();

        let mut stmt = conn.prepare(&sql).into_app_err_with(|| format!("batch equipment query {}", index + 1))?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    EquipmentRow {
                        id: row.get(1)?,
                        slot_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        item_id: row.get(3)?,
                        upgrade_id: row.get(4)?,
                        quality: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                        item_name: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                        snapshot_timestamp: row.get(7)?,
                        icon: row.get(8)?,
                        item_type: row.get(9)?,
                    },
                ))
            })
            .into_app_err_with(|| format!("batch equipment query {}", index + 1))?;

        for row in rows {
            let (player_id, item) = row.into_app_err("scan equipment")?;
            equipment_ids.push(item.id);
            set.by_player.entry(player_id).or_default().push(item);
        }
    }

    set.enchantments = load_enchantments(conn, &equipment_ids)?;

    log::debug!(
        target: LOG_TARGET,
        "loaded {} equipment rows for {} players",
        equipment_ids.len(),
        set.by_player.len()
    );
    Ok(set)
}

fn latest_snapshots(conn: &Connection, player_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
    let mut latest = Vec::new();

    for (index, batch) in player_ids.chunks(BATCH_SIZE).enumerate() {
        let sql = format!(
            "SELECT player_id, MAX(snapshot_timestamp)
             FROM player_equipment
             WHERE player_id IN ({}) AND snapshot_timestamp IS NOT NULL
             GROUP BY player_id",
            placeholders(batch.len())
        );

        let mut stmt = conn.prepare(&sql).into_app_err_with(|| format!("batch {}: latest snapshot", index + 1))?;
        let rows = stmt
            .query_map(params_from_iter(batch), |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .into_app_err_with(|| format!("batch {}: latest snapshot", index + 1))?;

        for row in rows {
            latest.push(row.into_app_err("scan latest snapshot")?);
        }
    }

    Ok(latest)
}

fn load_enchantments(conn: &Connection, equipment_ids: &[i64]) -> Result<HashMap<i64, Vec<EnchantmentRow>>> {
    let mut by_equipment: HashMap<i64, Vec<EnchantmentRow>> = HashMap::new();

    for (index, batch) in equipment_ids.chunks(BATCH_SIZE).enumerate() {
        let sql = format!(
            "SELECT pee.equipment_id, pee.enchantment_id, pee.slot_id, pee.slot_type, pee.display_string,
                    pee.source_item_id, pee.source_item_name, pee.spell_id, i.icon
             FROM player_equipment_enchantments pee
             LEFT JOIN items i ON pee.source_item_id = i.id
             WHERE pee.equipment_id IN ({})
             ORDER BY pee.equipment_id, pee.slot_id",
            placeholders(batch.len())
        );

        let mut stmt = conn.prepare(&sql).into_app_err_with(|| format!("enchantments batch {}", index + 1))?;
        let rows = stmt
            .query_map(params_from_iter(batch), |row| {
                Ok(EnchantmentRow {
                    equipment_id: row.get(0)?,
                    enchantment_id: row.get(1)?,
                    slot_id: row.get(2)?,
                    slot_type: row.get(3)?,
                    display_string: row.get(4)?,
                    source_item_id: row.get(5)?,
                    source_item_name: row.get(6)?,
                    spell_id: row.get(7)?,
                    gem_icon: row.get(8)?,
                })
            })
            .into_app_err_with(|| format!("enchantments batch {}", index + 1))?;

        for row in rows {
            let ench = row.into_app_err("scan enchantment")?;
            by_equipment.entry(ench.equipment_id).or_default().push(ench);
        }
    }

    Ok(by_equipment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::seeded;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_only_latest_snapshot() {
        let conn = seeded();
        let set = load_equipment(&conn, &[1, 2]).unwrap();

        let items = &set.by_player[&1];
        assert!(items.iter().all(|i| i.snapshot_timestamp == 200));

        // ordered by slot type
        let slots: Vec<&str> = items.iter().map(|i| i.slot_type.as_str()).collect();
        assert_eq!(slots, ["HEAD", "NECK"]);

        let head = &items[0];
        assert_eq!(head.item_id, Some(5000));
        assert_eq!(head.icon.as_deref(), Some("inv_helm"));
        assert_eq!(head.item_type.as_deref(), Some("4"));

        // player 2 has no equipment
        assert!(!set.by_player.contains_key(&2));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_enchantments_attached_to_latest() {
        let conn = seeded();
        let set = load_equipment(&conn, &[1]).unwrap();

        let enchants = &set.enchantments[&200];
        assert_eq!(enchants.len(), 2);
        assert_eq!(enchants[0].slot_id, Some(0));
        assert_eq!(enchants[1].source_item_name.as_deref(), Some("Gem"));
        assert_eq!(enchants[1].gem_icon.as_deref(), Some("gem_red"));

        // enchantments of the older snapshot are not loaded
        assert!(!set.enchantments.contains_key(&100));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call into SQLite")]
    fn test_no_players() {
        let conn = seeded();
        let set = load_equipment(&conn, &[]).unwrap();
        assert!(set.by_player.is_empty());
        assert!(set.enchantments.is_empty());
    }
}
