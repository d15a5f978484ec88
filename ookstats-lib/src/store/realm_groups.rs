use crate::Result;
use crate::wow::RealmAliases;
use ohno::IntoAppError;
use rusqlite::{Connection, params};
use std::collections::HashMap;

const LOG_TARGET: &str = "     store";

/// Replace the contents of `realm_groups` with the configured merges.
///
/// Only mappings whose child and parent both exist in `realms` are written.
/// Returns the number of groups inserted.
pub fn sync_realm_groups(conn: &mut Connection, aliases: &RealmAliases) -> Result<usize> {
    let tx = conn.transaction().into_app_err("begin realm group sync")?;

    let _ = tx.execute("DELETE FROM realm_groups", []).into_app_err("failed clearing realm_groups")?;

    let mut known: HashMap<(String, String), i64> = HashMap::new();
    {
        let mut stmt = tx
            .prepare("SELECT id, slug, region FROM realms")
            .into_app_err("failed loading realms for mapping")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .into_app_err("failed loading realms for mapping")?;

        for row in rows {
            let (id, slug, region) = row.into_app_err("scan realm")?;
            let _ = known.insert((region.trim().to_lowercase(), slug.trim().to_lowercase()), id);
        }
    }

    let mut inserted = 0;
    for (region, child, parent) in aliases.pairs() {
        let child_id = known.get(&(region.to_string(), child.to_string()));
        let parent_id = known.get(&(region.to_string(), parent.to_string()));
        let (Some(child_id), Some(parent_id)) = (child_id, parent_id) else {
            log::debug!(target: LOG_TARGET, "skipping realm group {region}/{child} -> {parent}: realm not in store");
            continue;
        };

        let _ = tx
            .execute(
                "INSERT INTO realm_groups (child_realm_id, parent_realm_id) VALUES (?1, ?2)",
                params![child_id, parent_id],
            )
            .into_app_err_with(|| format!("failed inserting realm group for {child} -> {parent}"))?;
        inserted += 1;
    }

    tx.commit().into_app_err("commit realm group sync")?;
    log::info!(target: LOG_TARGET, "synced {inserted} realm groups");
    Ok(inserted)
}
