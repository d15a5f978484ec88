use super::{ensure_schema, open_in_memory};
use rusqlite::Connection;

pub(crate) const FIXTURE: &str = "
INSERT INTO realms (id, slug, name, region, connected_realm_id, parent_realm_slug) VALUES
    (1, 'pagle', 'Pagle', 'us', 4385, NULL),
    (2, 'nazgrim', 'Nazgrim', 'us', 4388, 'pagle'),
    (3, 'everlook', 'Everlook', 'eu', 4440, NULL),
    (4, 'ook-ook', 'Ook-Ook', 'eu', 4441, NULL);

INSERT INTO dungeons (id, slug, name, map_challenge_mode_id) VALUES
    (2, 'scholomance', 'Scholomance', 2),
    (9, 'stormstout-brewery', 'Stormstout Brewery', 9);

INSERT INTO players (id, name, name_lower, realm_id) VALUES
    (1, 'Ook', 'ook', 1),
    (2, 'Eek', 'eek', 3),
    (3, 'Aak', 'aak', 2),
    (4, 'Uuk', 'uuk', 1);

INSERT INTO player_profiles (player_id, season_id, main_spec_id, dungeons_completed, total_runs,
                             combined_best_time, global_ranking, global_ranking_bracket,
                             has_complete_coverage, last_updated) VALUES
    (1, 1, 269, 9, 12, 1400000, 7, 'rare', 1, 1000),
    (1, 2, 269, 9, 30, 1500000, 4, 'epic', 1, 2000),
    (2, 1, 250, 9, 10, 1600000, 9, 'common', 1, 1000),
    (3, 1, 270, 3, 3, NULL, NULL, NULL, 0, 1000);

INSERT INTO player_details (player_id, race_name, class_name, active_spec_name, guild_name,
                            average_item_level, equipped_item_level, avatar_url) VALUES
    (1, 'Pandaren', 'Monk', 'Windwalker', 'Banana', 480, 478, 'https://example.test/ook.jpg');

INSERT INTO seasons (id, season_number, region, start_timestamp, end_timestamp, season_name) VALUES
    (1, 1, 'us', 100, 200, 'Season 1'),
    (2, 2, 'us', 300, NULL, 'Season 2'),
    (3, 1, 'eu', 90, 210, NULL);

INSERT INTO period_seasons (period_id, season_id) VALUES
    (1000, 1),
    (1034, 2);

INSERT INTO challenge_runs (id, duration, completed_timestamp, keystone_level, dungeon_id, realm_id,
                            period_id, team_signature, season_id) VALUES
    (11, 1200000, 5000, 1, 2, 1, 1034, '1,3', 2),
    (13, 1300000, 4000, 1, 2, 3, 1000, '2', 1),
    (20, 1400000, 6000, 1, 9, 1, 1034, '1', 2);

INSERT INTO run_members (run_id, player_id, spec_id) VALUES
    (11, 1, 269),
    (11, 3, 270),
    (13, 2, 250),
    (20, 1, 269);

INSERT INTO player_best_runs (player_id, dungeon_id, run_id, duration, season_id, completed_timestamp) VALUES
    (1, 2, 11, 1200000, 2, 5000),
    (1, 9, 20, 1400000, 2, 6000),
    (2, 2, 13, 1300000, 1, 4000);

INSERT INTO run_rankings (run_id, dungeon_id, ranking_type, ranking_scope, ranking, percentile_bracket, season_id) VALUES
    (11, 2, 'global', 'filtered', 5, 'legendary', 2),
    (11, 2, 'regional', 'us_filtered', 3, 'epic', 2),
    (13, 2, 'regional', 'eu_filtered', 1, 'artifact', 1);

INSERT INTO items (id, name, icon, type) VALUES
    (5000, 'Helm of Ook', 'inv_helm', 4),
    (5001, 'Gem', 'gem_red', 3);

INSERT INTO player_equipment (id, player_id, slot_type, item_id, upgrade_id, quality, item_name, snapshot_timestamp) VALUES
    (100, 1, 'HEAD', 4000, NULL, 'RARE', 'Old Helm', 100),
    (101, 1, 'NECK', 4001, NULL, 'RARE', 'Old Chain', 100),
    (200, 1, 'HEAD', 5000, 7, 'EPIC', 'Helm of Ook', 200),
    (201, 1, 'NECK', 5002, NULL, 'EPIC', 'Chain of Ook', 200);

INSERT INTO player_equipment_enchantments (equipment_id, enchantment_id, slot_id, slot_type, display_string,
                                           source_item_id, source_item_name, spell_id) VALUES
    (100, 3, 0, 'PERMANENT', 'Old enchant', NULL, NULL, NULL),
    (200, 4, 0, 'PERMANENT', 'Enchanted: +10 Agility', NULL, NULL, 555),
    (200, 5, 1, 'GEM', '+5 Haste', 5001, 'Gem', NULL);
";

/// In-memory store with the schema and a small fixture loaded.
pub(crate) fn seeded() -> Connection {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    conn.execute_batch(FIXTURE).unwrap();
    conn
}
