//! Game-domain reference data and pure helpers.
//!
//! Nothing in here performs I/O. Realm aliasing is driven by configuration;
//! everything else is static tables or string transforms.

mod bracket;
mod dungeons;
mod realms;
mod region;
mod signature;
mod slug;
mod specs;

pub use bracket::Bracket;
pub use dungeons::{DUNGEONS, DungeonInfo, SHORT_NAMES, ShortNames, acronym};
pub use realms::{REALMS, RealmAliases, RealmInfo, find_realm, normalize_realm_slug, realms_in};
pub use region::Region;
pub use signature::team_signature;
pub use slug::{safe_slug_name, slugify};
pub use specs::{CLASSES, ClassInfo, SpecInfo, class_id_for_spec, fill_class_and_spec, sorted_spec_names, spec_info};
