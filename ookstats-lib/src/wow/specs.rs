//! Specialization and class reference data.

/// A playable class and its specializations.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub id: u32,
    /// Path-friendly key (`death_knight`).
    pub key: &'static str,
    pub name: &'static str,
    pub specs: &'static [(u32, &'static str)],
}

/// Classes ordered by class id.
pub const CLASSES: &[ClassInfo] = &[
    ClassInfo { id: 1, key: "warrior", name: "Warrior", specs: &[(71, "Arms"), (72, "Fury"), (73, "Protection")] },
    ClassInfo { id: 2, key: "paladin", name: "Paladin", specs: &[(65, "Holy"), (66, "Protection"), (70, "Retribution")] },
    ClassInfo {
        id: 3,
        key: "hunter",
        name: "Hunter",
        specs: &[(253, "Beast Mastery"), (254, "Marksmanship"), (255, "Survival")],
    },
    ClassInfo {
        id: 4,
        key: "rogue",
        name: "Rogue",
        specs: &[(259, "Assassination"), (260, "Outlaw"), (261, "Subtlety")],
    },
    ClassInfo { id: 5, key: "priest", name: "Priest", specs: &[(256, "Discipline"), (257, "Holy"), (258, "Shadow")] },
    ClassInfo { id: 6, key: "death_knight", name: "Death Knight", specs: &[(250, "Blood"), (251, "Frost"), (252, "Unholy")] },
    ClassInfo {
        id: 7,
        key: "shaman",
        name: "Shaman",
        specs: &[(262, "Elemental"), (263, "Enhancement"), (264, "Restoration")],
    },
    ClassInfo { id: 8, key: "mage", name: "Mage", specs: &[(62, "Arcane"), (63, "Fire"), (64, "Frost")] },
    ClassInfo {
        id: 9,
        key: "warlock",
        name: "Warlock",
        specs: &[(265, "Affliction"), (266, "Demonology"), (267, "Destruction")],
    },
    ClassInfo { id: 10, key: "monk", name: "Monk", specs: &[(268, "Brewmaster"), (269, "Windwalker"), (270, "Mistweaver")] },
    ClassInfo {
        id: 11,
        key: "druid",
        name: "Druid",
        specs: &[(102, "Balance"), (103, "Feral"), (104, "Guardian"), (105, "Restoration")],
    },
];

/// Resolved class and spec for a spec id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecInfo {
    pub class_id: u32,
    pub class_name: &'static str,
    pub spec_name: &'static str,
}

/// Look up the class and spec names for a vendor spec id.
#[must_use]
pub fn spec_info(spec_id: i64) -> Option<SpecInfo> {
    CLASSES.iter().find_map(|class| {
        class.specs.iter().find(|(id, _)| i64::from(*id) == spec_id).map(|&(_, spec_name)| SpecInfo {
            class_id: class.id,
            class_name: class.name,
            spec_name,
        })
    })
}

/// Numeric class id owning `spec_id`.
#[must_use]
pub fn class_id_for_spec(spec_id: i64) -> Option<u32> {
    spec_info(spec_id).map(|info| info.class_id)
}

/// Fill in whichever of `class_name` / `spec_name` is empty using `spec_id`.
///
/// Fields that are already populated are left alone, as is everything when
/// the spec id is absent or unknown.
pub fn fill_class_and_spec(class_name: &mut String, spec_name: &mut String, spec_id: Option<i64>) {
    if !class_name.is_empty() && !spec_name.is_empty() {
        return;
    }

    let Some(info) = spec_id.and_then(spec_info) else {
        return;
    };

    if class_name.is_empty() {
        info.class_name.clone_into(class_name);
    }
    if spec_name.is_empty() {
        info.spec_name.clone_into(spec_name);
    }
}

/// Spec names of a class, sorted by name.
#[must_use]
pub fn sorted_spec_names(class: &ClassInfo) -> Vec<&'static str> {
    let mut names: Vec<_> = class.specs.iter().map(|(_, name)| *name).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lookup() {
        let info = spec_info(250).unwrap();
        assert_eq!(info.class_name, "Death Knight");
        assert_eq!(info.spec_name, "Blood");
        assert_eq!(info.class_id, 6);

        assert_eq!(spec_info(105).unwrap().spec_name, "Restoration");
        assert!(spec_info(9999).is_none());
    }

    #[test]
    fn test_class_id_for_spec() {
        assert_eq!(class_id_for_spec(73), Some(1));
        assert_eq!(class_id_for_spec(270), Some(10));
        assert_eq!(class_id_for_spec(102), Some(11));
        assert_eq!(class_id_for_spec(1), None);
    }

    #[test]
    fn test_fill_only_missing_fields() {
        let mut class = String::new();
        let mut spec = "Custom".to_string();
        fill_class_and_spec(&mut class, &mut spec, Some(64));
        assert_eq!(class, "Mage");
        assert_eq!(spec, "Custom");
    }

    #[test]
    fn test_fill_without_spec_id_is_noop() {
        let mut class = String::new();
        let mut spec = String::new();
        fill_class_and_spec(&mut class, &mut spec, None);
        assert!(class.is_empty());
        assert!(spec.is_empty());

        fill_class_and_spec(&mut class, &mut spec, Some(12345));
        assert!(class.is_empty());
    }

    #[test]
    fn test_classes_ordered_and_complete() {
        let ids: Vec<_> = CLASSES.iter().map(|c| c.id).collect();
        assert_eq!(ids, (1..=11).collect::<Vec<_>>());
        let spec_count: usize = CLASSES.iter().map(|c| c.specs.len()).sum();
        assert_eq!(spec_count, 34);
    }

    #[test]
    fn test_sorted_spec_names() {
        let monk = CLASSES.iter().find(|c| c.key == "monk").unwrap();
        assert_eq!(sorted_spec_names(monk), vec!["Brewmaster", "Mistweaver", "Windwalker"]);
    }
}
