/// The program levels, from lowest to highest.
///
/// This is the only ordering used to detect conversions. Labels that do not
/// map onto one of these variants are unordered.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ProgramLevel {
    ProvDev3,
    ProvDev2,
    ProvDev1,
    Uncarded,
    ScCarded,
}

// Lower-cased aliases, as found in the nomination and CSS rosters.
const ALIASES: &[(&str, ProgramLevel)] = &[
    ("prov dev 3", ProgramLevel::ProvDev3),
    ("pd3", ProgramLevel::ProvDev3),
    ("prov dev 2", ProgramLevel::ProvDev2),
    ("pd2", ProgramLevel::ProvDev2),
    ("prov dev 1", ProgramLevel::ProvDev1),
    ("pd1", ProgramLevel::ProvDev1),
    ("uncarded", ProgramLevel::Uncarded),
    ("sc carded", ProgramLevel::ScCarded),
    // Sport Canada carding codes
    ("d", ProgramLevel::ScCarded),
    ("di", ProgramLevel::ScCarded),
    ("sr", ProgramLevel::ScCarded),
    ("sr1", ProgramLevel::ScCarded),
    ("sr2", ProgramLevel::ScCarded),
    ("sri", ProgramLevel::ScCarded),
    ("c1", ProgramLevel::ScCarded),
];

impl ProgramLevel {
    pub const ALL: [ProgramLevel; 5] = [
        ProgramLevel::ProvDev3,
        ProgramLevel::ProvDev2,
        ProgramLevel::ProvDev1,
        ProgramLevel::Uncarded,
        ProgramLevel::ScCarded,
    ];

    /// Maps a raw label onto a level. Case and surrounding whitespace are ignored.
    pub fn parse(label: &str) -> Option<ProgramLevel> {
        let cleaned: String = label
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ")
            .to_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == cleaned)
            .map(|(_, level)| *level)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgramLevel::ProvDev3 => "Prov Dev 3",
            ProgramLevel::ProvDev2 => "Prov Dev 2",
            ProgramLevel::ProvDev1 => "Prov Dev 1",
            ProgramLevel::Uncarded => "Uncarded",
            ProgramLevel::ScCarded => "SC Carded",
        }
    }
}

/// The canonical spelling of a label if it is mapped, the trimmed label otherwise.
pub fn standardize_label(label: &str) -> String {
    match ProgramLevel::parse(label) {
        Some(level) => level.label().to_string(),
        None => label.trim().to_string(),
    }
}

/// Retired athletes are listed in the nomination roster but are not targeted.
pub fn is_retired_label(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case("gameplan retired")
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum LevelOrdering {
    Lower,
    Same,
    Higher,
    Incomparable,
}

/// Compares `current` against `previous`.
pub fn compare_labels(current: &str, previous: &str) -> LevelOrdering {
    match (ProgramLevel::parse(current), ProgramLevel::parse(previous)) {
        (Some(c), Some(p)) if c > p => LevelOrdering::Higher,
        (Some(c), Some(p)) if c < p => LevelOrdering::Lower,
        (Some(_), Some(_)) => LevelOrdering::Same,
        _ => LevelOrdering::Incomparable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        for pair in ProgramLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn aliases_are_standardized() {
        assert_eq!(ProgramLevel::parse("Prov dev 1"), Some(ProgramLevel::ProvDev1));
        assert_eq!(ProgramLevel::parse("Uncarded "), Some(ProgramLevel::Uncarded));
        assert_eq!(ProgramLevel::parse("SR2"), Some(ProgramLevel::ScCarded));
        assert_eq!(ProgramLevel::parse("PD3"), Some(ProgramLevel::ProvDev3));
        assert_eq!(standardize_label(" sc  carded"), "SC Carded");
        assert_eq!(standardize_label(" Non-Targeted "), "Non-Targeted");
    }

    #[test]
    fn unknown_labels_are_incomparable() {
        assert_eq!(ProgramLevel::parse("Non-Targeted"), None);
        assert_eq!(
            compare_labels("Uncarded", "Non-Targeted"),
            LevelOrdering::Incomparable
        );
        assert_eq!(compare_labels("SC Carded", "Uncarded"), LevelOrdering::Higher);
        assert_eq!(compare_labels("Prov Dev 3", "Prov Dev 1"), LevelOrdering::Lower);
        assert_eq!(compare_labels("pd2", "Prov Dev 2"), LevelOrdering::Same);
    }

    #[test]
    fn retired_marker() {
        assert!(is_retired_label("GamePlan Retired"));
        assert!(is_retired_label("Gameplan retired "));
        assert!(!is_retired_label("Uncarded"));
    }
}
