use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::blocking::SportBlock;
use crate::config::{ConflictResolution, ConflictStats, RawRecord, SourceKind};
use crate::consolidate::SportIdentities;
use crate::level::{compare_labels, standardize_label, LevelOrdering};
use crate::name_key::display_name;

/// All the observations of one identity in one year, merged across sources.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LinkedRecord {
    pub sport: String,
    pub canonical_name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub year: i32,
    /// Standardized level label, if any source supplied one.
    pub level: Option<String>,
    pub level_source: Option<SourceKind>,
    pub css: bool,
    pub sources: BTreeSet<SourceKind>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LinkResult {
    /// Sorted by canonical name, then year. One entry per (identity, year).
    pub records: Vec<LinkedRecord>,
    pub conflicts: Vec<ConflictStats>,
    pub nomination_only: usize,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref()
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Merges the consolidated records of one sport into one row per
/// (canonical identity, year).
///
/// Records are visited in input order, which is the source order. On a level
/// disagreement the higher level is kept; if the levels cannot be ordered the
/// earliest-seen level is kept. Both cases are reported.
pub fn link_sport(
    block: &SportBlock,
    records: &[RawRecord],
    identities: &SportIdentities,
) -> LinkResult {
    // The name parts of a canonical name come from the first record spelled that way.
    let mut parts_of: HashMap<String, (String, String)> = HashMap::new();
    for &idx in block.records.iter() {
        let r = &records[idx];
        parts_of
            .entry(display_name(&r.first_name, &r.last_name))
            .or_insert_with(|| (collapse(&r.first_name), collapse(&r.last_name)));
    }

    let mut linked: BTreeMap<(String, i32), LinkedRecord> = BTreeMap::new();
    let mut conflicts: Vec<ConflictStats> = Vec::new();

    for &idx in block.records.iter() {
        let r = &records[idx];
        let variant = display_name(&r.first_name, &r.last_name);
        let canonical = match identities.canonical_name(&variant) {
            Some(c) => c.clone(),
            None => {
                // Consolidation covers every variant of the block.
                warn!(
                    "link_sport: {:?}: no identity for {:?}, keeping it as its own",
                    block.sport, variant
                );
                variant.clone()
            }
        };
        let level = non_empty(&r.program_level).map(|l| standardize_label(&l));

        let entry = linked
            .entry((canonical.clone(), r.year))
            .or_insert_with(|| {
                let (first_name, last_name) = parts_of
                    .get(&canonical)
                    .cloned()
                    .unwrap_or_else(|| (collapse(&r.first_name), collapse(&r.last_name)));
                LinkedRecord {
                    sport: block.sport.clone(),
                    canonical_name: canonical.clone(),
                    first_name,
                    last_name,
                    gender: None,
                    date_of_birth: None,
                    year: r.year,
                    level: None,
                    level_source: None,
                    css: false,
                    sources: BTreeSet::new(),
                }
            });

        entry.sources.insert(r.source);
        entry.css |= r.css_flag;
        if entry.gender.is_none() {
            entry.gender = non_empty(&r.gender);
        }
        if entry.date_of_birth.is_none() {
            entry.date_of_birth = non_empty(&r.date_of_birth);
        }
        if let Some(new_level) = level {
            if let Some(conflict) = merge_level(entry, new_level, r.source) {
                conflicts.push(conflict);
            }
        }
    }

    let records: Vec<LinkedRecord> = linked.into_values().collect();

    let mut sources_by_identity: BTreeMap<&str, BTreeSet<SourceKind>> = BTreeMap::new();
    for lr in records.iter() {
        sources_by_identity
            .entry(lr.canonical_name.as_str())
            .or_default()
            .extend(lr.sources.iter().cloned());
    }
    let nomination_only = sources_by_identity
        .values()
        .filter(|s| s.len() == 1 && s.contains(&SourceKind::Nomination))
        .count();

    debug!(
        "link_sport: {:?}: {} rows, {} conflicts, {} nomination-only identities",
        block.sport,
        records.len(),
        conflicts.len(),
        nomination_only
    );

    LinkResult {
        records,
        conflicts,
        nomination_only,
    }
}

fn merge_level(
    entry: &mut LinkedRecord,
    new_level: String,
    source: SourceKind,
) -> Option<ConflictStats> {
    let (current, current_source) = match (entry.level.clone(), entry.level_source) {
        (Some(l), Some(s)) => (l, s),
        _ => {
            entry.level = Some(new_level);
            entry.level_source = Some(source);
            return None;
        }
    };
    if current == new_level {
        return None;
    }

    let conflict = |kept_level: &str,
                    kept_source: SourceKind,
                    rejected_level: &str,
                    rejected_source: SourceKind,
                    resolution: ConflictResolution| ConflictStats {
        sport: entry.sport.clone(),
        canonical_name: entry.canonical_name.clone(),
        year: entry.year,
        kept_level: kept_level.to_string(),
        kept_source,
        rejected_level: rejected_level.to_string(),
        rejected_source,
        resolution,
    };

    let res = match compare_labels(&new_level, &current) {
        LevelOrdering::Same => return None,
        LevelOrdering::Higher => conflict(
            &new_level,
            source,
            &current,
            current_source,
            ConflictResolution::HigherLevel,
        ),
        LevelOrdering::Lower => conflict(
            &current,
            current_source,
            &new_level,
            source,
            ConflictResolution::HigherLevel,
        ),
        LevelOrdering::Incomparable => conflict(
            &current,
            current_source,
            &new_level,
            source,
            ConflictResolution::Incomparable,
        ),
    };

    match res.resolution {
        ConflictResolution::HigherLevel => info!(
            "merge_level: {:?} {} {}: kept {:?} ({}) over {:?} ({})",
            res.sport,
            res.canonical_name,
            res.year,
            res.kept_level,
            res.kept_source.label(),
            res.rejected_level,
            res.rejected_source.label()
        ),
        ConflictResolution::Incomparable => warn!(
            "merge_level: {:?} {} {}: incomparable levels, kept earliest {:?} ({}) over {:?} ({})",
            res.sport,
            res.canonical_name,
            res.year,
            res.kept_level,
            res.kept_source.label(),
            res.rejected_level,
            res.rejected_source.label()
        ),
    }

    entry.level = Some(res.kept_level.clone());
    entry.level_source = Some(res.kept_source);
    Some(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::block_records;
    use crate::config::PipelineRules;
    use crate::consolidate::consolidate_sport;

    fn rec(source: SourceKind, first: &str, last: &str, year: i32, level: &str) -> RawRecord {
        RawRecord {
            source,
            sport: "Rowing".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            gender: None,
            date_of_birth: None,
            year,
            program_level: if level.is_empty() {
                None
            } else {
                Some(level.to_string())
            },
            css_flag: false,
        }
    }

    fn link(records: &[RawRecord]) -> LinkResult {
        let rules = PipelineRules::DEFAULT_RULES;
        let blocks = block_records(records, rules.blocking_strategy, rules.blocking_prefix_length);
        let ids = consolidate_sport(&blocks[0], records, &rules);
        link_sport(&blocks[0], records, &ids)
    }

    #[test]
    fn higher_level_wins_across_sources() {
        let records = vec![
            rec(SourceKind::Conversion, "Jon", "Smith", 2021, "Uncarded"),
            rec(SourceKind::Nomination, "Jon", "Smith", 2021, "SR1"),
        ];
        let res = link(&records);
        assert_eq!(res.records.len(), 1);
        assert_eq!(res.records[0].level, Some("SC Carded".to_string()));
        assert_eq!(res.records[0].level_source, Some(SourceKind::Nomination));
        assert_eq!(res.conflicts.len(), 1);
        assert_eq!(res.conflicts[0].resolution, ConflictResolution::HigherLevel);
        assert!(res.conflicts[0].is_cross_source());
    }

    #[test]
    fn incomparable_keeps_earliest_and_flags() {
        let records = vec![
            rec(SourceKind::Conversion, "Jon", "Smith", 2021, "Non-Targeted"),
            rec(SourceKind::CssRoster, "Jon", "Smith", 2021, "Prov Dev 3"),
        ];
        let res = link(&records);
        assert_eq!(res.records[0].level, Some("Non-Targeted".to_string()));
        assert_eq!(res.conflicts.len(), 1);
        assert_eq!(res.conflicts[0].resolution, ConflictResolution::Incomparable);
        assert_eq!(res.conflicts[0].rejected_level, "Prov Dev 3");
    }

    #[test]
    fn missing_level_is_not_a_conflict() {
        let records = vec![
            rec(SourceKind::Conversion, "Jon", "Smith", 2021, ""),
            rec(SourceKind::CssRoster, "Jon", "Smith", 2021, "PD2"),
            rec(SourceKind::Nomination, "Jon", "Smith", 2021, ""),
        ];
        let res = link(&records);
        assert_eq!(res.records[0].level, Some("Prov Dev 2".to_string()));
        assert!(res.conflicts.is_empty());
    }

    #[test]
    fn variants_fold_into_canonical_rows() {
        let records = vec![
            rec(SourceKind::Conversion, "Jon", "Smith", 2019, "Uncarded"),
            rec(SourceKind::Conversion, "Jon", "Smith", 2020, "Uncarded"),
            rec(SourceKind::CssRoster, "John", "Smith", 2020, "Uncarded"),
            rec(SourceKind::CssRoster, "Jon ", "Smith", 2018, "Prov Dev 3"),
        ];
        let res = link(&records);
        let years: Vec<i32> = res.records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2018, 2019, 2020]);
        assert!(res.records.iter().all(|r| r.canonical_name == "Jon Smith"));
        assert!(res.records.iter().all(|r| r.first_name == "Jon"));
        assert_eq!(res.records[2].sources.len(), 2);
    }

    #[test]
    fn nomination_only_identities_are_counted() {
        let records = vec![
            rec(SourceKind::Conversion, "Jon", "Smith", 2020, "Uncarded"),
            rec(SourceKind::Nomination, "Jon", "Smith", 2026, "Uncarded"),
            rec(SourceKind::Nomination, "Ana", "Lopez", 2026, "SC Carded"),
        ];
        let res = link(&records);
        assert_eq!(res.nomination_only, 1);
    }
}
