pub mod blocking;
pub mod builder;
mod config;
pub mod consolidate;
pub mod cross_sport;
pub mod level;
pub mod linker;
pub mod manual;
pub mod metrics;
pub mod name_key;
pub mod similarity;

use log::{debug, info, warn};
use rayon::prelude::*;

use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;

use crate::blocking::{block_records, SportBlock};
use crate::consolidate::{consolidate_sport, SportIdentities};
use crate::linker::{link_sport, LinkResult};
use crate::metrics::{annotate_sport, birth_year};

// **** Private structures ****

struct SportOutcome {
    identities: SportIdentities,
    link: LinkResult,
    rows: Vec<DatasetRow>,
    incomparable: Vec<IncomparableTransition>,
    stats: SportStats,
}

/// Runs the whole pipeline over a closed batch of records.
///
/// Arguments:
/// * `coll` the records of all the sources, in source order (earlier records
/// win incomparable level conflicts)
/// * `rules` the thresholds and options of this run
///
/// Row-level problems are counted in the summary. Only contract violations
/// are returned as errors.
pub fn run_pipeline(
    coll: &[RawRecord],
    rules: &PipelineRules,
) -> Result<PipelineResult, PipelineErrors> {
    info!(
        "run_pipeline: Processing {:?} records, rules: {:?}",
        coll.len(),
        rules
    );
    rules.validate()?;

    let records = checks(coll);
    let rejected_records = coll.len() - records.len();
    if records.is_empty() {
        return Err(PipelineErrors::EmptyInput);
    }

    let blocks = block_records(
        &records,
        rules.blocking_strategy,
        rules.blocking_prefix_length,
    );
    info!("run_pipeline: {} sport partitions", blocks.len());

    // Sports never share identity state: each partition is independent.
    let outcomes: Vec<SportOutcome> = if rules.parallel {
        blocks
            .par_iter()
            .map(|b| process_sport(b, &records, rules))
            .collect::<Result<Vec<SportOutcome>, PipelineErrors>>()?
    } else {
        blocks
            .iter()
            .map(|b| process_sport(b, &records, rules))
            .collect::<Result<Vec<SportOutcome>, PipelineErrors>>()?
    };

    let mut summary = RunSummary {
        input_records: coll.len(),
        rejected_records,
        ..RunSummary::default()
    };
    let mut rows: Vec<DatasetRow> = Vec::new();
    for outcome in outcomes {
        summary.sports.push(outcome.stats);
        summary.merges.extend(outcome.identities.merges);
        summary
            .ambiguous_pairs
            .extend(outcome.identities.ambiguous_pairs);
        summary.conflicts.extend(outcome.link.conflicts);
        summary.nomination_only_identities += outcome.link.nomination_only;
        summary.incomparable_transitions.extend(outcome.incomparable);
        rows.extend(outcome.rows);
    }

    if rules.link_across_sports {
        let (links, ambiguities) = cross_sport::link_across_sports(&mut rows);
        summary.cross_sport_links = links;
        summary.cross_sport_ambiguities = ambiguities;
        rows.sort_by(|a, b| {
            (a.sport.as_str(), a.full_name.as_str(), a.year).cmp(&(
                b.sport.as_str(),
                b.full_name.as_str(),
                b.year,
            ))
        });
    }

    verify_dataset(&rows)?;
    fill_statistics(&mut summary, &rows);
    summary.fingerprint = dataset_fingerprint(&rows);

    info!(
        "run_pipeline: {} rows, {} identities merged away, {} conflicts ({} cross-source), {} unmapped and {} missing level transitions, {} ambiguous pairs",
        summary.rows,
        summary.merges.len(),
        summary.conflicts.len(),
        summary.cross_source_conflict_count(),
        summary.unmapped_level_count(),
        summary.missing_level_count(),
        summary.ambiguous_pairs.len()
    );

    Ok(PipelineResult { rows, summary })
}

// Drops the records that cannot be attached to an identity.
fn checks(coll: &[RawRecord]) -> Vec<RawRecord> {
    let mut res: Vec<RawRecord> = Vec::with_capacity(coll.len());
    for r in coll.iter() {
        if r.sport.trim().is_empty() {
            warn!("checks: record without sport, skipping: {:?}", r);
        } else if r.first_name.trim().is_empty() && r.last_name.trim().is_empty() {
            warn!("checks: record without name, skipping: {:?}", r);
        } else {
            res.push(r.clone());
        }
    }
    debug!("checks: {} of {} records kept", res.len(), coll.len());
    res
}

fn process_sport(
    block: &SportBlock,
    records: &[RawRecord],
    rules: &PipelineRules,
) -> Result<SportOutcome, PipelineErrors> {
    let identities = consolidate_sport(block, records, rules);
    let link = link_sport(block, records, &identities);
    let (rows, incomparable) = annotate_sport(&link.records, rules.convert_rule)?;
    let raw_names: BTreeSet<&String> = identities.canonical_of.keys().collect();
    let stats = SportStats {
        sport: block.sport.clone(),
        records: block.records.len(),
        raw_names: raw_names.len(),
        identities: identities.classes.len(),
        buckets: block.buckets.len(),
        comparisons: identities.comparisons,
    };
    Ok(SportOutcome {
        identities,
        link,
        rows,
        incomparable,
        stats,
    })
}

/// Checks the metric invariants on the final rows.
///
/// For every identity: one row per year, the same Years Targeted on every
/// row and equal to the number of years, and N on the first year.
pub fn verify_dataset(rows: &[DatasetRow]) -> Result<(), PipelineErrors> {
    let mut by_identity: BTreeMap<(&str, &str), Vec<&DatasetRow>> = BTreeMap::new();
    for row in rows.iter() {
        by_identity
            .entry((row.sport.as_str(), row.full_name.as_str()))
            .or_default()
            .push(row);
    }
    for ((sport, name), group) in by_identity.iter() {
        let fail = |detail: String| PipelineErrors::InconsistentMetrics {
            sport: sport.to_string(),
            name: name.to_string(),
            detail,
        };
        let years: BTreeSet<i32> = group.iter().map(|r| r.year).collect();
        if years.len() != group.len() {
            return Err(fail("several rows share a year".to_string()));
        }
        let targeted: BTreeSet<u32> = group.iter().map(|r| r.years_targeted).collect();
        if targeted.len() != 1 || !targeted.contains(&(years.len() as u32)) {
            return Err(fail(format!(
                "Years_Targeted {:?} for {} distinct years",
                targeted,
                years.len()
            )));
        }
        if let Some(first) = group.iter().min_by_key(|r| r.year) {
            if first.convert_year != ConvertFlag::No {
                return Err(fail(format!("first year {} is not N", first.year)));
            }
        }
    }
    Ok(())
}

fn fill_statistics(summary: &mut RunSummary, rows: &[DatasetRow]) {
    summary.rows = rows.len();
    summary.convert_yes = rows
        .iter()
        .filter(|r| r.convert_year == ConvertFlag::Yes)
        .count();
    if !rows.is_empty() {
        summary.average_years_targeted =
            rows.iter().map(|r| r.years_targeted as f64).sum::<f64>() / rows.len() as f64;
    }
    summary.rows_missing_dob = rows
        .iter()
        .filter(|r| r.date_of_birth.as_deref().and_then(birth_year).is_none())
        .count();

    // Rows are grouped by identity and sorted by year within a sport.
    let mut first_conversions: BTreeMap<i32, usize> = BTreeMap::new();
    let mut entry_ages: Vec<i32> = Vec::new();
    for group in rows.chunk_by(|a, b| a.sport == b.sport && a.full_name == b.full_name) {
        if let Some(first_y) = group.iter().find(|r| r.convert_year == ConvertFlag::Yes) {
            *first_conversions.entry(first_y.year).or_insert(0) += 1;
        }
        let born = group
            .iter()
            .find_map(|r| r.date_of_birth.as_deref().and_then(birth_year));
        if let Some(born) = born {
            entry_ages.push(group[0].year - born);
        }
    }
    summary.first_conversion_years = first_conversions.into_iter().collect();
    if !entry_ages.is_empty() {
        summary.mean_entry_age =
            Some(entry_ages.iter().map(|a| *a as f64).sum::<f64>() / entry_ages.len() as f64);
    }
}

/// A SHA-256 digest of the dataset rows, identifying one version of the dataset.
pub fn dataset_fingerprint(rows: &[DatasetRow]) -> String {
    let mut text = String::new();
    for r in rows.iter() {
        let fields = [
            r.sport.as_str(),
            r.first_name.as_str(),
            r.last_name.as_str(),
            r.gender.as_deref().unwrap_or(""),
            r.date_of_birth.as_deref().unwrap_or(""),
            &r.year.to_string(),
            r.program.as_deref().unwrap_or(""),
            r.full_name.as_str(),
            if r.css { "YES" } else { "NO" },
            &r.years_targeted.to_string(),
            r.convert_year.as_str(),
        ]
        .join("\u{1f}");
        text.push_str(&fields);
        text.push('\n');
    }
    sha256::digest(text)
}
