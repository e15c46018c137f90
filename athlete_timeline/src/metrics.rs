use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::config::{
    ConvertFlag, ConvertRule, DatasetRow, IncomparableReason, IncomparableTransition,
    PipelineErrors,
};
use crate::level::{compare_labels, LevelOrdering, ProgramLevel};
use crate::linker::LinkedRecord;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TimelineEntry {
    pub year: i32,
    pub level: Option<String>,
}

/// The ordered levels of one identity in one sport.
///
/// Invariant: at least one entry, years strictly increasing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Timeline {
    pub sport: String,
    pub canonical_name: String,
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Builds a timeline from observations in the order they were seen.
    ///
    /// Observations sharing a year are collapsed into the highest level of
    /// that year. Ties and incomparable levels keep the first-seen one.
    pub fn new(
        sport: &str,
        canonical_name: &str,
        observations: &[(i32, Option<String>)],
    ) -> Result<Timeline, PipelineErrors> {
        if observations.is_empty() {
            return Err(PipelineErrors::EmptyTimeline {
                sport: sport.to_string(),
                name: canonical_name.to_string(),
            });
        }
        let mut sorted: Vec<&(i32, Option<String>)> = observations.iter().collect();
        // Stable: observations of one year stay in the order they were seen.
        sorted.sort_by_key(|(year, _)| *year);

        let mut entries: Vec<TimelineEntry> = Vec::new();
        for (year, level) in sorted {
            match entries.last_mut() {
                Some(last) if last.year == *year => {
                    let replace = match (&last.level, level) {
                        (None, Some(_)) => true,
                        (Some(cur), Some(new)) => {
                            compare_labels(new, cur) == LevelOrdering::Higher
                        }
                        _ => false,
                    };
                    if replace {
                        last.level = level.clone();
                    }
                }
                _ => entries.push(TimelineEntry {
                    year: *year,
                    level: level.clone(),
                }),
            }
        }
        Ok(Timeline {
            sport: sport.to_string(),
            canonical_name: canonical_name.to_string(),
            entries,
        })
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// The number of distinct years.
    pub fn years_targeted(&self) -> u32 {
        self.entries.len() as u32
    }

    fn check(&self) -> Result<(), PipelineErrors> {
        if self.entries.is_empty() {
            return Err(PipelineErrors::EmptyTimeline {
                sport: self.sport.clone(),
                name: self.canonical_name.clone(),
            });
        }
        if self.entries.windows(2).any(|w| w[0].year >= w[1].year) {
            return Err(PipelineErrors::TimelineOrder {
                sport: self.sport.clone(),
                name: self.canonical_name.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TimelineMetrics {
    /// Same value for every row of the identity.
    pub years_targeted: u32,
    /// One flag per timeline entry.
    pub convert: Vec<ConvertFlag>,
    pub incomparable: Vec<IncomparableTransition>,
}

fn reason_of(level: &Option<String>) -> Option<IncomparableReason> {
    match level {
        None => Some(IncomparableReason::Missing),
        Some(l) if ProgramLevel::parse(l).is_none() => {
            Some(IncomparableReason::Unmapped(l.clone()))
        }
        Some(_) => None,
    }
}

/// Computes Years Targeted and the Convert Year flags of a timeline.
///
/// The first year is always N. A transition involving a missing or unmapped
/// level is N and reported as incomparable.
pub fn annotate(timeline: &Timeline, rule: ConvertRule) -> Result<TimelineMetrics, PipelineErrors> {
    timeline.check()?;
    let entries = timeline.entries();
    let mut convert: Vec<ConvertFlag> = vec![ConvertFlag::No];
    let mut incomparable: Vec<IncomparableTransition> = Vec::new();

    for i in 1..entries.len() {
        let current = &entries[i];
        let outcome: Result<bool, IncomparableReason> = match rule {
            ConvertRule::PrecedingYear => {
                let previous = &entries[i - 1];
                match reason_of(&current.level).or_else(|| reason_of(&previous.level)) {
                    Some(reason) => Err(reason),
                    None => match (&current.level, &previous.level) {
                        (Some(c), Some(p)) => Ok(compare_labels(c, p) == LevelOrdering::Higher),
                        _ => Err(IncomparableReason::Missing),
                    },
                }
            }
            ConvertRule::AnyPriorYear => {
                let lowest_prior: Option<ProgramLevel> = entries[..i]
                    .iter()
                    .filter_map(|e| e.level.as_deref().and_then(ProgramLevel::parse))
                    .min();
                match (reason_of(&current.level), lowest_prior) {
                    (Some(reason), _) => Err(reason),
                    (None, None) => Err(reason_of(&entries[i - 1].level)
                        .unwrap_or(IncomparableReason::Missing)),
                    (None, Some(lowest)) => Ok(current
                        .level
                        .as_deref()
                        .and_then(ProgramLevel::parse)
                        .map(|c| c > lowest)
                        .unwrap_or(false)),
                }
            }
        };
        match outcome {
            Ok(true) => convert.push(ConvertFlag::Yes),
            Ok(false) => convert.push(ConvertFlag::No),
            Err(reason) => {
                warn!(
                    "annotate: {:?} {} {}: incomparable transition ({:?}), labelled N",
                    timeline.sport, timeline.canonical_name, current.year, reason
                );
                incomparable.push(IncomparableTransition {
                    sport: timeline.sport.clone(),
                    canonical_name: timeline.canonical_name.clone(),
                    year: current.year,
                    reason,
                });
                convert.push(ConvertFlag::No);
            }
        }
    }

    Ok(TimelineMetrics {
        years_targeted: timeline.years_targeted(),
        convert,
        incomparable,
    })
}

/// Annotates the linked rows of one sport and turns them into dataset rows.
///
/// The linked rows must be sorted by canonical name, then year.
pub fn annotate_sport(
    linked: &[LinkedRecord],
    rule: ConvertRule,
) -> Result<(Vec<DatasetRow>, Vec<IncomparableTransition>), PipelineErrors> {
    let mut rows: Vec<DatasetRow> = Vec::with_capacity(linked.len());
    let mut incomparable: Vec<IncomparableTransition> = Vec::new();

    for group in linked.chunk_by(|a, b| a.canonical_name == b.canonical_name) {
        let head = &group[0];
        let observations: Vec<(i32, Option<String>)> =
            group.iter().map(|lr| (lr.year, lr.level.clone())).collect();
        let timeline = Timeline::new(&head.sport, &head.canonical_name, &observations)?;
        if timeline.entries().len() != group.len() {
            // The linker emits one row per year.
            return Err(PipelineErrors::TimelineOrder {
                sport: head.sport.clone(),
                name: head.canonical_name.clone(),
            });
        }
        let m = annotate(&timeline, rule)?;
        debug!(
            "annotate_sport: {:?} {}: {} years, flags {:?}",
            head.sport,
            head.canonical_name,
            m.years_targeted,
            m.convert.iter().map(|c| c.as_str()).collect::<Vec<&str>>()
        );
        for (lr, flag) in group.iter().zip(m.convert.iter()) {
            rows.push(DatasetRow {
                sport: lr.sport.clone(),
                first_name: lr.first_name.clone(),
                last_name: lr.last_name.clone(),
                gender: lr.gender.clone(),
                date_of_birth: lr.date_of_birth.clone(),
                year: lr.year,
                program: lr.level.clone(),
                full_name: lr.canonical_name.clone(),
                css: lr.css,
                years_targeted: m.years_targeted,
                convert_year: *flag,
            });
        }
        incomparable.extend(m.incomparable);
    }
    Ok((rows, incomparable))
}

/// Date layouts found in the rosters, tried in order.
const DOB_LAYOUTS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

/// The year of birth of a date string, if it parses as one of the known layouts.
///
/// A time part (`2004-05-17 00:00:00`) is ignored.
pub fn birth_year(date_of_birth: &str) -> Option<i32> {
    let s = date_of_birth.trim();
    let date = DOB_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(s, layout).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })?;
    Some(date.year()).filter(|y| (1900..=2100).contains(y))
}
