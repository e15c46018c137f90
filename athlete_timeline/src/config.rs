// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The table a record was read from.
///
/// The order of the variants is the order in which sources are merged by
/// the command line tool. When two sources disagree on an incomparable level,
/// the earliest-seen record wins.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SourceKind {
    /// Historical conversion records.
    Conversion,
    /// The CSS participation roster.
    CssRoster,
    /// The nomination roster.
    Nomination,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Conversion => "conversion",
            SourceKind::CssRoster => "css",
            SourceKind::Nomination => "nomination",
        }
    }
}

/// One row of a source table, already mapped to the shared schema.
///
/// `sport` and `year` are required. Everything else may be missing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRecord {
    pub source: SourceKind,
    pub sport: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub year: i32,
    pub program_level: Option<String>,
    pub css_flag: bool,
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ConvertFlag {
    Yes,
    No,
}

impl ConvertFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvertFlag::Yes => "Y",
            ConvertFlag::No => "N",
        }
    }
}

/// One row of the persisted dataset: one per (canonical identity, sport, year).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DatasetRow {
    pub sport: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub year: i32,
    pub program: Option<String>,
    /// The canonical name of the identity.
    pub full_name: String,
    pub css: bool,
    pub years_targeted: u32,
    pub convert_year: ConvertFlag,
}

/// A name variant folded into a canonical name.
#[derive(PartialEq, Debug, Clone)]
pub struct MergeStats {
    pub sport: String,
    pub variant: String,
    pub canonical_name: String,
    pub records: usize,
}

/// A pair of names that scored just below the threshold. Left unmerged.
#[derive(PartialEq, Debug, Clone)]
pub struct AmbiguousPair {
    pub sport: String,
    pub first: String,
    pub second: String,
    pub score: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ConflictResolution {
    /// Both levels are ordered: the higher one was kept.
    HigherLevel,
    /// At least one level is not ordered: the earliest-seen one was kept.
    Incomparable,
}

/// Two records for the same identity, sport and year with different levels.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ConflictStats {
    pub sport: String,
    pub canonical_name: String,
    pub year: i32,
    pub kept_level: String,
    pub kept_source: SourceKind,
    pub rejected_level: String,
    pub rejected_source: SourceKind,
    pub resolution: ConflictResolution,
}

impl ConflictStats {
    pub fn is_cross_source(&self) -> bool {
        self.kept_source != self.rejected_source
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum IncomparableReason {
    /// A level label outside of the known ordinal set.
    Unmapped(String),
    /// No level recorded for that year.
    Missing,
}

/// A year-over-year transition that could not be ordered. Always labelled N.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IncomparableTransition {
    pub sport: String,
    pub canonical_name: String,
    pub year: i32,
    pub reason: IncomparableReason,
}

/// Identities from different sports that were explicitly linked.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossSportLink {
    pub full_name: String,
    pub date_of_birth: String,
    pub sports: Vec<String>,
    pub variants: Vec<String>,
}

/// Identities sharing a name key and a date of birth that were left unlinked
/// because one sport holds several of them.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossSportAmbiguity {
    pub date_of_birth: String,
    /// The sports that hold more than one of the identities.
    pub repeated_sports: Vec<String>,
    /// (sport, full name) of every identity of the group.
    pub identities: Vec<(String, String)>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SportStats {
    pub sport: String,
    pub records: usize,
    pub raw_names: usize,
    pub identities: usize,
    pub buckets: usize,
    pub comparisons: usize,
}

/// Run-level counts for operator review.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RunSummary {
    pub input_records: usize,
    pub rejected_records: usize,
    pub sports: Vec<SportStats>,
    pub merges: Vec<MergeStats>,
    pub ambiguous_pairs: Vec<AmbiguousPair>,
    pub conflicts: Vec<ConflictStats>,
    pub incomparable_transitions: Vec<IncomparableTransition>,
    pub nomination_only_identities: usize,
    pub cross_sport_links: Vec<CrossSportLink>,
    pub cross_sport_ambiguities: Vec<CrossSportAmbiguity>,
    pub rows: usize,
    pub convert_yes: usize,
    pub average_years_targeted: f64,
    /// (year, number of identities whose first Y falls in that year), sorted by year.
    pub first_conversion_years: Vec<(i32, usize)>,
    pub rows_missing_dob: usize,
    /// Mean age during the first targeted year, over identities with a usable DOB.
    pub mean_entry_age: Option<f64>,
    pub fingerprint: String,
}

impl RunSummary {
    pub fn unmapped_level_count(&self) -> usize {
        self.incomparable_transitions
            .iter()
            .filter(|t| matches!(t.reason, IncomparableReason::Unmapped(_)))
            .count()
    }

    pub fn missing_level_count(&self) -> usize {
        self.incomparable_transitions
            .iter()
            .filter(|t| t.reason == IncomparableReason::Missing)
            .count()
    }

    pub fn cross_source_conflict_count(&self) -> usize {
        self.conflicts.iter().filter(|c| c.is_cross_source()).count()
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct PipelineResult {
    pub rows: Vec<DatasetRow>,
    pub summary: RunSummary,
}

/// Errors that prevent the pipeline from completing.
///
/// Data-quality problems on single rows or identities are not errors, they
/// are reported in the [RunSummary]. These variants are contract violations.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineErrors {
    EmptyInput,
    InvalidRules(String),
    EmptyTimeline { sport: String, name: String },
    TimelineOrder { sport: String, name: String },
    InconsistentMetrics {
        sport: String,
        name: String,
        detail: String,
    },
}

impl Error for PipelineErrors {}

impl Display for PipelineErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineErrors::EmptyInput => write!(f, "no usable record in the input"),
            PipelineErrors::InvalidRules(msg) => write!(f, "invalid rules: {}", msg),
            PipelineErrors::EmptyTimeline { sport, name } => {
                write!(f, "empty timeline for {} ({})", name, sport)
            }
            PipelineErrors::TimelineOrder { sport, name } => {
                write!(f, "timeline years not strictly increasing for {} ({})", name, sport)
            }
            PipelineErrors::InconsistentMetrics {
                sport,
                name,
                detail,
            } => write!(f, "inconsistent metrics for {} ({}): {}", name, sport, detail),
        }
    }
}

// ********* Configuration **********

/// How the blocking key is derived from a name.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BlockingStrategy {
    /// The first characters of the normalized last name. A misspelled first
    /// letter of the first name is still caught.
    LastNamePrefix,
    /// The first characters of the normalized full name.
    FullNamePrefix,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ConvertRule {
    /// Strict increase versus the immediately preceding recorded year.
    PrecedingYear,
    /// Strict increase versus any earlier recorded year.
    AnyPriorYear,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PipelineRules {
    /// Inclusive: a pair scoring exactly at the threshold is merged.
    pub similarity_threshold: f64,
    /// Pairs in [threshold - margin, threshold) are reported as ambiguous.
    pub ambiguity_margin: f64,
    pub blocking_prefix_length: usize,
    pub blocking_strategy: BlockingStrategy,
    pub convert_rule: ConvertRule,
    pub link_across_sports: bool,
    /// Process the sport partitions on the rayon thread pool.
    pub parallel: bool,
}

impl PipelineRules {
    pub const DEFAULT_RULES: PipelineRules = PipelineRules {
        similarity_threshold: 0.85,
        ambiguity_margin: 0.05,
        blocking_prefix_length: 3,
        blocking_strategy: BlockingStrategy::LastNamePrefix,
        convert_rule: ConvertRule::PrecedingYear,
        link_across_sports: false,
        parallel: true,
    };

    pub fn validate(&self) -> Result<(), PipelineErrors> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PipelineErrors::InvalidRules(format!(
                "similarity threshold {} outside of [0, 1]",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.ambiguity_margin) {
            return Err(PipelineErrors::InvalidRules(format!(
                "ambiguity margin {} outside of [0, 1]",
                self.ambiguity_margin
            )));
        }
        if self.blocking_prefix_length == 0 {
            return Err(PipelineErrors::InvalidRules(
                "blocking prefix length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineRules {
    fn default() -> Self {
        PipelineRules::DEFAULT_RULES
    }
}
