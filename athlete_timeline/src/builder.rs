pub use crate::config::*;

/// A builder for collecting records before a run.
///
/// Records must be added in source order: on incomparable level conflicts,
/// the earliest record wins.
///
/// ```
/// pub use athlete_timeline::builder::Builder;
/// pub use athlete_timeline::{PipelineRules, SourceKind};
/// # use athlete_timeline::PipelineErrors;
///
/// let mut builder = Builder::new(&PipelineRules::DEFAULT_RULES)?;
///
/// builder.add_observation(SourceKind::Conversion, "Rowing", "Jon", "Smith", 2020, "Uncarded")?;
/// builder.add_observation(SourceKind::CssRoster, "Rowing", "John", "Smith", 2021, "SC Carded")?;
///
/// let result = builder.run()?;
/// assert_eq!(result.rows.len(), 2);
/// assert_eq!(result.rows[1].convert_year.as_str(), "Y");
///
/// # Ok::<(), PipelineErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: PipelineRules,
    pub(crate) _records: Vec<RawRecord>,
}

impl Builder {
    pub fn new(rules: &PipelineRules) -> Result<Builder, PipelineErrors> {
        rules.validate()?;
        Ok(Builder {
            _rules: rules.clone(),
            _records: Vec::new(),
        })
    }

    /// Adds a record with only the fields needed for the metrics.
    ///
    /// An empty level is recorded as missing.
    pub fn add_observation(
        &mut self,
        source: SourceKind,
        sport: &str,
        first_name: &str,
        last_name: &str,
        year: i32,
        level: &str,
    ) -> Result<(), PipelineErrors> {
        self.add_record(RawRecord {
            source,
            sport: sport.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            gender: None,
            date_of_birth: None,
            year,
            program_level: if level.trim().is_empty() {
                None
            } else {
                Some(level.to_string())
            },
            css_flag: source == SourceKind::CssRoster,
        })
    }

    pub fn add_record(&mut self, record: RawRecord) -> Result<(), PipelineErrors> {
        self._records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self._records.len()
    }

    pub fn is_empty(&self) -> bool {
        self._records.is_empty()
    }

    pub fn run(&self) -> Result<PipelineResult, PipelineErrors> {
        crate::run_pipeline(&self._records, &self._rules)
    }
}
