use log::{debug, info, warn};

use athlete_timeline::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::conversion::config_reader::*;
use crate::conversion::io_common::{read_table, Table};

pub mod config_reader;
pub mod io_common;
pub mod io_conversion;
pub mod io_css;
pub mod io_dataset;
pub mod io_nomination;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RunError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("No worksheet {worksheet:?} in {path}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display("No header row in {path}"))]
    EmptyTable { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing the dataset"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Missing column {column:?} in {path}"))]
    MissingColumn { path: String, column: String },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error rendering JSON"))]
    RenderingJson { source: serde_json::Error },
    #[snafu(display("Error parsing number in the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("Unknown provider {provider:?} for {path}"))]
    UnknownProvider { provider: String, path: String },
    #[snafu(display("Pipeline failure: {source}"))]
    Pipeline { source: PipelineErrors },
    #[snafu(display("The dataset differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RunResult<T> = Result<T, RunError>;

/// The records read from one source file, with what was dropped on the way.
#[derive(PartialEq, Debug, Clone)]
pub struct SourceRead {
    pub records: Vec<RawRecord>,
    /// Rows without sport, name or usable year.
    pub skipped: usize,
    /// Rows dropped by a source rule (not CSS, retired, not an athlete, ...).
    pub excluded: usize,
}

impl SourceRead {
    pub fn new() -> SourceRead {
        SourceRead {
            records: Vec::new(),
            skipped: 0,
            excluded: 0,
        }
    }
}

impl Default for SourceRead {
    fn default() -> Self {
        SourceRead::new()
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct SourceStats {
    pub provider: String,
    pub path: String,
    pub records: usize,
    pub skipped: usize,
    pub excluded: usize,
}

fn read_source(root_path: &Path, cfs: &FileSource) -> RunResult<(Vec<RawRecord>, SourceStats)> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let path = p.as_path().display().to_string();
    info!(
        "read_source: reading {} source {:?}",
        cfs.provider.as_str(),
        path
    );
    let table: Table = read_table(&path, cfs.excel_worksheet_name.as_deref(), cfs.skip_rows()?)?;
    let read = match cfs.provider.as_str() {
        "conversion" => io_conversion::read_conversion(&table)?,
        "css" => io_css::read_css_long(&table)?,
        "css_wide" => io_css::read_css_wide(&table)?,
        "nomination" => io_nomination::read_nomination(&table)?,
        x => {
            return UnknownProviderSnafu {
                provider: x.to_string(),
                path,
            }
            .fail()
        }
    };
    info!(
        "read_source: {:?}: {} records, {} skipped, {} excluded",
        path,
        read.records.len(),
        read.skipped,
        read.excluded
    );
    let stats = SourceStats {
        provider: cfs.provider.clone(),
        path,
        records: read.records.len(),
        skipped: read.skipped,
        excluded: read.excluded,
    };
    Ok((read.records, stats))
}

/// The sources given on the command line, in merge order.
fn sources_from_args(args: &Args) -> Vec<FileSource> {
    let mut res: Vec<FileSource> = Vec::new();
    let given = [
        ("conversion", &args.conversion),
        ("css", &args.css),
        ("css_wide", &args.css_wide),
        ("nomination", &args.nomination),
    ];
    for (provider, path) in given.iter() {
        if let Some(p) = path {
            res.push(FileSource::new(provider, p));
        }
    }
    res
}

fn build_rules(config: &ConversionConfig, args: &Args) -> RunResult<PipelineRules> {
    let mut rules = match &config.rules {
        Some(rc) => rc.to_rules()?,
        None => PipelineRules::DEFAULT_RULES,
    };
    if let Some(t) = args.threshold {
        rules.similarity_threshold = t;
    }
    if let Some(n) = args.prefix_length {
        rules.blocking_prefix_length = n;
    }
    if let Some(r) = &args.convert_rule {
        rules.convert_rule = read_convert_rule(r)?;
    }
    if args.link_across_sports {
        rules.link_across_sports = true;
    }
    if args.sequential {
        rules.parallel = false;
    }
    rules.validate().context(PipelineSnafu {})?;
    Ok(rules)
}

fn sources_to_json(sources: &[SourceStats]) -> Vec<JSValue> {
    sources
        .iter()
        .map(|s| {
            json!({
                "provider": s.provider,
                "path": s.path,
                "records": s.records,
                "skipped": s.skipped,
                "excluded": s.excluded,
            })
        })
        .collect()
}

fn build_summary_js(rules: &PipelineRules, sources: &[SourceStats], s: &RunSummary) -> JSValue {
    let sports: Vec<JSValue> = s
        .sports
        .iter()
        .map(|x| {
            json!({
                "sport": x.sport,
                "records": x.records,
                "rawNames": x.raw_names,
                "identities": x.identities,
                "buckets": x.buckets,
                "comparisons": x.comparisons,
            })
        })
        .collect();
    let merges: Vec<JSValue> = s
        .merges
        .iter()
        .map(|m| json!({"sport": m.sport, "variant": m.variant, "canonical": m.canonical_name, "records": m.records}))
        .collect();
    let ambiguous: Vec<JSValue> = s
        .ambiguous_pairs
        .iter()
        .map(|a| json!({"sport": a.sport, "first": a.first, "second": a.second, "score": a.score}))
        .collect();
    let conflicts: Vec<JSValue> = s
        .conflicts
        .iter()
        .map(|c| {
            json!({
                "sport": c.sport,
                "name": c.canonical_name,
                "year": c.year,
                "kept": {"level": c.kept_level, "source": c.kept_source.label()},
                "rejected": {"level": c.rejected_level, "source": c.rejected_source.label()},
                "resolution": match c.resolution {
                    ConflictResolution::HigherLevel => "higherLevel",
                    ConflictResolution::Incomparable => "incomparable",
                },
            })
        })
        .collect();
    let transitions: Vec<JSValue> = s
        .incomparable_transitions
        .iter()
        .map(|t| {
            let (reason, level) = match &t.reason {
                IncomparableReason::Unmapped(l) => ("unmapped", Some(l.clone())),
                IncomparableReason::Missing => ("missing", None),
            };
            json!({"sport": t.sport, "name": t.canonical_name, "year": t.year, "reason": reason, "level": level})
        })
        .collect();
    let links: Vec<JSValue> = s
        .cross_sport_links
        .iter()
        .map(|l| json!({"name": l.full_name, "dateOfBirth": l.date_of_birth, "sports": l.sports, "variants": l.variants}))
        .collect();
    let link_ambiguities: Vec<JSValue> = s
        .cross_sport_ambiguities
        .iter()
        .map(|a| {
            let identities: Vec<JSValue> = a
                .identities
                .iter()
                .map(|(sport, name)| json!({"sport": sport, "name": name}))
                .collect();
            json!({"dateOfBirth": a.date_of_birth, "repeatedSports": a.repeated_sports, "identities": identities})
        })
        .collect();
    let first_conversions: Vec<JSValue> = s
        .first_conversion_years
        .iter()
        .map(|(year, count)| json!({"year": year, "identities": count}))
        .collect();

    json!({
        "config": {
            "similarityThreshold": rules.similarity_threshold,
            "ambiguityMargin": rules.ambiguity_margin,
            "blockingPrefixLength": rules.blocking_prefix_length,
            "convertRule": convert_rule_name(rules.convert_rule),
            "linkAcrossSports": rules.link_across_sports,
        },
        "sources": sources_to_json(sources),
        "inputRecords": s.input_records,
        "rejectedRecords": s.rejected_records,
        "sports": sports,
        "merges": merges,
        "ambiguousPairs": ambiguous,
        "conflicts": conflicts,
        "crossSourceConflicts": s.cross_source_conflict_count(),
        "unmappedLevelTransitions": s.unmapped_level_count(),
        "missingLevelTransitions": s.missing_level_count(),
        "incomparableTransitions": transitions,
        "nominationOnlyIdentities": s.nomination_only_identities,
        "crossSportLinks": links,
        "crossSportAmbiguities": link_ambiguities,
        "results": {
            "rows": s.rows,
            "convertYes": s.convert_yes,
            "averageYearsTargeted": s.average_years_targeted,
            "firstConversionYears": first_conversions,
            "rowsMissingDateOfBirth": s.rows_missing_dob,
            "meanEntryAge": s.mean_entry_age,
        },
        "fingerprint": s.fingerprint,
    })
}

fn write_output(path: &str, contents: &str) -> RunResult<()> {
    if path == "stdout" {
        print!("{}", contents);
        Ok(())
    } else {
        info!("write_output: writing {:?}", path);
        fs::write(path, contents).context(WritingFileSnafu { path })
    }
}

fn check_reference(reference_path: &str, dataset: &str) -> RunResult<()> {
    let reference = fs::read_to_string(reference_path).context(OpeningFileSnafu {
        path: reference_path,
    })?;
    let normalize = |s: &str| -> String {
        s.lines()
            .map(|l| l.trim_end())
            .collect::<Vec<&str>>()
            .join("\n")
    };
    let (expected, computed) = (normalize(&reference), normalize(dataset));
    if expected != computed {
        warn!("check_reference: found differences with the reference");
        print_diff(expected.as_str(), computed.as_str(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("check_reference: dataset matches {:?}", reference_path);
    Ok(())
}

/// Runs a full conversion: read the sources, build the dataset, write the outputs.
pub fn run_conversion(args: &Args) -> RunResult<()> {
    let (config, root_p): (ConversionConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (ConversionConfig::default(), PathBuf::new()),
    };
    debug!("run_conversion: config: {:?}", config);

    let rules = build_rules(&config, args)?;

    // Paths given on the command line are relative to the working directory.
    let cli_sources = sources_from_args(args);
    let (sources, sources_root) = if cli_sources.is_empty() {
        (config.sources.clone(), root_p.clone())
    } else {
        (cli_sources, PathBuf::new())
    };
    if sources.is_empty() {
        whatever!("No source file given: use --config or one of --conversion, --css, --css-wide, --nomination")
    }

    let mut data: Vec<RawRecord> = Vec::new();
    let mut source_stats: Vec<SourceStats> = Vec::new();
    for cfs in sources.iter() {
        let (mut records, stats) = read_source(&sources_root, cfs)?;
        data.append(&mut records);
        source_stats.push(stats);
    }

    let result = run_pipeline(&data, &rules).context(PipelineSnafu {})?;

    let dataset = io_dataset::render_dataset(&result.rows)?;
    let dataset_path = args.out.clone().or_else(|| {
        config
            .output_settings
            .as_ref()
            .and_then(|o| o.dataset_path.as_ref())
            .map(|p| root_p.join(p).display().to_string())
    });
    match dataset_path {
        Some(p) => write_output(&p, &dataset)?,
        None => write_output("stdout", &dataset)?,
    }

    let summary_js = build_summary_js(&rules, &source_stats, &result.summary);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(RenderingJsonSnafu {})?;
    let summary_path = args.summary.clone().or_else(|| {
        config
            .output_settings
            .as_ref()
            .and_then(|o| o.summary_path.as_ref())
            .map(|p| root_p.join(p).display().to_string())
    });
    if let Some(p) = summary_path {
        write_output(&p, &pretty_js_summary)?;
    } else {
        debug!("run_conversion: summary: {}", pretty_js_summary);
    }
    info!(
        "run_conversion: {} rows, {} Y, fingerprint {}",
        result.summary.rows, result.summary.convert_yes, result.summary.fingerprint
    );

    if let Some(reference) = &args.reference {
        check_reference(reference, &dataset)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use athlete_timeline::builder::Builder;

    fn args() -> Args {
        Args {
            config: None,
            conversion: None,
            css: None,
            css_wide: None,
            nomination: None,
            out: None,
            summary: None,
            reference: None,
            threshold: None,
            prefix_length: None,
            convert_rule: None,
            link_across_sports: false,
            sequential: false,
            verbose: false,
        }
    }

    #[test]
    fn cli_overrides_config_rules() {
        let config: ConversionConfig = serde_json::from_str(
            r#"{"rules": {"similarityThreshold": 0.9, "convertRule": "anyPriorYear"}}"#,
        )
        .unwrap();
        let mut a = args();
        a.threshold = Some(0.8);
        a.sequential = true;
        let rules = build_rules(&config, &a).unwrap();
        assert_eq!(rules.similarity_threshold, 0.8);
        assert_eq!(rules.convert_rule, ConvertRule::AnyPriorYear);
        assert!(!rules.parallel);
    }

    #[test]
    fn invalid_rules_fail() {
        let mut a = args();
        a.prefix_length = Some(0);
        let res = build_rules(&ConversionConfig::default(), &a);
        assert!(matches!(res, Err(RunError::Pipeline { .. })));
    }

    #[test]
    fn cli_sources_keep_merge_order() {
        let mut a = args();
        a.nomination = Some("nom.csv".to_string());
        a.conversion = Some("conv.csv".to_string());
        let sources = sources_from_args(&a);
        let providers: Vec<&str> = sources.iter().map(|s| s.provider.as_str()).collect();
        assert_eq!(providers, vec!["conversion", "nomination"]);
    }

    #[test]
    fn summary_contains_counts() {
        let mut b = Builder::new(&PipelineRules::DEFAULT_RULES).unwrap();
        b.add_observation(SourceKind::Conversion, "Rowing", "Jon", "Smith", 2020, "Uncarded")
            .unwrap();
        b.add_observation(SourceKind::CssRoster, "Rowing", "John", "Smith", 2021, "SC Carded")
            .unwrap();
        let res = b.run().unwrap();
        let js = build_summary_js(&PipelineRules::DEFAULT_RULES, &[], &res.summary);
        assert_eq!(js["results"]["rows"], json!(2));
        assert_eq!(js["results"]["convertYes"], json!(1));
        // One record each: the alphabetical spelling wins.
        assert_eq!(js["merges"][0]["canonical"], json!("John Smith"));
        assert_eq!(js["config"]["convertRule"], json!("precedingYear"));
        assert_eq!(js["fingerprint"], json!(res.summary.fingerprint));
    }
    fn write_file(dir: &Path, name: &str, contents: &str) -> String {
        let p = dir.join(name);
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    #[test]
    fn end_to_end_with_config() {
        let _ = env_logger::try_init();
        let dir = std::env::temp_dir().join(format!("convtrack-e2e-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        write_file(
            &dir,
            "conversion.csv",
            "Sport,First Name,Last Name,Gender,Date of Birth,Year,Program\n\
Rowing,Jon,Smith,M,2004-05-17,2020,Prov Dev 3\n\
Rowing,Jon,Smith,M,2004-05-17,2021,Uncarded\n",
        );
        write_file(
            &dir,
            "css.csv",
            "Sport,First Name,Last Name,Year,Level,Class\nRowing,John,Smith,2022,SC Carded,YES\n",
        );
        write_file(
            &dir,
            "nomination.csv",
            "Sport,First Name,Last Name,Sex Of Competition,DOB,Fiscal Year,Carding Level\n\
Judo,Jon,Smith,M,,2025-26,Uncarded\n",
        );
        let config_path = write_file(
            &dir,
            "config.json",
            r#"{
                "outputSettings": {"datasetPath": "dataset.csv", "summaryPath": "summary.json"},
                "sources": [
                    {"provider": "conversion", "filePath": "conversion.csv"},
                    {"provider": "css", "filePath": "css.csv"},
                    {"provider": "nomination", "filePath": "nomination.csv"}
                ],
                "rules": {"parallel": false}
            }"#,
        );
        let expected = "\
Sport,First Name,Last Name,Gender,Date of Birth,Year,Program,Full_Name,CSS,Years_Targeted,Convert_Year
Judo,Jon,Smith,M,,2026,Uncarded,Jon Smith,NO,1,N
Rowing,Jon,Smith,M,2004-05-17,2020,Prov Dev 3,Jon Smith,NO,3,N
Rowing,Jon,Smith,M,2004-05-17,2021,Uncarded,Jon Smith,NO,3,Y
Rowing,Jon,Smith,,,2022,SC Carded,Jon Smith,YES,3,Y
";
        let reference = write_file(&dir, "reference.csv", expected);

        let mut a = args();
        a.config = Some(config_path);
        a.reference = Some(reference);
        run_conversion(&a).unwrap();

        let dataset = fs::read_to_string(dir.join("dataset.csv")).unwrap();
        assert_eq!(dataset, expected);
        let summary: JSValue =
            serde_json::from_str(&fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["results"]["convertYes"], json!(2));
        assert_eq!(summary["merges"][0]["variant"], json!("John Smith"));
        assert_eq!(summary["nominationOnlyIdentities"], json!(1));
        assert_eq!(summary["sources"][1]["records"], json!(1));

        // A different reference fails the run.
        let wrong = write_file(&dir, "wrong.csv", "Sport\n");
        a.reference = Some(wrong);
        assert!(matches!(
            run_conversion(&a),
            Err(RunError::ReferenceMismatch { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
