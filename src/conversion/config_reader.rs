use crate::conversion::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "datasetPath")]
    pub dataset_path: Option<String>,
    #[serde(rename = "summaryPath")]
    pub summary_path: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "skipRows")]
    _skip_rows: Option<JSValue>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            excel_worksheet_name: None,
            _skip_rows: None,
        }
    }

    /// The number of rows before the header. 0 if not specified.
    pub fn skip_rows(&self) -> RunResult<usize> {
        if self._skip_rows.is_some() {
            read_js_int(&self._skip_rows)
        } else {
            Ok(0)
        }
    }
}

/// Overrides of the default rules. Every field is optional.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct RulesConfig {
    #[serde(rename = "similarityThreshold")]
    pub similarity_threshold: Option<f64>,
    #[serde(rename = "ambiguityMargin")]
    pub ambiguity_margin: Option<f64>,
    #[serde(rename = "blockingPrefixLength")]
    pub blocking_prefix_length: Option<JSValue>,
    #[serde(rename = "blockingStrategy")]
    pub blocking_strategy: Option<String>,
    #[serde(rename = "convertRule")]
    pub convert_rule: Option<String>,
    #[serde(rename = "linkAcrossSports")]
    pub link_across_sports: Option<bool>,
    pub parallel: Option<bool>,
}

impl RulesConfig {
    pub fn to_rules(&self) -> RunResult<PipelineRules> {
        let mut rules = PipelineRules::DEFAULT_RULES;
        if let Some(t) = self.similarity_threshold {
            rules.similarity_threshold = t;
        }
        if let Some(m) = self.ambiguity_margin {
            rules.ambiguity_margin = m;
        }
        if self.blocking_prefix_length.is_some() {
            rules.blocking_prefix_length = read_js_int(&self.blocking_prefix_length)?;
        }
        if let Some(s) = &self.blocking_strategy {
            rules.blocking_strategy = match s.as_str() {
                "lastName" => BlockingStrategy::LastNamePrefix,
                "fullName" => BlockingStrategy::FullNamePrefix,
                x => whatever!("unknown blocking strategy: {}", x),
            };
        }
        if let Some(r) = &self.convert_rule {
            rules.convert_rule = read_convert_rule(r)?;
        }
        if let Some(b) = self.link_across_sports {
            rules.link_across_sports = b;
        }
        if let Some(b) = self.parallel {
            rules.parallel = b;
        }
        Ok(rules)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(default)]
    pub sources: Vec<FileSource>,
    pub rules: Option<RulesConfig>,
}

pub fn read_config(path: &str) -> RunResult<ConversionConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: ConversionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!(
        "read_config: {:?}: {} sources",
        path,
        config.sources.len()
    );
    Ok(config)
}

pub fn read_convert_rule(s: &str) -> RunResult<ConvertRule> {
    match s {
        "precedingYear" => Ok(ConvertRule::PrecedingYear),
        "anyPriorYear" => Ok(ConvertRule::AnyPriorYear),
        x => whatever!("unknown convert rule: {}", x),
    }
}

pub fn convert_rule_name(rule: ConvertRule) -> &'static str {
    match rule {
        ConvertRule::PrecedingYear => "precedingYear",
        ConvertRule::AnyPriorYear => "anyPriorYear",
    }
}

fn read_js_int(x: &Option<JSValue>) -> RunResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_full_config() {
        let js = r#"{
            "outputSettings": {"datasetPath": "out/dataset.csv", "summaryPath": "out/summary.json"},
            "sources": [
                {"provider": "conversion", "filePath": "conversion.csv"},
                {"provider": "css_wide", "filePath": "css.xlsx", "excelWorksheetName": "Roster", "skipRows": "2"}
            ],
            "rules": {"blockingPrefixLength": 4, "blockingStrategy": "fullName", "linkAcrossSports": true}
        }"#;
        let config: ConversionConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].skip_rows().unwrap(), 0);
        assert_eq!(config.sources[1].skip_rows().unwrap(), 2);
        assert_eq!(
            config.sources[1].excel_worksheet_name,
            Some("Roster".to_string())
        );
        let rules = config.rules.unwrap().to_rules().unwrap();
        assert_eq!(rules.blocking_prefix_length, 4);
        assert_eq!(rules.blocking_strategy, BlockingStrategy::FullNamePrefix);
        assert!(rules.link_across_sports);
        assert_eq!(rules.similarity_threshold, 0.85);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: ConversionConfig = serde_json::from_str("{}").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(
            RulesConfig::default().to_rules().unwrap(),
            PipelineRules::DEFAULT_RULES
        );
    }

    #[test]
    fn unknown_rule_names_fail() {
        assert!(read_convert_rule("strict").is_err());
        let rc = RulesConfig {
            blocking_strategy: Some("soundex".to_string()),
            ..RulesConfig::default()
        };
        assert!(rc.to_rules().is_err());
    }
}
