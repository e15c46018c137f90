use clap::Parser;

/// This program builds the longitudinal dataset of targeted athletes, with their conversion years.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the sources, the outputs and the rules.
    /// Relative paths in this file are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) Historical conversion records (CSV or Excel).
    /// Giving any source on the command line replaces the sources of the --config file.
    #[clap(long, value_parser)]
    pub conversion: Option<String>,

    /// (file path, optional) The CSS roster, one row per athlete and year.
    #[clap(long, value_parser)]
    pub css: Option<String>,

    /// (file path, optional) The CSS roster, with one pair of Level/Class columns per season.
    #[clap(long, value_parser)]
    pub css_wide: Option<String>,

    /// (file path, optional) The nomination roster.
    #[clap(long, value_parser)]
    pub nomination: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the dataset in CSV format. Setting this option overrides
    /// the path that may be specified with the --config option. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the run summary will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference dataset in CSV format. If provided, convtrack will
    /// check that the computed dataset matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 0.85) The similarity from which two names of the same sport are merged.
    #[clap(long, value_parser)]
    pub threshold: Option<f64>,

    /// (default 3) The number of characters of the last name that two names must share to be compared.
    #[clap(long, value_parser)]
    pub prefix_length: Option<usize>,

    /// (precedingYear or anyPriorYear, default precedingYear) How the conversion years are detected.
    #[clap(long, value_parser)]
    pub convert_rule: Option<String>,

    /// If passed as an argument, athletes of different sports with the same name and date of birth
    /// share the same name in the dataset.
    #[clap(long, takes_value = false)]
    pub link_across_sports: bool,

    /// If passed as an argument, the sports are processed one after the other.
    #[clap(long, takes_value = false)]
    pub sequential: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
