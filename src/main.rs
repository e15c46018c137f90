use clap::Parser;
use env_logger::Env;
use snafu::ErrorCompat;

mod args;
mod conversion;

fn error_message(e: &conversion::RunError) -> String {
    format!("An error occurred: {}", e)
}

fn main() {
    let args = args::Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(e) = conversion::run_conversion(&args) {
        eprintln!("{}", error_message(&e));
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_names_the_failure() {
        let e = conversion::RunError::ReferenceMismatch {
            path: "ref.csv".to_string(),
        };
        assert_eq!(
            error_message(&e),
            "An error occurred: The dataset differs from the reference ref.csv"
        );
    }
}
