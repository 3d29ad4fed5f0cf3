//! Offline pitch detection tool.
//!
//! Analyses WAV recordings with the tuner's analysis pipeline and prints
//! one JSON report per file, or a single combined object in `-a` mode.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use tuner_core::offline::{self, AnalysisOptions};

#[derive(Parser, Debug, Clone)]
#[command(name = "tuner", author, version, about)]
struct Args {
    /// Reference frequency for A4 in Hz
    #[arg(short = 'r', value_name = "FREQ", default_value_t = 440.0)]
    reference: f64,

    /// Combine all outputs into one JSON object keyed by file basename
    #[arg(short = 'a')]
    all: bool,

    /// WAV files to analyse
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> ExitCode {
    // Initialize tracing/logging (honors RUST_LOG); diagnostics go to
    // stderr so stdout stays pure JSON.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let args = Args::parse();

    if args.files.is_empty() {
        let _ = Args::command().print_help();
        return ExitCode::from(1);
    }

    let options = AnalysisOptions::with_reference(args.reference);

    if args.all && args.files.len() > 1 {
        let mut combined = serde_json::Map::new();
        for file in &args.files {
            let report = offline::analyze_file(file, &options);
            let value = serde_json::to_value(&report).expect("report serializes");
            combined.insert(basename(file), value);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(combined))
                .expect("report serializes")
        );
    } else {
        let many = args.files.len() > 1;
        for file in &args.files {
            if many {
                println!("=== {} ===", file.display());
            }
            let report = offline::analyze_file(file, &options);
            println!(
                "{}",
                serde_json::to_string_pretty(&report).expect("report serializes")
            );
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_documents_the_flags() {
        let mut cmd = Args::command();
        let mut help = Vec::new();
        cmd.write_long_help(&mut help).expect("write help");
        let help = String::from_utf8(help).expect("utf8 help");
        assert!(help.contains("-r"));
        assert!(help.contains("-a"));
        assert!(help.contains("FILE"));
    }

    #[test]
    fn parses_reference_and_files() {
        let args = Args::parse_from(["tuner", "-r", "442", "-a", "one.wav", "two.wav"]);
        assert_eq!(args.reference, 442.0);
        assert!(args.all);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn basename_strips_directory_and_extension() {
        assert_eq!(basename(Path::new("/tmp/tones/a4_sine.wav")), "a4_sine");
    }
}
