use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use media_meta::{extract_metadata, MetadataRecord, RecordedOnSource, TechnicalInfo};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "media-meta",
    version,
    about = "Show technical metadata and recording dates of media files"
)]
struct Cli {
    /// Media files to inspect
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Print one JSON object per file instead of a summary
    #[arg(long)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn describe_technical(info: &TechnicalInfo) -> String {
    let mut parts = vec![info.format.clone()];
    if let Some(rate) = info.sample_rate_hz {
        parts.push(format!("{} Hz", rate));
    }
    if let Some(channels) = info.channels {
        parts.push(format!("{} ch", channels));
    }
    if info.bitrate_bps > 0 {
        parts.push(format!("{} kbps", info.bitrate_bps / 1000));
    }
    parts.push(format!("{:.2} s", info.duration_seconds));
    parts.join(", ")
}

fn print_record(record: &MetadataRecord) {
    println!("  {}", record.filename.bold());
    println!("    {}  {}", "path:    ".dimmed(), record.filepath);
    println!("    {}  {} bytes", "size:    ".dimmed(), record.file_size_bytes);
    println!("    {}  {}", "modified:".dimmed(), record.file_modified_on_iso());

    let recorded = record.recorded_on_iso().unwrap_or_else(|| "-".to_string());
    let source = match record.recorded_on_source {
        RecordedOnSource::Tag => record.recorded_on_source.as_str().green(),
        RecordedOnSource::FilesystemFallback => record.recorded_on_source.as_str().yellow(),
        RecordedOnSource::None => record.recorded_on_source.as_str().red(),
    };
    println!("    {}  {} ({})", "recorded:".dimmed(), recorded, source);

    if let Some(info) = &record.technical {
        println!("    {}  {}", "format:  ".dimmed(), describe_technical(info));
    }
    if let Some(error) = &record.error {
        println!("    {}  {}", "error:   ".dimmed(), error.red());
    }
    println!();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut failures = 0usize;

    for path in &cli.paths {
        match extract_metadata(path) {
            Ok(record) => {
                if cli.json {
                    let line = serde_json::to_string(&record)
                        .with_context(|| format!("Failed to serialize {}", path.display()))?;
                    println!("{}", line);
                } else {
                    print_record(&record);
                }
            }
            Err(e) => {
                eprintln!("  {} {}", "ERROR".red().bold(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files could not be read", failures, cli.paths.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn info() -> TechnicalInfo {
        TechnicalInfo {
            duration_seconds: 61.0,
            sample_rate_hz: Some(44100),
            channels: Some(2),
            bitrate_bps: 320_000,
            format: "Flac".to_string(),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_requires_a_path() {
        assert!(Cli::try_parse_from(["media-meta"]).is_err());
    }

    #[test]
    fn cli_counts_verbosity() {
        let cli = Cli::try_parse_from(["media-meta", "-vv", "--json", "a.wav", "b.flac"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.paths.len(), 2);
    }

    #[test]
    fn technical_summary() {
        assert_eq!(
            describe_technical(&info()),
            "Flac, 44100 Hz, 2 ch, 320 kbps, 61.00 s"
        );
    }

    #[test]
    fn technical_summary_skips_unknowns() {
        let mut info = info();
        info.sample_rate_hz = None;
        info.channels = None;
        info.bitrate_bps = 0;
        assert_eq!(describe_technical(&info), "Flac, 61.00 s");
    }
}
