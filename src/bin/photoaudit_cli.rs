//! PhotoAudit CLI
//!
//! Commands: patterns, check, validate, audit
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure, 1 on operational errors

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use photoaudit_core::{
    AuditConfig, AuditPipeline, ConsistencyChecker, CorrectionWriter, DryRun, ExifTool,
    FilenameParser, MetadataProvider, MetadataRecord, SnapshotProvider,
};

#[derive(Parser)]
#[command(name = "photoaudit-cli")]
#[command(about = "PhotoAudit CLI - Archive naming and provenance auditor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to TOML config file
    #[arg(short, long, global = true, env = "PHOTOAUDIT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered camera origin patterns in match order
    Patterns,

    /// Parse processed file names
    Check {
        /// File names to parse
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Validate a single metadata record
    Validate {
        /// JSON payload (one ExifTool record)
        #[arg(short, long)]
        payload: String,
    },

    /// Audit every configured archive subdirectory
    Audit {
        /// Archive root, overrides the config file
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Write corrections through ExifTool instead of only reporting them
        #[arg(long)]
        apply: bool,

        /// Read captured ExifTool JSON from this directory instead of running ExifTool
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Save each ExifTool JSON batch to this directory
        #[arg(long, conflicts_with = "snapshot_dir")]
        cache_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoaudit_core=info,photoaudit_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AuditConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => AuditConfig::default(),
    };

    let checker = ConsistencyChecker::new(config.pattern_registry());

    match cli.command {
        Commands::Patterns => {
            let patterns: Vec<_> = checker
                .registry()
                .patterns()
                .iter()
                .map(|p| serde_json::json!({
                    "pattern": p.matcher.describe(),
                    "raw_extension": p.raw_extension,
                }))
                .collect();
            if print_json(&patterns) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }

        Commands::Check { names } => {
            let parser = FilenameParser::new(checker.registry());
            let (results, all_valid) = parse_names(&parser, &names);
            if !print_json(&results) {
                ExitCode::FAILURE
            } else if all_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // At least one name failed the grammar
            }
        }

        Commands::Validate { payload } => {
            let record: MetadataRecord = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!("{}", serde_json::json!({ "valid": false, "error": format!("Invalid payload: {}", e) }));
                    return ExitCode::FAILURE;
                }
            };

            let outcome = checker.check(&record);
            if !print_json(&outcome) {
                ExitCode::FAILURE
            } else if outcome.is_fatal() {
                ExitCode::from(2)  // Validation failure
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Audit { root, apply, snapshot_dir, cache_dir } => {
            let mut config = config;
            if let Some(root) = root {
                config.archive_root = root;
            }
            if apply {
                config.apply_corrections = true;
            }
            if snapshot_dir.is_some() {
                config.snapshot_dir = snapshot_dir;
            }
            if cache_dir.is_some() {
                config.cache_dir = cache_dir;
            }

            let mut provider: Box<dyn MetadataProvider> = match &config.snapshot_dir {
                Some(dir) => Box::new(SnapshotProvider::new(dir)),
                None => {
                    let mut tool = ExifTool::new(&config.exiftool)
                        .with_clean_backups(config.clean_backups);
                    if let Some(cache_dir) = &config.cache_dir {
                        tool = tool.with_cache_dir(cache_dir);
                    }
                    Box::new(tool)
                }
            };
            let mut writer: Box<dyn CorrectionWriter> = if config.apply_corrections {
                Box::new(ExifTool::new(&config.exiftool))
            } else {
                Box::new(DryRun::default())
            };

            let pipeline = AuditPipeline::new(checker);
            let report = pipeline.audit_archive(
                &config.directory_paths(),
                provider.as_mut(),
                writer.as_mut(),
            );

            if !print_json(&report) {
                ExitCode::FAILURE
            } else if report.success() {
                ExitCode::SUCCESS
            } else if report.has_violations() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Parse each name once; the flag is false if any name failed.
fn parse_names(parser: &FilenameParser<'_>, names: &[String]) -> (Vec<serde_json::Value>, bool) {
    let parsed: Vec<_> = names.iter().map(|name| parser.parse(name)).collect();
    let all_valid = parsed.iter().all(Option::is_some);
    let results = names
        .iter()
        .zip(&parsed)
        .map(|(name, parsed)| serde_json::json!({
            "file_name": name,
            "parsed": parsed,
        }))
        .collect();
    (results, all_valid)
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoaudit_core::PatternRegistry;

    #[test]
    fn test_parse_names_reports_each_name() {
        let registry = PatternRegistry::default();
        let parser = FilenameParser::new(&registry);
        let names = vec![
            "20210615_143200_DSC04521-HDR.dng".to_string(),
            "badname.dng".to_string(),
        ];

        let (results, all_valid) = parse_names(&parser, &names);
        assert!(!all_valid);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["parsed"]["original_base_name"], "DSC04521");
        assert_eq!(results[0]["parsed"]["is_merged_hdr"], true);
        assert!(results[1]["parsed"].is_null());
    }

    #[test]
    fn test_parse_names_all_valid() {
        let registry = PatternRegistry::default();
        let parser = FilenameParser::new(&registry);
        let names = vec!["20210615_143200_IMG_1234-Edit.tif".to_string()];
        let (_, all_valid) = parse_names(&parser, &names);
        assert!(all_valid);
    }
}
