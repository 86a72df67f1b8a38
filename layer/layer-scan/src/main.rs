//! Build-wide layer hole analysis.
//!
//! # Commands
//!
//! - `layer-scan analyze` - Analyze a build and write its artifact
//! - `layer-scan summary <ARTIFACT>` - Print the per-height report of an artifact
//!
//! Settings come from an optional TOML file (`--config`); flags override
//! file values. Logging honors `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use layer_stats::{
    AnalysisConfig, Artifact, DUMP_EXTENSION, Engine, FileStatus, JsonDumpReader, SvgExportParams,
    read_artifact, render_views, save_views_svg, write_artifact,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exterior/hole analysis for additive-manufacturing builds.
#[derive(Parser)]
#[command(name = "layer-scan")]
#[command(about = "Classify holes across every layer file of a build", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a build directory and write the artifact
    Analyze(AnalyzeArgs),

    /// Print the per-height report of an artifact
    Summary {
        /// Artifact written by `analyze`
        #[arg(name = "ARTIFACT")]
        artifact: PathBuf,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Build directory (layer files live under `Models/`)
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Build identifier
    #[arg(long)]
    build_id: Option<u64>,

    /// Directory for the artifact
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Height to analyze in mm (repeatable)
    #[arg(long = "height")]
    heights: Vec<f64>,

    /// Scan every file at this step in mm
    #[arg(long)]
    interval: Option<f64>,

    /// Only analyze shapes with this identifier (repeatable)
    #[arg(long = "identifier")]
    identifiers: Vec<i64>,

    /// Only analyze this file (repeatable)
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Layer file extension to discover (repeatable; defaults to `json`, the dump format read here)
    #[arg(long = "extension")]
    extensions: Vec<String>,

    /// Render all files into one view per height
    #[arg(long)]
    composite: bool,

    /// Maximum worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Per-file timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Also write SVG views into this directory
    #[arg(long)]
    svg: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// File settings with flags applied on top.
    fn into_config(self) -> Result<(AnalysisConfig, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(dir) = self.build_dir {
            config.build_dir = Some(dir);
        }
        if let Some(id) = self.build_id {
            config.build_id = id;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if !self.heights.is_empty() {
            config.heights = self.heights;
        }
        if let Some(interval) = self.interval {
            config.scan_interval = Some(interval);
        }
        if !self.identifiers.is_empty() {
            config.identifiers = Some(self.identifiers.into_iter().collect());
        }
        if !self.files.is_empty() {
            config.files = Some(self.files.into_iter().collect());
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions;
        } else if config.extensions == AnalysisConfig::default().extensions {
            config.extensions = vec![DUMP_EXTENSION.to_string()];
        }
        if self.composite {
            config.composite_view = true;
        }
        if let Some(workers) = self.workers {
            config.max_workers = Some(workers);
        }
        if let Some(seconds) = self.timeout {
            config.unit_timeout_secs = seconds;
        }

        config.validate().context("invalid configuration")?;
        Ok((config, self.svg))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layer_scan=info,layer_stats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => analyze(args),
        Commands::Summary { artifact } => summary(&artifact),
    }
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    let (config, svg_dir) = args.into_config()?;
    if config.build_dir.is_none() {
        bail!("no build directory: pass --build-dir or set build_dir in the config file");
    }
    if !config
        .extensions
        .iter()
        .any(|e| e.eq_ignore_ascii_case(DUMP_EXTENSION))
    {
        warn!(
            extensions = ?config.extensions,
            "only .{DUMP_EXTENSION} dumps can be read; other files will be reported as errors"
        );
    }
    let artifact_path = config.artifact_path();
    let engine = Engine::new(config, Arc::new(JsonDumpReader::new()));

    let report = engine.run_build().context("analysis failed")?;
    write_artifact(&report, &artifact_path)
        .with_context(|| format!("writing {}", artifact_path.display()))?;

    if let Some(dir) = svg_dir {
        let written = save_views_svg(&render_views(&report), &dir, &SvgExportParams::default())
            .with_context(|| format!("writing SVG views to {}", dir.display()))?;
        info!(views = written.len(), dir = %dir.display(), "SVG views written");
    }

    let stats = &report.statistics;
    println!(
        "build {}: {} shapes, {} with holes, {} holes ({} ok, {} error, {} excluded) in {:.1}s",
        report.build_id,
        stats.total_shapes,
        stats.shapes_with_holes,
        stats.total_holes,
        stats.files.ok,
        stats.files.error,
        stats.files.excluded,
        report.duration.as_secs_f64()
    );
    if report.is_partial() {
        println!("partial result: some files were excluded or failed");
    }
    println!("artifact: {}", artifact_path.display());
    Ok(())
}

fn summary(path: &Path) -> Result<()> {
    let artifact = read_artifact(path).with_context(|| format!("reading {}", path.display()))?;
    print!("{}", format_summary(&artifact));
    Ok(())
}

fn format_summary(artifact: &Artifact) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let c = &artifact.counts;
    let _ = writeln!(out, "Build {} ({:.1}s)", artifact.build_id, artifact.duration_seconds);
    let _ = writeln!(
        out,
        "  shapes {}  with holes {}  holes {}  max/shape {}",
        c.total_shapes, c.shapes_with_holes, c.total_holes, c.max_holes_per_shape
    );
    let _ = writeln!(
        out,
        "\n  {:>10}  {:>5}  {:>7}  {:>10}  {:>6}",
        "z (mm)", "files", "shapes", "with holes", "holes"
    );
    for h in &artifact.per_height {
        let _ = writeln!(
            out,
            "  {:>10.3}  {:>5}  {:>7}  {:>10}  {:>6}",
            h.z, h.files, h.shapes, h.shapes_with_holes, h.holes
        );
    }

    let failed: Vec<_> = artifact
        .per_file
        .iter()
        .filter(|f| f.status == FileStatus::Error)
        .collect();
    if !failed.is_empty() {
        let _ = writeln!(out, "\n  failed files:");
        for f in failed {
            let _ = writeln!(
                out,
                "    {}: {}",
                f.file_name,
                f.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let d = &artifact.diagnostics;
    if d.count_mismatches > 0 || d.ambiguous_paths > 0 {
        let _ = writeln!(
            out,
            "\n  review: {} count mismatches, {} ambiguous paths, {} reordered exteriors",
            d.count_mismatches, d.ambiguous_paths, d.exterior_reordered
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["layer-scan", "analyze"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Analyze(a) => a,
            Commands::Summary { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        std::fs::write(&path, "build_id = 3\nheights = [1.0]\nmax_workers = 8\n").unwrap();

        let args = parse(&[
            "--config",
            path.to_str().unwrap(),
            "--height",
            "2.5",
            "--height",
            "4.0",
            "--identifier",
            "7",
            "--workers",
            "2",
        ]);
        let (config, svg) = args.into_config().unwrap();
        assert_eq!(config.build_id, 3);
        assert_eq!(config.heights, vec![2.5, 4.0]);
        assert_eq!(config.max_workers, Some(2));
        assert!(config.identifiers.unwrap().contains(&7));
        assert!(svg.is_none());
        assert_eq!(config.extensions, vec![DUMP_EXTENSION.to_string()]);
    }

    #[test]
    fn test_extension_defaults_to_dump_format() {
        let (config, _) = parse(&["--height", "1.0"]).into_config().unwrap();
        assert_eq!(config.extensions, vec!["json".to_string()]);

        let (config, _) = parse(&["--height", "1.0", "--extension", "clf"])
            .into_config()
            .unwrap();
        assert_eq!(config.extensions, vec!["clf".to_string()]);
    }

    #[test]
    fn test_invalid_flags_are_rejected() {
        assert!(parse(&["--height", "1.0", "--workers", "0"]).into_config().is_err());
        assert!(parse(&[]).into_config().is_err());
    }

    #[test]
    fn test_summary_lists_heights_and_failures() {
        let json = r#"{
            "build_id": 12, "duration_seconds": 1.5, "composite_view": false,
            "counts": { "total_shapes": 3, "shapes_with_holes": 1, "total_holes": 2,
                        "max_holes_per_shape": 2, "files_ok": 1, "files_error": 1, "files_excluded": 0 },
            "hole_distribution": { "0": 2, "2": 1 },
            "per_file": [
                { "file_name": "a.clf", "path": "/b/a.clf", "folder": "a", "status": "ok",
                  "shape_count": 3, "heights_found": 1 },
                { "file_name": "b.clf", "path": "/b/b.clf", "folder": "b", "status": "error",
                  "shape_count": 0, "heights_found": 0, "error_message": "parse error: bad", "error_kind": "parse" }
            ],
            "per_identifier": {},
            "per_height": [ { "z": 1.5, "files": 1, "shapes": 3, "shapes_with_holes": 1, "holes": 2 } ],
            "diagnostics": { "exterior_reordered": 0, "count_mismatches": 1, "area_ties": 0,
                             "ambiguous_paths": 0, "promoted_exteriors": 0, "open_paths": 0,
                             "open_only_shapes": 0, "filtered_shapes": 0 }
        }"#;
        let artifact = layer_stats::decode(json).unwrap();
        let text = format_summary(&artifact);
        assert!(text.contains("Build 12"));
        assert!(text.contains("1.500"));
        assert!(text.contains("b.clf: parse error: bad"));
        assert!(text.contains("1 count mismatches"));
    }
}
