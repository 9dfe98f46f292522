//! Batch processing command for multiple documents.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use docfield_core::{
    DocumentProfile, ExtractOptions, ExtractionEngine, ExtractionResponse, ImageSource,
    RecognizerPool,
};

use super::process::{format_response, OutputFormat};
use super::{load_config, ExtractionArgs};

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "gif", "txt",
];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    extraction: ExtractionArgs,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of documents processed at once
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    response: ExtractionResponse,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.extraction.apply(&mut config);
    let profile = Arc::new(args.extraction.profile()?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let pool = Arc::new(RecognizerPool::from_config(&config)?);
    let engine = Arc::new(ExtractionEngine::new(Arc::clone(&pool), &config));
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let engine = Arc::clone(&engine);
        let profile = Arc::clone(&profile);
        let semaphore = Arc::clone(&semaphore);
        let pb = overall_pb.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let result = tokio::task::spawn_blocking(move || process_single_file(&engine, &profile, path)).await?;
            pb.inc(1);
            anyhow::Ok(result)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle.await??;
        if !result.response.success {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), result.response.message);
            } else {
                error!("Failed to process {}: {}", result.path.display(), result.response.message);
                overall_pb.abandon();
                pool.shutdown();
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), result.response.message);
            }
        }
        results.push(result);
    }

    overall_pb.finish_with_message("Complete");
    pool.shutdown();

    let (successful, failed): (Vec<&ProcessResult>, Vec<&ProcessResult>) =
        results.iter().partition(|r| r.response.success);

    if let Some(output_dir) = &args.output_dir {
        let paths: Vec<&Path> = successful.iter().map(|r| r.path.as_path()).collect();
        for (result, output_name) in successful.iter().zip(output_names(&paths)) {
            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_response(&result.response, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &profile, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!("  - {}: {}", result.path.display(), result.response.message);
        }
    }

    Ok(())
}

fn is_supported(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Output base name per input: the file stem, or the full file name when
/// several inputs share a stem (`scan.pdf` and `scan.png`).
fn output_names(paths: &[&Path]) -> Vec<String> {
    let stem = |p: &Path| p.file_stem().and_then(|s| s.to_str()).unwrap_or("document").to_string();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        *counts.entry(stem(path)).or_default() += 1;
    }

    paths
        .iter()
        .map(|path| {
            let name = stem(path);
            if counts[&name] > 1 {
                let full = path.file_name().and_then(|s| s.to_str()).unwrap_or("document").to_string();
                warn!("Several inputs named {}, writing {} under its full name", name, path.display());
                full
            } else {
                name
            }
        })
        .collect()
}

fn process_single_file(engine: &ExtractionEngine, profile: &DocumentProfile, path: PathBuf) -> ProcessResult {
    let response = engine.extract(&ImageSource::path(&path), profile, &ExtractOptions::default());
    ProcessResult { path, response }
}

/// One row per file: status, overall confidence, then one column per
/// profile field.
fn write_summary(path: &Path, profile: &DocumentProfile, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status", "confidence", "processing_time_ms"];
    header.extend(profile.fields.iter().map(|f| f.name.as_str()));
    header.push("error");
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let response = &result.response;

        let mut record = vec![
            filename.to_string(),
            if response.success { "success" } else { "error" }.to_string(),
            response.overall_confidence.to_string(),
            response.processing_time_ms.to_string(),
        ];
        record.extend(
            profile
                .fields
                .iter()
                .map(|f| response.value(&f.name).unwrap_or("").to_string()),
        );
        record.push(if response.success { String::new() } else { response.message.clone() });
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_names_keep_extension_on_clash() {
        let paths = [Path::new("in/scan.pdf"), Path::new("in/scan.png"), Path::new("in/other.png")];
        assert_eq!(output_names(&paths), vec!["scan.pdf", "scan.png", "other"]);
    }
}
