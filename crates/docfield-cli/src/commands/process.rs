//! Process command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use docfield_core::{ExtractOptions, ExtractionEngine, ExtractionResponse, ImageSource, RecognizerPool};

use super::{load_config, ExtractionArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image, PDF or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    extraction: ExtractionArgs,

    /// Include intermediate texts and per-field details
    #[arg(long)]
    debug: bool,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Exit with an error when the overall confidence is below this value
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    min_confidence: Option<u8>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.extraction.apply(&mut config);
    let profile = args.extraction.profile()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting {} fields...", profile.name));

    let pool = Arc::new(RecognizerPool::from_config(&config)?);
    let engine = ExtractionEngine::new(Arc::clone(&pool), &config);
    let options = ExtractOptions { debug: args.debug };
    let response = engine.extract(&ImageSource::path(&args.input), &profile, &options);
    pool.shutdown();

    pb.finish_and_clear();

    let output = format_response(&response, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        eprintln!();
        eprintln!(
            "{} Extraction confidence: {}%",
            style("ℹ").blue(),
            response.overall_confidence
        );
        eprintln!(
            "{} Recognizer confidence: {:.1}%",
            style("ℹ").blue(),
            response.recognizer_confidence
        );
        eprintln!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            response.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if !response.success {
        anyhow::bail!("{}", response.message);
    }
    if let Some(min) = args.min_confidence {
        if response.overall_confidence < min {
            anyhow::bail!(
                "Confidence {} is below the required {}",
                response.overall_confidence,
                min
            );
        }
    }
    Ok(())
}

pub fn format_response(response: &ExtractionResponse, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Csv => format_csv(response),
        OutputFormat::Text => Ok(format_text(response)),
    }
}

fn format_csv(response: &ExtractionResponse) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "confidence"])?;
    for (name, field) in &response.data {
        wtr.write_record([name.as_str(), field.value.as_str(), &field.confidence.to_string()])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(response: &ExtractionResponse) -> String {
    let mut output = String::new();

    if !response.success {
        output.push_str(&format!("Failed: {}\n", response.message));
        return output;
    }

    output.push_str("Fields:\n");
    let width = response.data.keys().map(String::len).max().unwrap_or(0);
    for (name, field) in &response.data {
        output.push_str(&format!(
            "  {:width$}  {}  ({}%)\n",
            name,
            field.value,
            field.confidence,
            width = width
        ));
    }

    if !response.line_items.is_empty() {
        output.push_str("\nLine items:\n");
        for item in &response.line_items {
            output.push_str(&format!(
                "  {} x {} @ {} = {}\n",
                item.quantity, item.description, item.unit_price, item.total
            ));
        }
    }

    if !response.corrections.is_empty() {
        output.push_str("\nCorrections:\n");
        for correction in &response.corrections {
            output.push_str(&format!("  {} -> {}\n", correction.original, correction.corrected));
        }
    }

    output.push_str(&format!(
        "\nConfidence: {}% ({})\n",
        response.overall_confidence, response.message
    ));
    output
}
