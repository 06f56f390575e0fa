use clap::{Parser, Subcommand, ValueEnum};
use cli::{process_image, ImageReport, OutputSettings, SegmentConfig};
use color_eyre::eyre::{eyre, Result};
use schemars::schema_for;
use segmentation::{Connectivity, RawSegmentationOptions, SegmentationCommand};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut background-removed images into stickers
    Segment {
        /// Input images (PNG, JPEG or WebP)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory for stickers
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Optional TOML or JSON configuration; flags below take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Pixels with alpha strictly above this count as foreground
        #[arg(long)]
        alpha_threshold: Option<i64>,
        /// Minimum pixel count for a segment to be kept
        #[arg(long)]
        min_area: Option<i64>,
        /// Transparent margin around each sticker
        #[arg(long)]
        padding: Option<i64>,
        /// Pixel adjacency: "four" or "eight"
        #[arg(long, value_parser = parse_connectivity)]
        connectivity: Option<Connectivity>,
        /// Stop after this many stickers
        #[arg(long)]
        max_segments: Option<i64>,
        /// Drop stickers whose sharpness score is below this
        #[arg(long)]
        blur_threshold: Option<f64>,
        /// Fold small touching fragments into larger neighbours
        #[arg(long)]
        merge_small: bool,
        /// Largest stickers first
        #[arg(long)]
        sort: bool,
        /// Also write thumbnails
        #[arg(long)]
        thumbnails: bool,
        /// Thumbnail square edge; implies --thumbnails
        #[arg(long)]
        thumbnail_size: Option<u32>,
        /// Replace existing per-image output directories
        #[arg(long)]
        overwrite: bool,
    },
    /// Process images listed in a configuration file
    Process {
        /// Path to the TOML or JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the segmentation commands accepted by the manager
    Commands,
    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value_t = SchemaTarget::Config)]
        target: SchemaTarget,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaTarget {
    Config,
    Options,
    Command,
}

fn parse_connectivity(value: &str) -> Result<Connectivity, String> {
    Connectivity::from_str(value).map_err(|_| format!("unknown connectivity '{value}', expected four or eight"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Segment {
            inputs,
            output_dir,
            config,
            alpha_threshold,
            min_area,
            padding,
            connectivity,
            max_segments,
            blur_threshold,
            merge_small,
            sort,
            thumbnails,
            thumbnail_size,
            overwrite,
        } => {
            let base = match config {
                Some(path) => SegmentConfig::from_file(path)?,
                None => SegmentConfig::default(),
            };
            let overrides = RawSegmentationOptions {
                alpha_threshold,
                min_area,
                padding,
                connectivity,
                max_segments,
            };
            let config = SegmentConfig {
                inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
                output_dir: output_dir.display().to_string(),
                options: overrides.or(base.options),
                blur_threshold: blur_threshold.or(base.blur_threshold),
                merge_small_segments: merge_small || base.merge_small_segments,
                sort_by_area: sort || base.sort_by_area,
                thumbnails: thumbnails || base.thumbnails,
                thumbnail_size: thumbnail_size.or(base.thumbnail_size),
                overwrite: overwrite || base.overwrite,
            };
            run(config).await?;
        }
        Commands::Process { config } => {
            let config = SegmentConfig::from_file(&config)?;
            run(config).await?;
        }
        Commands::Commands => {
            print!("{}", SegmentationCommand::help_text());
        }
        Commands::Schema { target } => {
            let schema = match target {
                SchemaTarget::Config => schema_for!(SegmentConfig),
                SchemaTarget::Options => schema_for!(RawSegmentationOptions),
                SchemaTarget::Command => SegmentationCommand::schema(),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

async fn run(config: SegmentConfig) -> Result<()> {
    let pipeline = Arc::new(config.pipeline()?);
    info!("{}", pipeline.info());

    let settings: Arc<OutputSettings> = Arc::new(config.output_settings());
    std::fs::create_dir_all(&settings.root)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling remaining work");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut handles = Vec::with_capacity(config.inputs.len());
    for input in &config.inputs {
        let input = PathBuf::from(input);
        let pipeline = pipeline.clone();
        let settings = settings.clone();
        let cancel = cancel.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let outcome = process_image(&input, &settings, &pipeline, &cancel);
            (input, outcome)
        }));
    }

    let mut reports: Vec<ImageReport> = Vec::new();
    let mut failures = 0usize;
    for handle in handles {
        let (input, outcome) = handle.await?;
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                failures += 1;
                error!("Failed to process {}: {}", input.display(), e);
            }
        }
    }

    print_summary(&reports, &settings.root);

    if failures > 0 {
        return Err(eyre!("{failures} of {} images failed", config.inputs.len()));
    }

    info!("✅ Sticker extraction completed!");
    Ok(())
}

fn print_summary(reports: &[ImageReport], output_root: &Path) {
    let total: usize = reports.iter().map(|r| r.stats.count).sum();
    info!("{} stickers from {} images in {}", total, reports.len(), output_root.display());

    for report in reports {
        let stats = &report.stats;
        info!(
            "  {} -> {} stickers, areas {}..{} (avg {}), written to {}",
            report.input.display(),
            stats.count,
            stats.min_area,
            stats.max_area,
            stats.average_area,
            report.output_dir.display()
        );
    }
}
