use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use image_lcm::config::{Config, default_config_path};
use image_lcm::error::ConfigError;
use image_lcm::image::ImageReference;
use image_lcm::lifecycle::LifecycleAggregator;
use image_lcm::logging::{self, LogOptions};
use image_lcm::report::{render_json, render_table};
use image_lcm::version::registries::DockerRegistry;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "image-lcm")]
#[command(
    version,
    about = "Compare deployed container image versions with the latest ones in their registries"
)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/image-lcm/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Image reference to check, in addition to the configured images
    #[arg(short, long = "image", value_name = "REFERENCE")]
    images: Vec<String>,

    /// Maximum number of images checked at once
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    concurrency: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Log progress at info level
    #[arg(short, long)]
    verbose: bool,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logging: bool,

    /// Append logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(&LogOptions {
        verbose: cli.verbose,
        debug: cli.debug,
        json: cli.json_logging,
        file: cli.log_file.clone(),
    })?;

    let config = load_config(cli.config.as_deref())?;
    let catalog = Arc::new(config.catalog()?);

    let images = config
        .images
        .iter()
        .chain(&cli.images)
        .map(|reference| {
            ImageReference::parse(reference)
                .with_context(|| format!("Invalid image reference {:?}", reference))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if images.is_empty() {
        warn!("No images to check; add them to the config file or pass --image");
    }

    let registry =
        DockerRegistry::new(config.request_timeout())?.with_max_pages(config.max_pages);
    let aggregator = LifecycleAggregator::new(catalog, Arc::new(registry))
        .with_concurrency(cli.concurrency.unwrap_or(config.concurrency));

    let reports = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(aggregator.run(images));
    info!("Checked {} images", reports.len());

    match cli.output {
        OutputFormat::Table => print!("{}", render_table(&reports)),
        OutputFormat::Json => println!("{}", render_json(&reports, Utc::now())?),
    }

    Ok(())
}

/// An explicit path must exist; the default path is optional
fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let path = default_config_path();
            if path.exists() {
                info!("Loading config from {}", path.display());
                Config::load(&path)
            } else {
                Ok(Config::default())
            }
        }
    }
}
