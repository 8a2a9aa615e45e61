//! Autoscribe - daily article generator
//!
//! Researches a random topic, asks a completion API for an article in a
//! random style, stores the result as a text file and serves it over HTTP.

use anyhow::Result;
use autoscribe::{
    config::ScribeConfig,
    pipeline::Pipeline,
    server::{serve, ServeOptions},
    store::ArtifactStore,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "autoscribe")]
#[command(version)]
#[command(about = "Daily article generator with research lookup and HTTP browsing")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "AUTOSCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server and daily scheduler
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Do not start the daily scheduler
        #[arg(long)]
        no_scheduler: bool,
    },

    /// Generate one article now
    Generate {
        /// Topic to write about (random if omitted)
        #[arg(short, long)]
        topic: Option<String>,

        /// Writing style (random if omitted)
        #[arg(short, long)]
        style: Option<String>,
    },

    /// List the latest stored articles
    List {
        /// Number of filenames to print
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },

    /// Print a stored article
    Show {
        /// File name inside the content directory
        filename: String,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    // `from_file` validates; defaults are valid by construction.
    let config = match &cli.config {
        Some(path) => ScribeConfig::from_file(path)?,
        None => ScribeConfig::default(),
    };

    match cli.command {
        Commands::Serve {
            host,
            port,
            no_scheduler,
        } => {
            let mut options = ServeOptions::from_config(&config);
            if let Some(host) = host {
                options.host = host;
            }
            if let Some(port) = port {
                options.port = port;
            }
            options.scheduler &= !no_scheduler;

            let pipeline = Arc::new(build_pipeline(&config)?);
            serve(config, pipeline, options).await?;
        }
        Commands::Generate { topic, style } => {
            run_generate(&config, topic, style).await?;
        }
        Commands::List { count } => {
            for name in store(&config).list_latest(count).await {
                println!("{}", name);
            }
        }
        Commands::Show { filename } => {
            print!("{}", store(&config).fetch(&filename).await?);
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("autoscribe={},tower_http={}", log_level, log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_pipeline(config: &ScribeConfig) -> Result<Pipeline> {
    let api_key = config.generation.resolve_api_key()?;
    Ok(Pipeline::from_config(config, api_key)?)
}

fn store(config: &ScribeConfig) -> ArtifactStore {
    ArtifactStore::new(config.content.dir.clone()).with_preview_chars(config.content.preview_chars)
}

async fn run_generate(
    config: &ScribeConfig,
    topic: Option<String>,
    style: Option<String>,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    pipeline.store().verify_writable().await?;

    let outcome = match (topic, style) {
        (Some(topic), Some(style)) => pipeline.run_cycle_with(&topic, &style).await,
        (topic, style) => {
            let (random_topic, random_style) = pipeline.pick()?;
            let topic = topic.unwrap_or(random_topic);
            let style = style.unwrap_or(random_style);
            pipeline.run_cycle_with(&topic, &style).await
        }
    };

    println!("Topic:  {}", outcome.topic);
    println!("Style:  {}", outcome.style);
    println!("Title:  {}", outcome.artifact.title);
    println!("Source: {}", outcome.artifact.provenance);
    match outcome.filename() {
        Some(name) => println!("Saved:  {}", name),
        None => anyhow::bail!("generated article could not be saved"),
    }
    Ok(())
}

fn show_config(config: Option<&ScribeConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
