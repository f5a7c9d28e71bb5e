//! ppl CLI - run the bundled probabilistic programs and plot their posteriors.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{Config, MethodName, EXAMPLE_CONFIG};
use models::ModelKind;
use ppl::viz::render;

#[derive(Parser)]
#[command(name = "ppl")]
#[command(version)]
#[command(about = "Run small probabilistic programs and plot their posteriors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference on a model and print its posterior
    Run {
        /// Model name (see `ppl list`)
        model: String,

        /// Inference method; defaults to the model's own
        #[arg(short, long, value_enum)]
        method: Option<MethodName>,

        /// Number of samples to draw
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the posterior as a JSON data file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip the chart, print only the summary
        #[arg(long)]
        no_plot: bool,
    },

    /// List available models
    List,

    /// Show example configuration
    ExampleConfig,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::ExampleConfig => {
            println!("{EXAMPLE_CONFIG}");
        }

        Commands::List => {
            for kind in ModelKind::ALL {
                println!(
                    "{:<12} {:<28} {}",
                    kind.name(),
                    kind.default_method().to_string(),
                    kind.description()
                );
            }
        }

        Commands::Run {
            model,
            method,
            samples,
            seed,
            json,
            no_plot,
        } => {
            let config = Config::load(cli.config.as_deref())
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
            let kind: ModelKind = model.parse()?;
            let method = config.inference.method_for(kind, method, samples)?;
            let seed = seed.unwrap_or(config.inference.seed);

            info!(model = %kind, method = %method, seed, "running inference");
            let mut rng = StdRng::seed_from_u64(seed);
            let posterior = kind
                .run(&method, &mut rng)
                .with_context(|| format!("Inference failed for model {kind}"))?;

            println!("=== {} ({}) ===", kind, method);
            if let Some(stats) = posterior.stats() {
                println!("Executions:  {}", stats.executions);
                println!("Samples:     {}", stats.samples);
                if let Some(rate) = stats.acceptance_rate {
                    println!("Acceptance:  {:.1}%", rate * 100.0);
                }
            }
            println!();

            if no_plot {
                print!("{}", ppl::viz::summary_table(&posterior, kind.labels())?);
            } else {
                print!("{}", render(&posterior, kind.labels(), &config.viz)?);
            }

            if let Some(path) = json {
                let data = serde_json::to_string_pretty(&posterior.to_data_file())
                    .context("Failed to serialize posterior")?;
                std::fs::write(&path, data)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                info!("Wrote data file to {:?}", path);
            }
        }
    }

    Ok(())
}
