use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use divergence_cli::{resolve_config, run_analyze, run_inspect, Overrides};
use divergence_common::logging::init_logging;

/// `divergence` - compare baseline and test engagement, topic by topic.
#[derive(Parser, Debug)]
#[command(name = "divergence")]
#[command(version)]
#[command(about = "Differential response analysis between baseline and test cohorts", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.divergence/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest events and report per-topic differentials
    Analyze {
        /// JSON Lines event file; repeat for several, ingested in order
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Topic to analyse; repeat for several (default: all topics)
        #[arg(long = "topic")]
        topics: Vec<String>,

        /// Divergence threshold in (0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Organisation or subject under analysis
        #[arg(long)]
        subject: Option<String>,

        /// Report format (table, markdown, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Also write the report to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show per-topic event counts and skipped records
    Inspect {
        /// JSON Lines event file; repeat for several
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = Overrides {
        log_level: cli.log_level,
        log_format: cli.log_format,
        ..Overrides::default()
    };
    if let Commands::Analyze {
        topics,
        threshold,
        subject,
        format,
        ..
    } = &cli.command
    {
        overrides.topics.clone_from(topics);
        overrides.threshold = *threshold;
        overrides.subject.clone_from(subject);
        overrides.format.clone_from(format);
    }

    let config = resolve_config(cli.config.as_deref(), &overrides)?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    match cli.command {
        Commands::Analyze { inputs, output, .. } => {
            let report = run_analyze(&config, &inputs, output.as_deref())?;
            print!("{report}");
        }
        Commands::Inspect { inputs } => {
            print!("{}", run_inspect(&inputs)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
