//! Crono CLI
//!
//! Inspects call-tree reports written by instrumented programs:
//! prints the annotated tree, renders flamegraphs and collapsed stacks.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use crono::commands::{
    display_schema, display_version, execute_flamegraph, execute_show, execute_stacks,
    validate_flamegraph_args, validate_report_file, validate_show_args, FlamegraphArgs,
    ShowArgs,
};
use crono::flamegraph::FlamegraphConfig;
use crono::utils::config::{DEFAULT_FLAMEGRAPH_WIDTH, DEFAULT_HOTSPOT_COUNT};

/// Crono - call-tree tracing with own-time accounting
#[derive(Parser, Debug)]
#[command(name = "crono")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the call tree with hotspots highlighted
    Show {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Hotspots highlighted per metric
        #[arg(long, env = "CRONO_TOP")]
        top: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// TOML report config
        #[arg(short, long, env = "CRONO_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Render an SVG flamegraph weighted by own time
    Flamegraph {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Output path for the SVG
        #[arg(short, long, default_value = "flamegraph.svg")]
        output: PathBuf,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value_t = DEFAULT_FLAMEGRAPH_WIDTH)]
        width: usize,

        /// Entities highlighted by cumulative own time
        #[arg(long, default_value_t = DEFAULT_HOTSPOT_COUNT)]
        top: usize,
    },

    /// Print collapsed stack lines
    Stacks {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Show {
            file,
            top,
            no_color,
            config,
        } => {
            let args = ShowArgs {
                input: file,
                top,
                no_color,
                config,
            };

            validate_show_args(&args)?;
            execute_show(args)?;
        }

        Commands::Flamegraph {
            file,
            output,
            title,
            width,
            top,
        } => {
            let mut config = FlamegraphConfig::new().with_width(width);
            if let Some(title) = title {
                config = config.with_title(title);
            }

            let args = FlamegraphArgs {
                input: file,
                output,
                top,
                flamegraph_config: config,
            };

            validate_flamegraph_args(&args)?;
            execute_flamegraph(args)?;
        }

        Commands::Stacks { file } => {
            execute_stacks(&file)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
