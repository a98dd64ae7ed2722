//! Show and stacks command implementations.
//!
//! The show command:
//! 1. Reads a saved trace report
//! 2. Resolves the report config (TOML file, then CLI overrides)
//! 3. Prints the call-tree table with hotspots highlighted

use super::models::ShowArgs;
use crate::aggregator::{build_collapsed_stacks, calculate_own_time_distribution};
use crate::output::read_report;
use crate::report::format_report;
use crate::utils::config::{load_report_config, ReportConfig};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;

/// Largest hotspot count accepted on the command line
const MAX_HOTSPOTS: usize = 1000;

/// Execute the show command
///
/// # Errors
/// * Config file read/parse errors
/// * Report read/parse errors
pub fn execute_show(args: ShowArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    debug!("Report config: {:?}", config);

    let report = read_report(&args.input)
        .with_context(|| format!("Failed to read report {}", args.input.display()))?;

    if !report.unclosed.is_empty() {
        warn!("Report contains {} unclosed span(s)", report.unclosed.len());
    }

    let distribution = calculate_own_time_distribution(&report.aggregates);
    info!("Own time distribution: {}", distribution.summary());
    if distribution.is_highly_concentrated() {
        info!("Own time is concentrated in a few entities");
    }

    println!("{}", format_report(&report, &config));

    Ok(())
}

/// Print collapsed stack lines for a saved report
pub fn execute_stacks(input: &Path) -> Result<()> {
    let report = read_report(input)
        .with_context(|| format!("Failed to read report {}", input.display()))?;

    let stacks = build_collapsed_stacks(&report);
    if stacks.is_empty() {
        warn!("No closed spans in {}", input.display());
    }

    for stack in &stacks {
        println!("{}", stack.to_line());
    }

    Ok(())
}

/// Validate show arguments before running the show command
pub fn validate_show_args(args: &ShowArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Report path cannot be empty");
    }

    if let Some(top) = args.top {
        if top > MAX_HOTSPOTS {
            anyhow::bail!("top is too large (max {})", MAX_HOTSPOTS);
        }
    }

    Ok(())
}

/// Config file first, then CLI flags on top
fn resolve_config(args: &ShowArgs) -> Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => load_report_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };

    if let Some(top) = args.top {
        config = config.with_hotspots(top);
    }
    if args.no_color {
        config = config.with_color(false);
    }

    Ok(config)
}
