//! Flamegraph command implementation.
//!
//! The flamegraph command:
//! 1. Reads a saved trace report
//! 2. Builds collapsed stacks weighted by own time
//! 3. Picks the hottest entities by cumulative own time
//! 4. Generates and writes the SVG

use super::models::FlamegraphArgs;
use crate::aggregator::{build_collapsed_stacks, AggregateKey, Metric};
use crate::flamegraph::generate_flamegraph;
use crate::output::{read_report, write_svg};
use crate::report::TraceReport;
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

const MIN_WIDTH: usize = 200;
const MAX_WIDTH: usize = 20_000;

/// Execute the flamegraph command
///
/// # Errors
/// * Report read/parse errors
/// * Empty report (no closed spans)
/// * File write errors
pub fn execute_flamegraph(args: FlamegraphArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/3: Reading report {}...", args.input.display());
    let report = read_report(&args.input)
        .with_context(|| format!("Failed to read report {}", args.input.display()))?;

    info!("Step 2/3: Building collapsed stacks...");
    let stacks = build_collapsed_stacks(&report);
    debug!("Built {} unique stacks", stacks.len());

    let hotspots = hottest_entities(&report, args.top);
    debug!("Highlighting: {:?}", hotspots);

    let config = args
        .flamegraph_config
        .with_highlight(hotspots)
        .with_checkpoints(checkpoint_labels(&report));

    info!("Step 3/3: Generating flamegraph...");
    let svg = generate_flamegraph(&stacks, Some(&config))
        .context("Failed to generate flamegraph")?;

    write_svg(&svg, &args.output).context("Failed to write flamegraph SVG")?;
    info!("✓ Flamegraph written to: {}", args.output.display());

    info!(
        "Flamegraph completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Validate flamegraph arguments
pub fn validate_flamegraph_args(args: &FlamegraphArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Report path cannot be empty");
    }

    if args.output.as_os_str().is_empty() {
        anyhow::bail!("Output path cannot be empty");
    }

    let width = args.flamegraph_config.width;
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
        anyhow::bail!("width must be between {} and {}", MIN_WIDTH, MAX_WIDTH);
    }

    Ok(())
}

/// Entity names of the top `n` keys by cumulative own time
fn hottest_entities(report: &TraceReport, n: usize) -> Vec<String> {
    report
        .aggregates
        .top(Metric::CumulativeOwnDuration, n)
        .into_iter()
        .filter_map(|key| match key {
            AggregateKey::Entity(name) => Some(name),
            AggregateKey::Span(_) => None,
        })
        .collect()
}

fn checkpoint_labels(report: &TraceReport) -> Vec<String> {
    let mut labels: Vec<String> = report
        .iter()
        .filter(|span| span.checkpoint)
        .map(|span| span.entity.clone())
        .collect();
    labels.sort();
    labels.dedup();
    labels
}
