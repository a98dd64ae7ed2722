use crate::aggregator::Metric;
use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a trace report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Invalid report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        log::warn!(
            "Report schema v{} differs from current v{}",
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!("  Root spans: {}", report.spans.len());
    println!("  Total spans: {}", report.span_count());
    println!("  Entities: {}", report.aggregates.entities.len());
    println!("  Unclosed spans: {}", report.unclosed.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Crono Trace Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string              - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string         - RFC 3339 timestamp");
        println!("  spans: array                 - Root spans in creation order");
        println!("    id: number                 - Span sequence number");
        println!("    entity: string             - Traced entity or checkpoint label");
        println!("    checkpoint: bool           - Closed by the next begin");
        println!("    depth: number              - Ancestor count (0 for roots)");
        println!("    start_time: string         - RFC 3339 timestamp");
        println!("    end_time: string?          - Absent while open");
        println!("    duration_nanos: number?    - end_time - start_time");
        println!("    own_duration_nanos: number? - duration minus closed children");
        println!("    children: array            - Nested spans");
        println!("  aggregates: object");
        println!("    entities: object           - invocations, total_nanos, own_nanos");
        println!("    spans: object              - total_nanos, own_nanos by span id");
        println!("  unclosed: array              - Ids of spans never closed");
        println!();
        println!("Ranked metrics:");
        for metric in Metric::ALL {
            println!("  {}", metric);
        }
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Crono v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Hierarchical call-tree tracing with own-time accounting.");
}
