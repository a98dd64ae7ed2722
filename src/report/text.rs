//! Text rendering of a trace report.
//!
//! One row per span, depth-first:
//!
//! ```text
//! #<id>|<indent><name> - <duration> - <own> | <count> <cum> - <cum_own>
//! ```
//!
//! Durations are seconds. A cell is highlighted when its key is among the
//! top N for the matching metric (N = 2 unless configured otherwise).
//! Checkpoints carry no aggregate columns and are never highlighted by count.

use super::{SpanRecord, TraceReport};
use crate::aggregator::{AggregateKey, Metric};
use crate::utils::config::{ReportConfig, ID_COLUMN_WIDTH};
use chrono::Duration;
use colored::Colorize;

const HEADER_RULE: usize = 61;
const UNTERMINATED: &str = "unterminated";

/// Keys that rank in the top N, per metric
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hotspots {
    pub by_count: Vec<AggregateKey>,
    pub by_cumulative: Vec<AggregateKey>,
    pub by_cumulative_own: Vec<AggregateKey>,
    pub by_span: Vec<AggregateKey>,
    pub by_span_own: Vec<AggregateKey>,
}

impl Hotspots {
    pub fn from_report(report: &TraceReport, n: usize) -> Self {
        let top = |metric| report.aggregates.top(metric, n);
        Self {
            by_count: top(Metric::InvocationCount),
            by_cumulative: top(Metric::CumulativeDuration),
            by_cumulative_own: top(Metric::CumulativeOwnDuration),
            by_span: top(Metric::SpanDuration),
            by_span_own: top(Metric::SpanOwnDuration),
        }
    }

    pub fn for_metric(&self, metric: Metric) -> &[AggregateKey] {
        match metric {
            Metric::InvocationCount => &self.by_count,
            Metric::CumulativeDuration => &self.by_cumulative,
            Metric::CumulativeOwnDuration => &self.by_cumulative_own,
            Metric::SpanDuration => &self.by_span,
            Metric::SpanOwnDuration => &self.by_span_own,
        }
    }

    fn contains(&self, metric: Metric, key: &AggregateKey) -> bool {
        self.for_metric(metric).contains(key)
    }
}

/// Render the span tree followed by a hotspot summary
pub fn format_report(report: &TraceReport, config: &ReportConfig) -> String {
    let hotspots = Hotspots::from_report(report, config.hotspots);
    let mut lines = Vec::with_capacity(report.span_count() + 8);

    lines.push(format!(
        "Crono{} exec_time = dry_time = n° exec_sum = dry_sum",
        "=".repeat(HEADER_RULE)
    ));
    for span in report.iter() {
        lines.push(format_row(report, span, &hotspots, config));
    }

    lines.push(String::new());
    lines.extend(format_hotspots(report, &hotspots, config));

    if !report.unclosed.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "{} span(s) never closed: {}",
            report.unclosed.len(),
            report
                .unclosed
                .iter()
                .map(|id| format!("#{}", id))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    lines.join("\n")
}

fn format_row(
    report: &TraceReport,
    span: &SpanRecord,
    hotspots: &Hotspots,
    config: &ReportConfig,
) -> String {
    let entity = AggregateKey::Entity(span.entity.clone());
    let instance = AggregateKey::Span(span.id);
    let hot_count = !span.checkpoint && hotspots.contains(Metric::InvocationCount, &entity);

    let id = format!("{:<width$}", span.id.to_string(), width = ID_COLUMN_WIDTH);
    let indent = "  ".repeat(span.depth);
    let name_width = config.name_width.saturating_sub(span.depth * 2);
    let name = paint(format!("{:<name_width$}", span.entity), hot_count, config);

    let timings = match (span.duration(), span.own_duration()) {
        (Some(duration), Some(own)) => format!(
            "{} - {}",
            paint(seconds(duration), hotspots.contains(Metric::SpanDuration, &instance), config),
            paint(seconds(own), hotspots.contains(Metric::SpanOwnDuration, &instance), config),
        ),
        _ => paint(UNTERMINATED.to_string(), true, config),
    };

    if span.checkpoint {
        return format!("#{}|{}{} - {} |", id, indent, name, timings);
    }

    let stats = report.aggregates.entity(&span.entity);
    format!(
        "#{}|{}{} - {} | {} {} - {}",
        id,
        indent,
        name,
        timings,
        paint(format!("{:02}", stats.invocations), hot_count, config),
        paint(
            seconds(stats.total()),
            hotspots.contains(Metric::CumulativeDuration, &entity),
            config
        ),
        paint(
            seconds(stats.own()),
            hotspots.contains(Metric::CumulativeOwnDuration, &entity),
            config
        ),
    )
}

fn format_hotspots(report: &TraceReport, hotspots: &Hotspots, config: &ReportConfig) -> Vec<String> {
    let mut lines = vec![format!("Hotspots (top {})", config.hotspots)];

    for metric in Metric::ALL {
        let entries: Vec<String> = hotspots
            .for_metric(metric)
            .iter()
            .map(|key| {
                let value = report.aggregates.value(metric, key);
                match (key, metric) {
                    (AggregateKey::Entity(name), Metric::InvocationCount) => {
                        format!("{} ({})", name, value)
                    }
                    (AggregateKey::Entity(name), _) => {
                        format!("{} ({}s)", name, seconds(Duration::nanoseconds(value)))
                    }
                    (AggregateKey::Span(id), _) => {
                        let entity = report.find(*id).map_or("?", |span| span.entity.as_str());
                        format!("#{} {} ({}s)", id, entity, seconds(Duration::nanoseconds(value)))
                    }
                }
            })
            .collect();

        let listed = if entries.is_empty() {
            "-".to_string()
        } else {
            entries.join(", ")
        };
        lines.push(format!("  {:<24} {}", metric.to_string(), listed));
    }

    lines
}

fn seconds(duration: Duration) -> String {
    let nanos = crate::aggregator::to_nanos(duration);
    format!("{:08.4}", nanos as f64 / 1e9)
}

fn paint(text: String, hot: bool, config: &ReportConfig) -> String {
    if hot && config.color {
        text.red().bold().to_string()
    } else {
        text
    }
}
