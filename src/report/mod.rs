//! Report model: a frozen, serializable view of one trace.
//!
//! A [`TraceReport`] holds the span forest (open spans included) and a
//! snapshot of the aggregate counters. Formatters and exporters only ever
//! read reports, so a report loaded back from JSON renders and ranks exactly
//! like the live one it was taken from.

pub mod text;

use crate::aggregator::AggregateSnapshot;
use crate::span::{SpanId, SpanTree};
use crate::utils::config::SCHEMA_VERSION;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub use text::{format_report, Hotspots};

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the report was generated
    pub generated_at: String,

    /// Root spans in creation order, children nested
    pub spans: Vec<SpanRecord>,

    /// Aggregate counters at report time
    pub aggregates: AggregateSnapshot,

    /// Spans that were still open at report time
    #[serde(default)]
    pub unclosed: Vec<SpanId>,
}

/// One span of the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub id: SpanId,

    pub entity: String,

    #[serde(default)]
    pub checkpoint: bool,

    pub depth: usize,

    pub start_time: DateTime<Utc>,

    /// Missing for spans that never closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_nanos: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own_duration_nanos: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SpanRecord>,
}

impl SpanRecord {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_nanos.map(Duration::nanoseconds)
    }

    pub fn own_duration(&self) -> Option<Duration> {
        self.own_duration_nanos.map(Duration::nanoseconds)
    }
}

impl TraceReport {
    /// Freeze `tree` and `aggregates` into a report
    pub fn build(tree: &SpanTree, aggregates: AggregateSnapshot) -> Self {
        let spans = tree
            .roots()
            .iter()
            .filter_map(|id| record(tree, *id, 0))
            .collect();

        Self {
            version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            spans,
            aggregates,
            unclosed: tree.open_spans(),
        }
    }

    /// Every span, depth-first in creation order
    pub fn iter(&self) -> SpanRecords<'_> {
        SpanRecords {
            stack: self.spans.iter().rev().collect(),
        }
    }

    pub fn span_count(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, id: SpanId) -> Option<&SpanRecord> {
        self.iter().find(|span| span.id == id)
    }
}

fn record(tree: &SpanTree, id: SpanId, depth: usize) -> Option<SpanRecord> {
    let span = tree.get(id)?;
    let duration = span.duration().ok();
    let own = tree.own_duration(id).ok();

    Some(SpanRecord {
        id,
        entity: span.entity().to_string(),
        checkpoint: span.is_checkpoint(),
        depth,
        start_time: span.start_time(),
        end_time: span.end_time(),
        duration_nanos: duration.map(crate::aggregator::to_nanos),
        own_duration_nanos: own.map(crate::aggregator::to_nanos),
        children: span
            .children()
            .iter()
            .filter_map(|child| record(tree, *child, depth + 1))
            .collect(),
    })
}

/// Pre-order iterator over a report's span forest
pub struct SpanRecords<'a> {
    stack: Vec<&'a SpanRecord>,
}

impl<'a> Iterator for SpanRecords<'a> {
    type Item = &'a SpanRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}
