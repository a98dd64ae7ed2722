//! Running totals used for hotspot ranking.
//!
//! The aggregator keeps two insertion-ordered multisets:
//! - per entity: invocation count, cumulative duration, cumulative own duration
//! - per span instance: duration and own duration
//!
//! Totals only ever grow. Nothing is evicted, so an aggregator is meant to
//! live for one tracing session, not for a long-running process.
//!
//! One aggregator may be shared by several tracers (one per thread); every
//! `record` happens under a single lock so readers never observe a partially
//! applied update. Span ids are allocated here as well, which keeps them
//! unique across all tracers reporting into the same aggregator.

pub mod metrics;
pub mod stack_builder;

use crate::span::SpanId;
use chrono::Duration;
use indexmap::IndexMap;
use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use metrics::{calculate_own_time_distribution, OwnTimeDistribution};
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};

/// Quantity a ranking is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Closed invocations per entity
    InvocationCount,
    /// Sum of durations per entity
    CumulativeDuration,
    /// Sum of own durations per entity
    CumulativeOwnDuration,
    /// Duration per span instance
    SpanDuration,
    /// Own duration per span instance
    SpanOwnDuration,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::InvocationCount,
        Metric::CumulativeDuration,
        Metric::CumulativeOwnDuration,
        Metric::SpanDuration,
        Metric::SpanOwnDuration,
    ];

    /// True when the metric is keyed by entity rather than by span instance
    pub fn is_entity_metric(self) -> bool {
        matches!(
            self,
            Metric::InvocationCount | Metric::CumulativeDuration | Metric::CumulativeOwnDuration
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::InvocationCount => "invocation_count",
            Metric::CumulativeDuration => "cumulative_duration",
            Metric::CumulativeOwnDuration => "cumulative_own_duration",
            Metric::SpanDuration => "span_duration",
            Metric::SpanOwnDuration => "span_own_duration",
        };
        f.write_str(name)
    }
}

/// Key of one aggregated counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKey {
    Entity(String),
    Span(SpanId),
}

impl AggregateKey {
    pub fn entity(name: impl Into<String>) -> Self {
        AggregateKey::Entity(name.into())
    }
}

/// Totals for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub invocations: u64,
    pub total_nanos: i64,
    pub own_nanos: i64,
}

impl EntityStats {
    pub fn total(&self) -> Duration {
        Duration::nanoseconds(self.total_nanos)
    }

    pub fn own(&self) -> Duration {
        Duration::nanoseconds(self.own_nanos)
    }
}

/// Totals for one span instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStats {
    pub total_nanos: i64,
    pub own_nanos: i64,
}

impl SpanStats {
    pub fn total(&self) -> Duration {
        Duration::nanoseconds(self.total_nanos)
    }

    pub fn own(&self) -> Duration {
        Duration::nanoseconds(self.own_nanos)
    }
}

/// Point-in-time copy of every counter, in first-seen key order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub entities: IndexMap<String, EntityStats>,
    pub spans: IndexMap<SpanId, SpanStats>,
}

impl AggregateSnapshot {
    fn record(&mut self, entity: &str, span: SpanId, duration: i64, own: i64) {
        // `entry` would allocate a String on every hit
        match self.entities.get_mut(entity) {
            Some(stats) => add_entity(stats, duration, own),
            None => {
                let mut stats = EntityStats::default();
                add_entity(&mut stats, duration, own);
                self.entities.insert(entity.to_string(), stats);
            }
        }

        let stats = self.spans.entry(span).or_default();
        stats.total_nanos = stats.total_nanos.saturating_add(duration);
        stats.own_nanos = stats.own_nanos.saturating_add(own);
    }
}

fn add_entity(stats: &mut EntityStats, duration: i64, own: i64) {
    stats.invocations += 1;
    stats.total_nanos = stats.total_nanos.saturating_add(duration);
    stats.own_nanos = stats.own_nanos.saturating_add(own);
}

/// Convert to nanoseconds, saturating instead of failing on overflow
pub(crate) fn to_nanos(duration: Duration) -> i64 {
    duration.num_nanoseconds().unwrap_or(if duration < Duration::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Shared, lock-protected aggregation state
#[derive(Debug)]
pub struct Aggregator {
    state: Mutex<AggregateSnapshot>,
    next_id: AtomicU64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            state: Mutex::new(AggregateSnapshot::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next span id; ids start at 1 and are never reused
    pub fn next_span_id(&self) -> SpanId {
        SpanId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Fold one closed span into every counter
    pub fn record(&self, entity: &str, span: SpanId, duration: Duration, own_duration: Duration) {
        let duration = to_nanos(duration);
        let own = to_nanos(own_duration);
        trace!("record {} #{}: {}ns ({}ns own)", entity, span, duration, own);
        self.state.lock().record(entity, span, duration, own);
    }

    /// The `k` keys with the largest value for `metric`
    ///
    /// Ties go to the key that was recorded first.
    pub fn top(&self, metric: Metric, k: usize) -> Vec<AggregateKey> {
        self.state.lock().top(metric, k)
    }

    /// Current value of a counter; unknown keys read as 0
    pub fn value(&self, metric: Metric, key: &AggregateKey) -> i64 {
        self.state.lock().value(metric, key)
    }

    pub fn entity_stats(&self, entity: &str) -> EntityStats {
        self.state.lock().entity(entity)
    }

    pub fn span_stats(&self, span: SpanId) -> SpanStats {
        self.state.lock().span(span)
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        self.state.lock().clone()
    }
}
