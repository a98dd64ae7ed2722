//! Rankings and summary statistics over aggregated counters.
//!
//! Hotspots are the entities or span instances with the largest value for a
//! metric. They are the primary targets for optimization.

use super::{AggregateKey, AggregateSnapshot, EntityStats, Metric, SpanStats};
use crate::span::SpanId;
use chrono::Duration;
use log::debug;

/// Keys of the `k` largest values, ties resolved by iteration order
///
/// Callers pass entries in first-seen order; the sort is stable, so an
/// earlier key wins against a later one with the same value.
fn rank<K>(entries: impl Iterator<Item = (K, i64)>, k: usize) -> Vec<K> {
    let mut ranked: Vec<(K, i64)> = entries.collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(k).map(|(key, _)| key).collect()
}

fn entity_value(stats: &EntityStats, metric: Metric) -> i64 {
    match metric {
        Metric::InvocationCount => i64::try_from(stats.invocations).unwrap_or(i64::MAX),
        Metric::CumulativeDuration => stats.total_nanos,
        Metric::CumulativeOwnDuration => stats.own_nanos,
        Metric::SpanDuration | Metric::SpanOwnDuration => 0,
    }
}

fn span_value(stats: &SpanStats, metric: Metric) -> i64 {
    match metric {
        Metric::SpanDuration => stats.total_nanos,
        Metric::SpanOwnDuration => stats.own_nanos,
        _ => 0,
    }
}

impl AggregateSnapshot {
    /// The `k` keys with the largest value for `metric`
    pub fn top(&self, metric: Metric, k: usize) -> Vec<AggregateKey> {
        if metric.is_entity_metric() {
            rank(
                self.entities
                    .iter()
                    .map(|(name, stats)| (name, entity_value(stats, metric))),
                k,
            )
            .into_iter()
            .map(|name| AggregateKey::Entity(name.clone()))
            .collect()
        } else {
            rank(
                self.spans
                    .iter()
                    .map(|(id, stats)| (*id, span_value(stats, metric))),
                k,
            )
            .into_iter()
            .map(AggregateKey::Span)
            .collect()
        }
    }

    /// Whether `key` is among the top `k` for `metric`
    pub fn is_top(&self, metric: Metric, key: &AggregateKey, k: usize) -> bool {
        self.top(metric, k).contains(key)
    }

    /// Value of a counter; keys of the wrong kind or never recorded read as 0
    pub fn value(&self, metric: Metric, key: &AggregateKey) -> i64 {
        match key {
            AggregateKey::Entity(name) if metric.is_entity_metric() => self
                .entities
                .get(name)
                .map_or(0, |stats| entity_value(stats, metric)),
            AggregateKey::Span(id) if !metric.is_entity_metric() => self
                .spans
                .get(id)
                .map_or(0, |stats| span_value(stats, metric)),
            _ => 0,
        }
    }

    pub fn entity(&self, entity: &str) -> EntityStats {
        self.entities.get(entity).copied().unwrap_or_default()
    }

    pub fn span(&self, span: SpanId) -> SpanStats {
        self.spans.get(&span).copied().unwrap_or_default()
    }
}

/// How own time is spread across span instances
#[derive(Debug, Clone)]
pub struct OwnTimeDistribution {
    /// Own time summed over all recorded spans
    pub total_own: Duration,

    /// Number of recorded spans
    pub span_count: usize,

    pub mean_own: Duration,

    pub median_own: Duration,

    /// Own time of the costliest 10% of spans
    pub top_10_percent_own: Duration,

    /// Share of total own time held by the costliest 10%
    pub top_10_percent_percentage: f64,
}

impl Default for OwnTimeDistribution {
    fn default() -> Self {
        Self {
            total_own: Duration::zero(),
            span_count: 0,
            mean_own: Duration::zero(),
            median_own: Duration::zero(),
            top_10_percent_own: Duration::zero(),
            top_10_percent_percentage: 0.0,
        }
    }
}

impl OwnTimeDistribution {
    /// Returns true if the top 10% of spans hold more than 80% of own time
    pub fn is_highly_concentrated(&self) -> bool {
        self.top_10_percent_percentage > 80.0
    }

    /// Human-readable summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Own time: {:.4}s | Spans: {} | Mean: {:.4}s | Median: {:.4}s | Top 10%: {:.1}%",
            seconds(self.total_own),
            self.span_count,
            seconds(self.mean_own),
            seconds(self.median_own),
            self.top_10_percent_percentage
        )
    }
}

fn seconds(duration: Duration) -> f64 {
    super::to_nanos(duration) as f64 / 1e9
}

/// Calculate own-time distribution statistics over span instances
pub fn calculate_own_time_distribution(snapshot: &AggregateSnapshot) -> OwnTimeDistribution {
    if snapshot.spans.is_empty() {
        return OwnTimeDistribution::default();
    }

    let mut own: Vec<i64> = snapshot.spans.values().map(|s| s.own_nanos).collect();
    own.sort_unstable_by(|a, b| b.cmp(a));

    let count = own.len();
    let total: i64 = own.iter().fold(0i64, |acc, v| acc.saturating_add(*v));
    let mean = total / count as i64;
    let median = own[count / 2];

    let top_count = (count as f64 * 0.1).ceil() as usize;
    let top: i64 = own
        .iter()
        .take(top_count)
        .fold(0i64, |acc, v| acc.saturating_add(*v));

    debug!("Own time distribution over {} spans", count);

    OwnTimeDistribution {
        total_own: Duration::nanoseconds(total),
        span_count: count,
        mean_own: Duration::nanoseconds(mean),
        median_own: Duration::nanoseconds(median),
        top_10_percent_own: Duration::nanoseconds(top),
        top_10_percent_percentage: if total > 0 {
            (top as f64 / total as f64) * 100.0
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn names(keys: Vec<AggregateKey>) -> Vec<String> {
        keys.into_iter()
            .map(|key| match key {
                AggregateKey::Entity(name) => name,
                AggregateKey::Span(id) => format!("#{}", id),
            })
            .collect()
    }

    #[test]
    fn test_top_by_invocation_count() {
        let agg = Aggregator::new();
        agg.record("a", SpanId::new(1), ms(1), ms(1));
        agg.record("b", SpanId::new(2), ms(1), ms(1));
        agg.record("b", SpanId::new(3), ms(1), ms(1));
        agg.record("c", SpanId::new(4), ms(1), ms(1));

        assert_eq!(names(agg.top(Metric::InvocationCount, 1)), vec!["b"]);
        assert_eq!(names(agg.top(Metric::InvocationCount, 2)), vec!["b", "a"]);
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let agg = Aggregator::new();
        agg.record("first", SpanId::new(1), ms(5), ms(5));
        agg.record("second", SpanId::new(2), ms(5), ms(5));

        assert_eq!(names(agg.top(Metric::InvocationCount, 1)), vec!["first"]);
        assert_eq!(
            agg.top(Metric::SpanDuration, 1),
            vec![AggregateKey::Span(SpanId::new(1))]
        );
    }

    #[test]
    fn test_top_k_larger_than_keys() {
        let agg = Aggregator::new();
        agg.record("only", SpanId::new(1), ms(3), ms(2));
        assert_eq!(agg.top(Metric::CumulativeOwnDuration, 10).len(), 1);
    }

    #[test]
    fn test_span_metrics_rank_instances() {
        let agg = Aggregator::new();
        // `fast` is called more often, one `slow` call dominates
        agg.record("fast", SpanId::new(1), ms(2), ms(2));
        agg.record("fast", SpanId::new(2), ms(2), ms(2));
        agg.record("slow", SpanId::new(3), ms(90), ms(10));

        assert_eq!(names(agg.top(Metric::InvocationCount, 1)), vec!["fast"]);
        assert_eq!(
            agg.top(Metric::SpanDuration, 1),
            vec![AggregateKey::Span(SpanId::new(3))]
        );
        assert_eq!(names(agg.top(Metric::CumulativeOwnDuration, 1)), vec!["slow"]);
    }

    #[test]
    fn test_value_with_mismatched_key_kind() {
        let agg = Aggregator::new();
        agg.record("a", SpanId::new(1), ms(3), ms(2));
        assert_eq!(
            agg.value(Metric::SpanDuration, &AggregateKey::entity("a")),
            0
        );
        assert_eq!(
            agg.value(Metric::CumulativeDuration, &AggregateKey::entity("a")),
            3_000_000
        );
    }

    #[test]
    fn test_own_time_distribution() {
        let agg = Aggregator::new();
        agg.record("a", SpanId::new(1), ms(800), ms(800));
        agg.record("b", SpanId::new(2), ms(100), ms(100));
        agg.record("c", SpanId::new(3), ms(50), ms(50));
        agg.record("d", SpanId::new(4), ms(50), ms(50));

        let dist = calculate_own_time_distribution(&agg.snapshot());
        assert_eq!(dist.span_count, 4);
        assert_eq!(dist.total_own, ms(1000));
        assert_eq!(dist.mean_own, ms(250));
        assert_eq!(dist.top_10_percent_own, ms(800));
        assert!(!dist.is_highly_concentrated());
    }

    #[test]
    fn test_own_time_distribution_empty() {
        let dist = calculate_own_time_distribution(&AggregateSnapshot::default());
        assert_eq!(dist.span_count, 0);
        assert_eq!(dist.total_own, Duration::zero());
    }

    #[test]
    fn test_own_time_distribution_saturates() {
        let mut snapshot = AggregateSnapshot::default();
        for raw in 1..=11 {
            snapshot.spans.insert(
                SpanId::new(raw),
                SpanStats {
                    total_nanos: i64::MAX,
                    own_nanos: i64::MAX,
                },
            );
        }

        let dist = calculate_own_time_distribution(&snapshot);
        assert_eq!(dist.span_count, 11);
        assert_eq!(dist.total_own, Duration::nanoseconds(i64::MAX));
        assert_eq!(dist.top_10_percent_own, Duration::nanoseconds(i64::MAX));
    }
}
