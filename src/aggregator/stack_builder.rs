//! Build collapsed stack format from a trace report.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;load_config;parse 1200"
//! This means: main called load_config which called parse, which spent
//! 1200 microseconds of its own time there.
//!
//! A `;` inside an entity name is written as `:` so each span stays one frame.

use crate::report::{SpanRecord, TraceReport};
use indexmap::IndexMap;
use log::debug;
use std::borrow::Cow;

/// Frame separator in a collapsed stack
const FRAME_SEPARATOR: &str = ";";

/// Stand-in for separators found inside entity names
const SEPARATOR_REPLACEMENT: &str = ":";

/// A single collapsed stack entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Own time in microseconds summed over every span on this path
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as a `stack weight` line
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from a report
///
/// # Algorithm
/// 1. Walk the span forest depth-first, tracking the entity path
/// 2. For each closed span, add its own time to its path
/// 3. Sort by weight, heaviest first; equal weights keep first-seen order
///
/// Open spans have no own time and are skipped. Negative own time (clock
/// skew) counts as zero.
pub fn build_collapsed_stacks(report: &TraceReport) -> Vec<CollapsedStack> {
    debug!("Building collapsed stacks from {} spans", report.span_count());

    // Map to aggregate stacks: stack_string -> total_weight
    let mut stack_map: IndexMap<String, u64> = IndexMap::new();
    let mut path: Vec<Cow<'_, str>> = Vec::new();

    for root in &report.spans {
        collect(root, &mut path, &mut stack_map);
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    stacks.sort_by(|a, b| b.weight.cmp(&a.weight));

    debug!("Built {} unique collapsed stacks", stacks.len());

    stacks
}

fn collect<'a>(
    span: &'a SpanRecord,
    path: &mut Vec<Cow<'a, str>>,
    stack_map: &mut IndexMap<String, u64>,
) {
    path.push(frame_name(&span.entity));

    if let Some(own) = span.own_duration() {
        let micros = own.num_microseconds().unwrap_or(i64::MAX).max(0) as u64;
        *stack_map.entry(path.join(FRAME_SEPARATOR)).or_insert(0) += micros;
    }

    for child in &span.children {
        collect(child, path, stack_map);
    }

    path.pop();
}

/// Entity name usable as a single frame
fn frame_name(entity: &str) -> Cow<'_, str> {
    if entity.contains(FRAME_SEPARATOR) {
        Cow::Owned(entity.replace(FRAME_SEPARATOR, SEPARATOR_REPLACEMENT))
    } else {
        Cow::Borrowed(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::span::ManualClock;
    use crate::tracer::Tracer;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("main;execute;parse".to_string(), 1000);
        assert_eq!(stack.to_line(), "main;execute;parse 1000");
    }

    #[test]
    fn test_build_collapsed_stacks_merges_paths() {
        let clock = ManualClock::default();
        let mut tracer = Tracer::with_clock(Arc::new(Aggregator::new()), clock.clone());

        let main = tracer.begin("main");
        for _ in 0..2 {
            let step = tracer.begin("step");
            clock.advance(Duration::milliseconds(3));
            tracer.end(step).unwrap();
        }
        clock.advance(Duration::milliseconds(1));
        tracer.end(main).unwrap();

        let stacks = build_collapsed_stacks(&tracer.report());
        assert_eq!(
            stacks,
            vec![
                CollapsedStack::new("main;step".to_string(), 6000),
                CollapsedStack::new("main".to_string(), 1000),
            ]
        );
    }

    #[test]
    fn test_separator_in_entity_stays_one_frame() {
        let clock = ManualClock::default();
        let mut tracer = Tracer::with_clock(Arc::new(Aggregator::new()), clock.clone());

        let main = tracer.begin("main");
        clock.advance(Duration::milliseconds(1));
        let push = tracer.begin("Vec::push;retry");
        clock.advance(Duration::milliseconds(2));
        tracer.end(push).unwrap();
        tracer.end(main).unwrap();

        let report = tracer.report();
        assert_eq!(report.find(push).unwrap().depth, 1);

        let stacks = build_collapsed_stacks(&report);
        assert_eq!(
            stacks,
            vec![
                CollapsedStack::new("main;Vec::push:retry".to_string(), 2000),
                CollapsedStack::new("main".to_string(), 1000),
            ]
        );
        assert_eq!(stacks[0].stack.split(';').count(), report.find(push).unwrap().depth + 1);

        let svg = crate::flamegraph::generate_flamegraph(&stacks, None).unwrap();
        assert!(svg.contains("<title>Vec::push:retry ("));
        assert!(!svg.contains("<title>retry ("));
    }

    #[test]
    fn test_frame_name() {
        assert_eq!(frame_name("plain"), "plain");
        assert_eq!(frame_name("a;b;c"), "a:b:c");
    }

    #[test]
    fn test_open_spans_are_skipped() {
        let mut tracer = Tracer::new();
        tracer.begin("running");
        assert!(build_collapsed_stacks(&tracer.report()).is_empty());
    }
}
