use chrono::Duration;
use crono::aggregator::{AggregateKey, Aggregator, Metric};
use crono::span::ManualClock;
use crono::{TraceError, Tracer};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

fn manual_tracer() -> (Tracer<ManualClock>, ManualClock) {
    let clock = ManualClock::default();
    let tracer = Tracer::with_clock(Arc::new(Aggregator::new()), clock.clone());
    (tracer, clock)
}

fn secs(duration: Duration) -> f64 {
    duration.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
}

#[test]
fn test_well_nested_children_fit_inside_parent() {
    let (mut tracer, clock) = manual_tracer();

    let root = tracer.begin("root");
    for ms in [5, 12, 3] {
        let child = tracer.begin("child");
        clock.advance(Duration::milliseconds(ms));
        let grandchild = tracer.begin("grandchild");
        clock.advance(Duration::milliseconds(1));
        tracer.end(grandchild).unwrap();
        tracer.end(child).unwrap();
        clock.advance(Duration::milliseconds(2));
    }
    tracer.end(root).unwrap();

    let tree = tracer.tree();
    for span in tree.iter() {
        let duration = span.duration().unwrap();
        let children = tree.children_duration(span.id()).unwrap();
        assert!(children <= duration, "children exceed #{}", span.id());
        assert!(tree.own_duration(span.id()).unwrap() >= Duration::zero());
    }
}

#[test]
fn test_depth_follows_nesting() {
    let (mut tracer, _clock) = manual_tracer();

    let a = tracer.begin("a");
    let b = tracer.begin("b");
    let c = tracer.begin("c");
    tracer.end(c).unwrap();
    tracer.end(b).unwrap();
    tracer.end(a).unwrap();

    let tree = tracer.tree();
    assert_eq!(tree.depth(a).unwrap(), 0);
    assert_eq!(tree.depth(b).unwrap(), tree.depth(a).unwrap() + 1);
    assert_eq!(tree.depth(c).unwrap(), tree.depth(b).unwrap() + 1);
}

#[test]
fn test_aggregator_counters_never_decrease() {
    let (mut tracer, clock) = manual_tracer();
    let key = AggregateKey::entity("work");
    let mut previous = [0i64; 3];

    for _ in 0..5 {
        let id = tracer.begin("work");
        clock.advance(Duration::milliseconds(4));
        tracer.end(id).unwrap();

        let aggregator = tracer.aggregator();
        let current = [
            aggregator.value(Metric::InvocationCount, &key),
            aggregator.value(Metric::CumulativeDuration, &key),
            aggregator.value(Metric::CumulativeOwnDuration, &key),
        ];
        for (now, before) in current.iter().zip(previous.iter()) {
            assert!(now >= before);
        }
        previous = current;
    }

    assert_eq!(previous[0], 5);
    assert_eq!(previous[1], Duration::milliseconds(20).num_nanoseconds().unwrap());
}

#[test]
fn test_checkpoint_closes_when_next_span_begins() {
    let (mut tracer, clock) = manual_tracer();

    let a = tracer.begin("A");
    clock.advance(Duration::milliseconds(1));
    let x = tracer.checkpoint("x");
    clock.advance(Duration::milliseconds(2));
    let b = tracer.begin("B");
    clock.advance(Duration::milliseconds(3));
    tracer.end(b).unwrap();
    tracer.end(a).unwrap();

    let checkpoint = tracer.span(x).unwrap();
    let span_b = tracer.span(b).unwrap();
    assert_eq!(checkpoint.end_time(), Some(span_b.start_time()));
    assert_eq!(checkpoint.parent(), Some(a));
    assert_eq!(span_b.parent(), Some(a));
    assert_eq!(tracer.span(a).unwrap().children(), &[x, b]);
    assert!(tracer.unclosed().is_empty());
}

#[test]
fn test_double_end_is_rejected() {
    let (mut tracer, _clock) = manual_tracer();

    let a = tracer.begin("A");
    tracer.end(a).unwrap();

    assert_eq!(tracer.end(a), Err(TraceError::AlreadyClosed(a)));
    assert_eq!(
        tracer.aggregator().value(Metric::InvocationCount, &AggregateKey::entity("A")),
        1
    );
}

#[test]
fn test_top_invocation_count_prefers_first_recorded_on_tie() {
    let (mut tracer, _clock) = manual_tracer();

    for entity in ["alpha", "beta", "beta", "alpha", "gamma"] {
        let id = tracer.begin(entity);
        tracer.end(id).unwrap();
    }

    assert_eq!(
        tracer.aggregator().top(Metric::InvocationCount, 1),
        vec![AggregateKey::entity("alpha")]
    );

    let id = tracer.begin("beta");
    tracer.end(id).unwrap();
    assert_eq!(
        tracer.aggregator().top(Metric::InvocationCount, 1),
        vec![AggregateKey::entity("beta")]
    );
}

#[test]
fn test_top_level_checkpoint_then_begin_starts_new_root() {
    let (mut tracer, _clock) = manual_tracer();

    let mark = tracer.checkpoint("startup");
    let main = tracer.begin("main");
    tracer.end(main).unwrap();

    assert!(tracer.span(mark).unwrap().is_closed());
    assert_eq!(tracer.span(main).unwrap().parent(), None);
    assert_eq!(tracer.roots(), &[mark, main]);
}

#[test]
fn test_non_lifo_end_leaves_state_untouched() {
    let (mut tracer, _clock) = manual_tracer();

    let outer = tracer.begin("outer");
    let inner = tracer.begin("inner");

    assert_eq!(
        tracer.end(outer),
        Err(TraceError::NonLifoClose {
            span: outer,
            active: Some(inner),
        })
    );
    assert_eq!(tracer.active(), Some(inner));
    assert!(tracer.span(outer).unwrap().is_open());
}

#[test]
fn test_trailing_checkpoint_stays_open_and_unaggregated() {
    let (mut tracer, clock) = manual_tracer();

    let main = tracer.begin("main");
    clock.advance(Duration::milliseconds(5));
    let tail = tracer.checkpoint("tail");
    clock.advance(Duration::milliseconds(5));
    let timing = tracer.end(main).unwrap();

    assert_eq!(timing.duration, Duration::milliseconds(10));
    assert_eq!(timing.own_duration, Duration::milliseconds(10));
    assert_eq!(tracer.unclosed(), vec![tail]);

    let report = tracer.report();
    assert_eq!(report.unclosed, vec![tail]);
    assert!(report.find(tail).unwrap().is_open());
    assert!(!report.aggregates.entities.contains_key("tail"));
}

#[test]
fn test_threads_share_one_aggregator() {
    let aggregator = Arc::new(Aggregator::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                let mut tracer = Tracer::with_aggregator(aggregator);
                for _ in 0..25 {
                    let id = tracer.begin("worker");
                    tracer.end(id).unwrap();
                }
                tracer.roots().to_vec()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 100);
    assert_eq!(aggregator.entity_stats("worker").invocations, 100);
}

#[test]
fn test_single_span_wall_clock() {
    let mut tracer = Tracer::new();

    let id = tracer.begin("X");
    thread::sleep(StdDuration::from_millis(100));
    let timing = tracer.end(id).unwrap();

    let duration = secs(timing.duration);
    assert!((0.09..0.5).contains(&duration), "duration {}", duration);
    assert_eq!(timing.duration, timing.own_duration);
    assert_eq!(tracer.tree().children_duration(id).unwrap(), Duration::zero());
}

#[test]
fn test_parent_child_wall_clock() {
    let mut tracer = Tracer::new();

    let parent = tracer.begin("P");
    thread::sleep(StdDuration::from_millis(50));
    let child = tracer.trace("C", |_| thread::sleep(StdDuration::from_millis(50)));
    assert!(child.is_ok());
    let timing = tracer.end(parent).unwrap();

    let child_id = tracer.span(parent).unwrap().children()[0];
    let child_duration = secs(tracer.span(child_id).unwrap().duration().unwrap());

    assert!(secs(timing.duration) >= 0.095, "P {}", secs(timing.duration));
    assert!(secs(timing.own_duration) >= 0.045, "P own {}", secs(timing.own_duration));
    assert!(child_duration >= 0.045, "C {}", child_duration);
    assert!(timing.own_duration < timing.duration);
}
