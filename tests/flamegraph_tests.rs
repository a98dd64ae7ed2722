use chrono::Duration;
use crono::aggregator::{build_collapsed_stacks, Aggregator};
use crono::flamegraph::{generate_flamegraph, FlamegraphConfig};
use crono::span::ManualClock;
use crono::utils::FlamegraphError;
use crono::Tracer;
use std::sync::Arc;

#[test]
fn test_flamegraph_from_traced_calls() {
    let clock = ManualClock::default();
    let mut tracer = Tracer::with_clock(Arc::new(Aggregator::new()), clock.clone());

    let result = tracer.trace("main", |t| {
        clock.advance(Duration::milliseconds(2));
        t.trace("load", |_| clock.advance(Duration::milliseconds(8)))
    });
    assert!(matches!(result, Ok(Ok(()))));

    let stacks = build_collapsed_stacks(&tracer.report());
    let lines: Vec<String> = stacks.iter().map(|s| s.to_line()).collect();
    assert_eq!(lines, vec!["main;load 8000", "main 2000"]);

    let config = FlamegraphConfig::new()
        .with_title("Startup")
        .with_width(800)
        .with_highlight(vec!["load".to_string()]);
    let svg = generate_flamegraph(&stacks, Some(&config)).unwrap();

    assert!(svg.contains(r#"width="800""#));
    assert!(svg.contains("Startup"));
    assert!(svg.contains("load (8000 us, 80.00%)"));
}

#[test]
fn test_flamegraph_without_closed_spans() {
    let mut tracer = Tracer::new();
    tracer.begin("never closed");

    let stacks = build_collapsed_stacks(&tracer.report());
    assert!(stacks.is_empty());
    assert!(matches!(
        generate_flamegraph(&stacks, None),
        Err(FlamegraphError::EmptyStacks)
    ));
}
