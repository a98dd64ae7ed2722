//! Crono
//!
//! Hierarchical call-tree tracing with own-time accounting.
//!
//! Instrumented code opens a span before a unit of work and closes it after.
//! Spans nest into a call tree; every span knows its total duration and its
//! own duration (total minus the time spent in closed children). A shared
//! [`Aggregator`] accumulates invocation counts and cumulative durations per
//! entity and per span, and answers top-K queries used to highlight hotspots.
//!
//! ## Getting Started
//!
//! ```ignore
//! use crono::Tracer;
//!
//! let mut tracer = Tracer::new();
//! let load = tracer.begin("load_config");
//! // ... work ...
//! tracer.checkpoint("config parsed");
//! // ... more work, closed implicitly by the next begin ...
//! tracer.end(load)?;
//!
//! let report = tracer.report();
//! crono::output::write_report(&report, "trace.json")?;
//! ```
//!
//! Saved reports can be inspected with the `crono` CLI:
//!
//! ```bash
//! crono show -f trace.json --top 3
//! crono flamegraph -f trace.json -o flamegraph.svg
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod report;
pub mod span;
pub mod tracer;
pub mod utils;

pub use aggregator::{AggregateKey, AggregateSnapshot, Aggregator, Metric};
pub use report::{SpanRecord, TraceReport};
pub use span::{Span, SpanId, SpanTree};
pub use tracer::{SpanTiming, Tracer};
pub use utils::TraceError;
