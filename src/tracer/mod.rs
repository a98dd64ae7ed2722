//! Call stack tracer.
//!
//! The tracer models one logical call stack. Instrumentation calls
//! [`Tracer::begin`] before a unit of work and [`Tracer::end`] after it, in
//! strict LIFO order. Each closed span is folded into the shared
//! [`Aggregator`].
//!
//! Checkpoints are named markers inside a call. A checkpoint stays open until
//! the next span is opened at any position, at which point it is closed at
//! the exact instant the new span starts. That makes consecutive checkpoints
//! siblings that partition their parent's time into phases.
//!
//! A tracer is not meant to be shared between threads. Give each thread its
//! own tracer and let them report into one `Arc<Aggregator>`.

use crate::aggregator::Aggregator;
use crate::report::TraceReport;
use crate::span::{Clock, Span, SpanId, SpanTree, SystemClock};
use crate::utils::error::TraceError;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::sync::Arc;

/// Timings of a span at the moment it closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanTiming {
    pub duration: Duration,
    pub own_duration: Duration,
}

/// Builds the call tree for one logical call stack
#[derive(Debug)]
pub struct Tracer<C: Clock = SystemClock> {
    tree: SpanTree,
    active: Option<SpanId>,
    aggregator: Arc<Aggregator>,
    clock: C,
}

impl Tracer<SystemClock> {
    /// Tracer with its own private aggregator
    pub fn new() -> Self {
        Self::with_aggregator(Arc::new(Aggregator::new()))
    }

    /// Tracer reporting into a shared aggregator
    pub fn with_aggregator(aggregator: Arc<Aggregator>) -> Self {
        Self::with_clock(aggregator, SystemClock)
    }
}

impl Default for Tracer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Tracer<C> {
    pub fn with_clock(aggregator: Arc<Aggregator>, clock: C) -> Self {
        Self {
            tree: SpanTree::new(),
            active: None,
            aggregator,
            clock,
        }
    }

    /// Open a span for `entity` below the current position
    pub fn begin(&mut self, entity: impl Into<String>) -> SpanId {
        self.begin_span(entity, false)
    }

    /// Drop a named marker at the current position
    ///
    /// The marker is closed by the next `begin`/`checkpoint`, by an explicit
    /// `end`, or never; in the last case it shows up as unterminated.
    pub fn checkpoint(&mut self, label: impl Into<String>) -> SpanId {
        self.begin_span(label, true)
    }

    /// Open a span, closing the active checkpoint first if there is one
    pub fn begin_span(&mut self, entity: impl Into<String>, is_checkpoint: bool) -> SpanId {
        let id = self.aggregator.next_span_id();
        let now = self.clock.now();
        let span = Span::open(id, entity, is_checkpoint, now);

        if let Some(active) = self.active {
            if self.tree.get(active).is_some_and(Span::is_checkpoint) {
                if let Err(err) = self.close(active, now) {
                    warn!("Failed to close checkpoint {}: {}", active, err);
                }
            }
        }

        debug!(
            "begin #{} {}{} under {}",
            id,
            span.entity(),
            if is_checkpoint { " (checkpoint)" } else { "" },
            self.active.map_or_else(|| "root".to_string(), |p| format!("#{}", p))
        );
        // A checkpoint that was itself a root leaves no active span behind,
        // so the new span starts a new root.
        self.tree.insert(span, self.active);
        self.active = Some(id);
        id
    }

    /// Close `id`, which must be the active span
    ///
    /// Closing the parent of an open checkpoint is allowed; the checkpoint
    /// then stays open and does not count towards the parent's children.
    ///
    /// # Errors
    /// * `TraceError::UnknownSpan` - `id` was never opened by this tracer
    /// * `TraceError::AlreadyClosed` - `id` was closed before
    /// * `TraceError::NonLifoClose` - a span opened after `id` is still running
    pub fn end(&mut self, id: SpanId) -> Result<SpanTiming, TraceError> {
        if self.tree.span(id)?.is_closed() {
            warn!("Span #{} closed twice", id);
            return Err(TraceError::AlreadyClosed(id));
        }

        if !self.can_close(id) {
            warn!("Span #{} closed out of order, active is {:?}", id, self.active);
            return Err(TraceError::NonLifoClose {
                span: id,
                active: self.active,
            });
        }

        let now = self.clock.now();
        self.close(id, now)
    }

    /// Run `work` inside a span for `entity`
    ///
    /// `work` receives the tracer so it can open nested spans.
    pub fn trace<T>(
        &mut self,
        entity: impl Into<String>,
        work: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, TraceError> {
        let id = self.begin(entity);
        let value = work(self);
        self.end(id)?;
        Ok(value)
    }

    fn can_close(&self, id: SpanId) -> bool {
        match self.active {
            Some(active) if active == id => true,
            Some(active) => self
                .tree
                .get(active)
                .is_some_and(|span| span.is_checkpoint() && span.parent() == Some(id)),
            None => false,
        }
    }

    fn close(&mut self, id: SpanId, at: DateTime<Utc>) -> Result<SpanTiming, TraceError> {
        let span = self.tree.get_mut(id).ok_or(TraceError::UnknownSpan(id))?;
        span.close(at)?;
        let parent = span.parent();
        let is_checkpoint = span.is_checkpoint();

        let timing = SpanTiming {
            duration: span.duration()?,
            own_duration: self.tree.own_duration(id)?,
        };

        let span = self.tree.span(id)?;
        if !is_checkpoint {
            self.aggregator
                .record(span.entity(), id, timing.duration, timing.own_duration);
        }
        if timing.duration < Duration::zero() {
            warn!("Span #{} {} has a negative duration, clock went backwards", id, span.entity());
        }
        debug!(
            "end #{} {}: {}us ({}us own)",
            id,
            span.entity(),
            timing.duration.num_microseconds().unwrap_or(i64::MAX),
            timing.own_duration.num_microseconds().unwrap_or(i64::MAX)
        );

        self.active = parent;
        Ok(timing)
    }

    /// The span currently at the top of the logical stack
    pub fn active(&self) -> Option<SpanId> {
        self.active
    }

    pub fn span(&self, id: SpanId) -> Option<&Span> {
        self.tree.get(id)
    }

    pub fn roots(&self) -> &[SpanId] {
        self.tree.roots()
    }

    pub fn tree(&self) -> &SpanTree {
        &self.tree
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Spans that have not been closed, in creation order
    pub fn unclosed(&self) -> Vec<SpanId> {
        self.tree.open_spans()
    }

    /// Freeze the call tree and the aggregate counters for reporting
    pub fn report(&self) -> TraceReport {
        for id in self.unclosed() {
            if let Some(span) = self.tree.get(id) {
                warn!("Span #{} {} is still open", id, span.entity());
            }
        }
        TraceReport::build(&self.tree, self.aggregator.snapshot())
    }
}
