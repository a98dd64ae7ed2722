//! Spans and the arena that holds the call tree.
//!
//! A span is one timed unit of traced work. All spans of a tracer live by
//! value in a [`SpanTree`]; links between them are [`SpanId`]s, so a parent
//! never holds a reference to its children and nothing can form a cycle.
//!
//! Derived timings:
//! - `duration = end_time - start_time`
//! - `children_duration = sum(duration of each closed direct child)`
//! - `own_duration = duration - children_duration`

pub mod clock;

use crate::utils::error::TraceError;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use clock::{Clock, ManualClock, SystemClock};

/// Sequence number identifying a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(u64);

impl SpanId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One traced unit of work
#[derive(Debug, Clone)]
pub struct Span {
    id: SpanId,
    entity: String,
    is_checkpoint: bool,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    parent: Option<SpanId>,
    children: Vec<SpanId>,
}

impl Span {
    /// Create a span that is already running
    pub fn open(
        id: SpanId,
        entity: impl Into<String>,
        is_checkpoint: bool,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            entity: entity.into(),
            is_checkpoint,
            start_time,
            end_time: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn is_checkpoint(&self) -> bool {
        self.is_checkpoint
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn parent(&self) -> Option<SpanId> {
        self.parent
    }

    /// Direct children in the order they were opened
    pub fn children(&self) -> &[SpanId] {
        &self.children
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Wall-clock time between start and end
    ///
    /// Negative when the clock went backwards while the span was open.
    pub fn duration(&self) -> Result<Duration, TraceError> {
        self.end_time
            .map(|end| end - self.start_time)
            .ok_or(TraceError::NotClosed(self.id))
    }

    pub(crate) fn close(&mut self, at: DateTime<Utc>) -> Result<(), TraceError> {
        if self.end_time.is_some() {
            return Err(TraceError::AlreadyClosed(self.id));
        }
        self.end_time = Some(at);
        Ok(())
    }
}

/// Arena owning every span of one trace, in creation order
#[derive(Debug, Clone, Default)]
pub struct SpanTree {
    spans: IndexMap<SpanId, Span>,
    roots: Vec<SpanId>,
}

impl SpanTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, id: SpanId) -> Option<&Span> {
        self.spans.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SpanId) -> Option<&mut Span> {
        self.spans.get_mut(&id)
    }

    /// Look up a span, failing with `UnknownSpan` when absent
    pub fn span(&self, id: SpanId) -> Result<&Span, TraceError> {
        self.get(id).ok_or(TraceError::UnknownSpan(id))
    }

    /// Top-level spans in the order they were opened
    pub fn roots(&self) -> &[SpanId] {
        &self.roots
    }

    /// All spans in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.spans.values()
    }

    /// Store `span` as the last child of `parent`, or as a root when there
    /// is no such parent
    ///
    /// The parent link is set here and never changes afterwards.
    pub(crate) fn insert(&mut self, mut span: Span, parent: Option<SpanId>) {
        match parent.and_then(|id| self.spans.get_mut(&id)) {
            Some(parent_span) => {
                parent_span.children.push(span.id);
                span.parent = Some(parent_span.id);
            }
            None => self.roots.push(span.id),
        }
        self.spans.insert(span.id, span);
    }

    /// Combined duration of the closed direct children of `id`
    ///
    /// A child that is still open contributes nothing.
    pub fn children_duration(&self, id: SpanId) -> Result<Duration, TraceError> {
        let span = self.span(id)?;
        let mut total = Duration::zero();
        for child in span.children.iter().filter_map(|c| self.get(*c)) {
            if let Ok(duration) = child.duration() {
                total = total + duration;
            }
        }
        Ok(total)
    }

    /// Time spent in the span itself, excluding delegated work
    pub fn own_duration(&self, id: SpanId) -> Result<Duration, TraceError> {
        let duration = self.span(id)?.duration()?;
        Ok(duration - self.children_duration(id)?)
    }

    /// Number of ancestors; 0 for a root
    pub fn depth(&self, id: SpanId) -> Result<usize, TraceError> {
        let mut depth = 0;
        let mut current = self.span(id)?.parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.span(parent)?.parent;
        }
        Ok(depth)
    }

    /// Ids of spans that never closed, in creation order
    pub fn open_spans(&self) -> Vec<SpanId> {
        self.spans
            .values()
            .filter(|span| span.is_open())
            .map(|span| span.id)
            .collect()
    }
}
