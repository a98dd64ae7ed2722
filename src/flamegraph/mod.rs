//! Flamegraph generation.
//!
//! This module converts collapsed stacks into SVG flamegraphs.
//! Flamegraphs show at a glance where own time accumulates in the call tree.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, FlamegraphConfig};
