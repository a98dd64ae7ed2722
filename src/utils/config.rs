//! Configuration and constants for the tracer, reports and CLI.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// How many keys per metric get highlighted as hotspots
pub const DEFAULT_HOTSPOT_COUNT: usize = 2;

/// Width of the name column at depth 0; each level of nesting eats two columns
pub const NAME_COLUMN_WIDTH: usize = 60;

/// Width of the id column
pub const ID_COLUMN_WIDTH: usize = 3;

/// Default SVG flamegraph width in pixels
pub const DEFAULT_FLAMEGRAPH_WIDTH: usize = 1200;

/// Default SVG flamegraph title
pub const DEFAULT_FLAMEGRAPH_TITLE: &str = "Crono Call Tree";

/// Text report settings
///
/// Every field is optional in the TOML file; missing fields keep their defaults.
///
/// ```toml
/// hotspots = 3
/// color = false
/// name_width = 80
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of top keys highlighted per metric
    pub hotspots: usize,

    /// Emit ANSI color codes
    pub color: bool,

    /// Width of the name column at depth 0
    pub name_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hotspots: DEFAULT_HOTSPOT_COUNT,
            color: true,
            name_width: NAME_COLUMN_WIDTH,
        }
    }
}

impl ReportConfig {
    pub fn with_hotspots(mut self, hotspots: usize) -> Self {
        self.hotspots = hotspots;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Load a report config from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
pub fn load_report_config(path: impl AsRef<Path>) -> Result<ReportConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: ReportConfig = toml::from_str(&contents)?;
    Ok(config)
}
