use crate::flamegraph::FlamegraphConfig;
use std::path::PathBuf;

/// Arguments for the show command
#[derive(Debug, Clone, Default)]
pub struct ShowArgs {
    /// Path to the JSON trace report
    pub input: PathBuf,

    /// Hotspots per metric (overrides the config file)
    pub top: Option<usize>,

    /// Disable ANSI colors
    pub no_color: bool,

    /// Optional TOML report config
    pub config: Option<PathBuf>,
}

/// Arguments for the flamegraph command
#[derive(Debug, Clone)]
pub struct FlamegraphArgs {
    /// Path to the JSON trace report
    pub input: PathBuf,

    /// Output path for the SVG
    pub output: PathBuf,

    /// Entities highlighted as hotspots (top N by cumulative own time)
    pub top: usize,

    /// Flamegraph configuration
    pub flamegraph_config: FlamegraphConfig,
}

impl Default for FlamegraphArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("trace.json"),
            output: PathBuf::from("flamegraph.svg"),
            top: crate::utils::config::DEFAULT_HOTSPOT_COUNT,
            flamegraph_config: FlamegraphConfig::default(),
        }
    }
}
