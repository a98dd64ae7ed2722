//! SVG flamegraph generation.
//!
//! Hand-written SVG renderer tuned for call trees:
//! - Frame width is proportional to own time accumulated under the frame
//! - Inverted layout (root at bottom)
//! - Hotspot entities drawn in crimson, checkpoints in grey, everything else
//!   in a warm palette

use crate::aggregator::stack_builder::CollapsedStack;
use crate::utils::config::{DEFAULT_FLAMEGRAPH_TITLE, DEFAULT_FLAMEGRAPH_WIDTH};
use crate::utils::error::FlamegraphError;
use indexmap::IndexMap;
use log::info;
use std::fmt::Write;

const ROOT_NAME: &str = "all";
const HOT_COLOR: &str = "rgb(220, 20, 60)";
const ROOT_COLOR: &str = "rgb(100, 149, 237)";
const CHECKPOINT_COLOR: &str = "rgb(176, 176, 176)";

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
    /// Entities drawn with the hotspot color
    pub highlight: Vec<String>,
    /// Labels drawn with the checkpoint color
    ///
    /// Frames are matched by name only, so a regular entity sharing a
    /// checkpoint's label is drawn with the checkpoint color too.
    pub checkpoints: Vec<String>,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_FLAMEGRAPH_TITLE.to_string(),
            width: DEFAULT_FLAMEGRAPH_WIDTH,
            highlight: Vec::new(),
            checkpoints: Vec::new(),
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_highlight(mut self, entities: Vec<String>) -> Self {
        self.highlight = entities;
        self
    }

    pub fn with_checkpoints(mut self, labels: Vec<String>) -> Self {
        self.checkpoints = labels;
        self
    }
}

/// Internal Node structure for building the tree
struct Node {
    name: String,
    value: u64,
    children: IndexMap<String, Node>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            value: 0,
            children: IndexMap::new(),
        }
    }

    fn insert(&mut self, stack: &[&str], value: u64) {
        self.value += value;
        if let Some((head, tail)) = stack.split_first() {
            let child = self
                .children
                .entry(head.to_string())
                .or_insert_with(|| Node::new(head.to_string()));
            child.insert(tail, value);
        }
    }
}

/// Layout parameters shared by every frame
struct Canvas<'a> {
    config: &'a FlamegraphConfig,
    total: u64,
    frame_height: usize,
    graph_height: usize,
}

/// Generate SVG flamegraph from collapsed stacks
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    // 1. Build Tree
    let mut root = Node::new(ROOT_NAME.to_string());
    for stack in stacks {
        let stack_parts: Vec<&str> = stack.stack.split(';').collect();
        root.insert(&stack_parts, stack.weight);
    }

    let max_depth = calculate_max_depth(&root);

    // 2. Render SVG
    let width = config.width;
    let frame_height = 20;
    let graph_height = (max_depth + 1) * frame_height;
    let total_height = graph_height + 40;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, total_height, width, total_height
    );
    svg.push_str(
        r#"<style>.frame { font: 12px sans-serif; } .frame:hover { stroke: black; stroke-width: 1; cursor: pointer; opacity: 0.9; }</style>"#,
    );
    let _ = write!(
        svg,
        r#"<text x="{}" y="20" font-size="16" text-anchor="middle" font-weight="bold">{}</text>"#,
        width / 2,
        escape(&config.title)
    );

    let canvas = Canvas {
        config: &config,
        total: root.value.max(1),
        frame_height,
        graph_height,
    };
    render_node(&root, 0, 0.0, width as f64, &canvas, &mut svg);

    svg.push_str("</svg>");

    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

fn calculate_max_depth(node: &Node) -> usize {
    node.children
        .values()
        .map(|child| calculate_max_depth(child) + 1)
        .max()
        .unwrap_or(0)
}

/// Stable warm color derived from the frame name
fn frame_color(name: &str) -> String {
    let hash = name
        .bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33) ^ u32::from(b));
    let red = 205 + (hash % 50);
    let green = 80 + ((hash >> 8) % 130);
    let blue = (hash >> 16) % 55;
    format!("rgb({}, {}, {})", red, green, blue)
}

fn render_node(node: &Node, level: usize, x: f64, w: f64, canvas: &Canvas<'_>, out: &mut String) {
    if w < 0.5 {
        return;
    }

    let color = if level == 0 {
        ROOT_COLOR.to_string()
    } else if canvas.config.highlight.iter().any(|h| h == &node.name) {
        HOT_COLOR.to_string()
    } else if canvas.config.checkpoints.iter().any(|c| c == &node.name) {
        CHECKPOINT_COLOR.to_string()
    } else {
        frame_color(&node.name)
    };

    // Inverted: root on the bottom row, 30px reserved for the title
    let h = canvas.frame_height;
    let y = canvas.graph_height - ((level + 1) * h) + 30;
    let percentage = node.value as f64 / canvas.total as f64 * 100.0;
    let name = escape(&node.name);

    let _ = write!(
        out,
        r#"<rect x="{:.2}" y="{}" width="{:.2}" height="{}" fill="{}" class="frame"><title>{} ({} us, {:.2}%)</title></rect>"#,
        x, y, w, h, color, name, node.value, percentage
    );

    if w > 35.0 {
        let max_chars = (w / 7.0) as usize;
        let label: String = if node.name.chars().count() > max_chars && max_chars > 3 {
            let cut: String = node.name.chars().take(max_chars - 3).collect();
            format!("{}...", cut)
        } else {
            node.name.clone()
        };
        let _ = write!(
            out,
            r#"<text x="{:.2}" y="{}" dx="4" dy="14" font-size="12" fill="black" pointer-events="none">{}</text>"#,
            x,
            y,
            escape(&label)
        );
    }

    let mut children: Vec<&Node> = node.children.values().collect();
    children.sort_by(|a, b| b.value.cmp(&a.value));

    let mut current_x = x;
    for child in children {
        let child_w = if node.value == 0 {
            0.0
        } else {
            (child.value as f64 / node.value as f64) * w
        };
        render_node(child, level + 1, current_x, child_w, canvas, out);
        current_x += child_w;
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
