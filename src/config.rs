use crate::parser::DEFAULT_DELIMITER;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs for turning traces into a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Separator between screen names in a raw path.
    pub delimiter: String,
    /// Upper bound on weakest-edge removals before the cycle resolver falls
    /// back to dropping all back edges. The effective budget is
    /// `min(max_cycle_iterations, edge count)`.
    pub max_cycle_iterations: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_cycle_iterations: 100,
        }
    }
}

/// Geometry and styling thresholds for the layered layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    /// Horizontal space between adjacent columns.
    pub column_gap: f32,
    /// Vertical space between stacked nodes of one column.
    pub row_gap: f32,
    /// Margin around the whole canvas.
    pub padding: f32,
    /// Center shorter columns against the tallest one.
    pub center_columns: bool,
    /// Vertical spacing between sibling edge endpoints on one box side.
    pub sibling_offset: f32,
    /// Fraction of the horizontal span used to pull the curve's control
    /// points away from its endpoints.
    pub curvature: f32,
    /// Issue counts above this value mark a node or edge as high severity.
    pub severity_threshold: u64,
    pub min_edge_thickness: f32,
    pub max_edge_thickness: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 56.0,
            column_gap: 80.0,
            row_gap: 24.0,
            padding: 32.0,
            center_columns: true,
            sibling_offset: 6.0,
            curvature: 0.5,
            severity_threshold: 0,
            min_edge_thickness: 1.5,
            max_edge_thickness: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub graph: GraphConfig,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    node_fill: Option<String>,
    node_border_color: Option<String>,
    node_text_color: Option<String>,
    line_color: Option<String>,
    severity_color: Option<String>,
    severity_fill: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    graph: Option<GraphConfig>,
    layout: Option<LayoutConfig>,
    render: Option<RenderConfig>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Merges a JSON config document over the defaults. Every key is optional.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.node_fill {
            config.theme.node_fill = v;
        }
        if let Some(v) = vars.node_border_color {
            config.theme.node_border_color = v;
        }
        if let Some(v) = vars.node_text_color {
            config.theme.node_text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.severity_color {
            config.theme.severity_color = v;
        }
        if let Some(v) = vars.severity_fill {
            config.theme.severity_fill = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(graph) = parsed.graph {
        config.graph = graph;
    }
    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }

    Ok(config)
}
