pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, GraphConfig, LayoutConfig, RenderConfig};
pub use error::{FlowError, FlowResult, Warning};
pub use graph::{GraphBuild, NodeSource, build_graph, build_graph_from_edges, build_tree_graph};
pub use ir::{Edge, FlowInput, Graph, GraphKind, NodeMetrics, PathTrace, Rank, TraceBatch, TreeNode};
pub use layout::{Layout, Severity, compute_layout};
pub use render::render_svg;
pub use theme::Theme;

use serde::Serialize;

/// Everything the engine produces for one input: the acyclic graph, its
/// positioned layout and any non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDiagram {
    pub graph: Graph,
    pub layout: Layout,
    pub warnings: Vec<Warning>,
}

/// Runs the whole pipeline for any [`NodeSource`].
pub fn build_diagram<S>(source: &S, graph_config: &GraphConfig, layout_config: &LayoutConfig) -> FlowDiagram
where
    S: NodeSource + ?Sized,
{
    let GraphBuild { graph, warnings } = source.build_graph(graph_config);
    let layout = compute_layout(&graph, layout_config);
    FlowDiagram {
        graph,
        layout,
        warnings,
    }
}

/// Parses `input` (trace text, trace JSON or a tree document) and renders it
/// straight to an SVG string.
pub fn render_traces_svg(input: &str, config: &Config) -> FlowResult<String> {
    let parsed = parser::parse_input(input)?;
    let diagram = build_diagram(&parsed, &config.graph, &config.layout);
    Ok(render_svg(&diagram.layout, &config.theme, &config.layout))
}
