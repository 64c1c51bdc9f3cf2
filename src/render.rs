use crate::config::LayoutConfig;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::layout::{EdgeLayout, Layout, NodeLayout, Severity};
use crate::theme::Theme;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Smallest canvas side emitted, so an empty diagram still renders.
const MIN_CANVAS: f32 = 200.0;
/// Rough glyph advance relative to font size, used to truncate labels.
const GLYPH_WIDTH_RATIO: f32 = 0.6;
/// Horizontal text inset inside a node box.
const LABEL_INSET: f32 = 12.0;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(MIN_CANVAS);
    let height = layout.height.max(MIN_CANVAS);

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );

    svg.push_str("<defs>");
    push_marker(&mut svg, "arrow", &theme.line_color);
    push_marker(&mut svg, "arrow-severity", &theme.severity_color);
    svg.push_str("</defs>");

    svg.push_str("<g class=\"edges\">");
    for edge in &layout.edges {
        push_edge(&mut svg, edge, theme);
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for column in &layout.columns {
        for id in column {
            if let Some(node) = layout.nodes.get(id) {
                push_node(&mut svg, node, theme, config);
            }
        }
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn push_marker(svg: &mut String, id: &str, fill: &str) {
    let _ = write!(
        svg,
        "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" markerUnits=\"userSpaceOnUse\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{fill}\"/></marker>",
    );
}

fn push_edge(svg: &mut String, edge: &EdgeLayout, theme: &Theme) {
    let (stroke, marker) = match edge.severity {
        Severity::High => (theme.severity_color.as_str(), "arrow-severity"),
        Severity::Normal => (theme.line_color.as_str(), "arrow"),
    };
    let _ = write!(
        svg,
        "<path class=\"edge {}\" data-source=\"{}\" data-target=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{:.2}\" stroke-opacity=\"0.85\" marker-end=\"url(#{marker})\"><title>{} → {}: {}</title></path>",
        edge.severity.token(),
        escape_xml(&edge.source),
        escape_xml(&edge.target),
        edge.path_data(),
        edge.thickness,
        escape_xml(&edge.source),
        escape_xml(&edge.target),
        format_weight(edge.weight),
    );
}

fn push_node(svg: &mut String, node: &NodeLayout, theme: &Theme, config: &LayoutConfig) {
    let (fill, stroke, text_color) = match node.severity {
        Severity::High => (
            theme.severity_fill.as_str(),
            theme.severity_color.as_str(),
            theme.severity_text_color.as_str(),
        ),
        Severity::Normal => (
            theme.node_fill.as_str(),
            theme.node_border_color.as_str(),
            theme.node_text_color.as_str(),
        ),
    };
    let cursor = if node.interactive { " cursor=\"pointer\"" } else { "" };
    let _ = write!(
        svg,
        "<g class=\"node {}\" data-node-id=\"{}\"{cursor}>",
        node.severity.token(),
        escape_xml(&node.id)
    );
    let _ = write!(svg, "<title>{}</title>", escape_xml(&node_tooltip(node)));
    let _ = write!(
        svg,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.4\">",
        node.x, node.y, node.width, node.height
    );
    if node.interactive {
        svg.push_str(
            "<animate attributeName=\"stroke-width\" values=\"1.4;3.2;1.4\" dur=\"1.6s\" repeatCount=\"indefinite\"/>",
        );
    }
    svg.push_str("</rect>");

    let (cx, cy) = node.center();
    let label = truncate_label(&node.label, node.width, theme.font_size);
    let detail = node_detail(node);
    let label_y = if detail.is_some() {
        cy - theme.font_size * 0.2
    } else {
        cy + theme.font_size * 0.35
    };
    let _ = write!(
        svg,
        "<text x=\"{cx:.2}\" y=\"{label_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{text_color}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(&label)
    );
    if let Some(detail) = detail {
        let detail_size = theme.font_size * 0.8;
        let detail_y = (cy + detail_size * 1.2).min(node.y + config.node_height - 4.0);
        let _ = write!(
            svg,
            "<text x=\"{cx:.2}\" y=\"{detail_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{detail_size:.1}\" fill=\"{text_color}\" fill-opacity=\"0.75\">{}</text>",
            escape_xml(&theme.font_family),
            escape_xml(&detail)
        );
    }
    svg.push_str("</g>");
}

fn node_detail(node: &NodeLayout) -> Option<String> {
    match (node.user_count, node.issue_count) {
        (Some(users), 0) => Some(format!("{users} users")),
        (Some(users), issues) => Some(format!("{users} users · {issues} issues")),
        (None, 0) => None,
        (None, issues) => Some(format!("{issues} issues")),
    }
}

fn node_tooltip(node: &NodeLayout) -> String {
    match node_detail(node) {
        Some(detail) => format!("{} ({detail})", node.label),
        None => node.label.clone(),
    }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 && weight.abs() < 1e15 {
        format!("{}", weight as i64)
    } else {
        format!("{weight:.2}")
    }
}

/// Shortens `label` with an ellipsis so it fits inside a box of `width`.
pub fn truncate_label(label: &str, width: f32, font_size: f32) -> String {
    let advance = (font_size * GLYPH_WIDTH_RATIO).max(1.0);
    let max_chars = (((width - 2.0 * LABEL_INSET) / advance).floor() as usize).max(1);
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    let mut out: String = label.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "Inter".to_string());
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size {}x{}", render_cfg.width, render_cfg.height))?;
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::build_graph;
    use crate::ir::{NodeMetrics, PathTrace, TraceBatch};
    use crate::layout::compute_layout;

    fn layout_for(batch: &TraceBatch) -> Layout {
        let graph = build_graph(batch, &GraphConfig::default()).graph;
        compute_layout(&graph, &LayoutConfig::default())
    }

    #[test]
    fn render_svg_basic() {
        let layout = layout_for(&TraceBatch::new(vec![PathTrace::new("Home > Search", 12.0)]));
        let svg = render_svg(&layout, &Theme::modern(), &LayoutConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("data-node-id=\"Home\""));
        assert!(svg.contains("data-node-id=\"Search\""));
        assert!(svg.contains(" C "));
        assert!(svg.contains("marker-end=\"url(#arrow)\""));
    }

    #[test]
    fn high_severity_is_styled_and_pulses() {
        let mut batch = TraceBatch::new(vec![PathTrace::new("Home>Checkout", 5.0).with_issues(3)]);
        batch.node_metrics.insert(
            "Checkout".to_string(),
            NodeMetrics {
                user_count: Some(40),
                issue_count: Some(3),
            },
        );
        let theme = Theme::modern();
        let svg = render_svg(&layout_for(&batch), &theme, &LayoutConfig::default());
        assert!(svg.contains("class=\"edge severity-high\""));
        assert!(svg.contains("class=\"node severity-high\" data-node-id=\"Checkout\" cursor=\"pointer\""));
        assert!(svg.contains("<animate"));
        assert!(svg.contains(&theme.severity_color));
        assert!(svg.contains("40 users · 3 issues"));
    }

    #[test]
    fn labels_are_escaped() {
        let layout = layout_for(&TraceBatch::new(vec![PathTrace::new("<Home & Co > \"Search\"", 1.0)]));
        let svg = render_svg(&layout, &Theme::classic(), &LayoutConfig::default());
        assert!(svg.contains("&lt;Home &amp; Co"));
        assert!(svg.contains("&quot;Search&quot;"));
        assert!(!svg.contains("<Home"));
    }

    #[test]
    fn canvas_uses_theme_background() {
        let theme = Theme {
            background: "#101820".to_string(),
            ..Theme::modern()
        };
        let layout = layout_for(&TraceBatch::new(vec![PathTrace::new("Home > Search", 1.0)]));
        let svg = render_svg(&layout, &theme, &LayoutConfig::default());
        assert!(svg.contains("<rect width=\"100%\" height=\"100%\" fill=\"#101820\"/>"));
    }

    #[test]
    fn empty_layout_still_renders_canvas() {
        let layout = Layout::empty(crate::ir::GraphKind::Aggregated);
        let svg = render_svg(&layout, &Theme::modern(), &LayoutConfig::default());
        assert!(svg.contains("width=\"200\""));
        assert!(!svg.contains("data-node-id"));
    }

    #[test]
    fn long_labels_are_truncated() {
        let label = "A very long screen name that cannot possibly fit";
        let short = truncate_label(label, 180.0, 13.0);
        assert!(short.ends_with('…'));
        assert!(short.chars().count() < label.chars().count());
        assert_eq!(truncate_label("Cart", 180.0, 13.0), "Cart");
    }
}
