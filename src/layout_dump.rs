use crate::FlowDiagram;
use crate::error::Warning;
use crate::parser::join_path;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDump {
    pub kind: String,
    pub width: f32,
    pub height: f32,
    pub columns: Vec<Vec<String>>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub rank: Option<usize>,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub severity: &'static str,
    pub interactive: bool,
    pub user_count: Option<u64>,
    pub issue_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub issue_count: u64,
    pub severity: &'static str,
    pub thickness: f32,
    /// Start, both control points and end of the cubic curve.
    pub points: Vec<[f32; 2]>,
    pub path: String,
    /// Trace that won deduplication, joined with the batch delimiter.
    pub origin: Option<String>,
}

impl DiagramDump {
    /// Flattens `diagram` for JSON output; `delimiter` joins edge origins.
    pub fn from_diagram(diagram: &FlowDiagram, delimiter: &str) -> Self {
        let layout = &diagram.layout;
        let nodes = layout
            .columns
            .iter()
            .flatten()
            .filter_map(|id| layout.nodes.get(id))
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                rank: node.rank.index(),
                depth: node.depth,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                severity: node.severity.token(),
                interactive: node.interactive,
                user_count: node.user_count,
                issue_count: node.issue_count,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                source: edge.source.clone(),
                target: edge.target.clone(),
                weight: edge.weight,
                issue_count: edge.issue_count,
                severity: edge.severity.token(),
                thickness: edge.thickness,
                points: edge.points().iter().map(|(x, y)| [*x, *y]).collect(),
                path: edge.path_data(),
                origin: diagram
                    .graph
                    .edge(&edge.source, &edge.target)
                    .and_then(|e| e.origin.as_ref())
                    .map(|origin| join_path(&origin.labels, delimiter)),
            })
            .collect();

        DiagramDump {
            kind: format!("{:?}", layout.kind),
            width: layout.width,
            height: layout.height,
            columns: layout.columns.clone(),
            nodes,
            edges,
            warnings: diagram.warnings.clone(),
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `None`.
pub fn write_layout_dump(path: Option<&Path>, diagram: &FlowDiagram, delimiter: &str) -> anyhow::Result<()> {
    let dump = DiagramDump::from_diagram(diagram, delimiter);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
