use interaction_flow_graph::layout_dump::DiagramDump;
use interaction_flow_graph::parser::parse_input;
use interaction_flow_graph::{Config, Theme, build_diagram};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    delimiter: Option<String>,
    severity_threshold: Option<u64>,
    center_columns: Option<bool>,
}

fn parse_options(options_json: Option<String>) -> Result<FlowRenderOptions, JsValue> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(FlowRenderOptions::default()),
    }
}

fn build_config(options: FlowRenderOptions) -> Result<Config, String> {
    let mut config = Config::default();
    if let Some(name) = options.theme.as_deref() {
        config.theme = Theme::by_name(name).ok_or_else(|| format!("Unknown theme `{name}`"))?;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(delimiter) = options.delimiter {
        config.graph.delimiter = delimiter;
    }
    if let Some(threshold) = options.severity_threshold {
        config.layout.severity_threshold = threshold;
    }
    if let Some(center) = options.center_columns {
        config.layout.center_columns = center;
    }
    Ok(config)
}

fn layout_json(input: &str, config: &Config) -> Result<String, String> {
    let parsed = parse_input(input).map_err(|error| error.to_string())?;
    let diagram = build_diagram(&parsed, &config.graph, &config.layout);
    let dump = DiagramDump::from_diagram(&diagram, &config.graph.delimiter);
    serde_json::to_string(&dump).map_err(|error| format!("Failed to serialize layout: {error}"))
}

fn config_from_options(options_json: Option<String>) -> Result<Config, JsValue> {
    build_config(parse_options(options_json)?).map_err(|error| JsValue::from_str(&error))
}

/// Lays out traces (or a tree) and returns node positions, curves and
/// warnings as JSON for the dashboard to draw itself.
#[wasm_bindgen]
pub fn layout_traces_json(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = config_from_options(options_json)?;
    layout_json(input, &config).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn render_traces_svg(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = config_from_options(options_json)?;
    interaction_flow_graph::render_traces_svg(input, &config).map_err(|error| JsValue::from_str(&error.to_string()))
}
