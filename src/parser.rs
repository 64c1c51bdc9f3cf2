use crate::error::{FlowError, FlowResult};
use crate::ir::{FlowInput, PathTrace, TraceBatch, TreeNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

pub const DEFAULT_DELIMITER: &str = ">";

static TRACE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<path>[^:]+?)\s*:\s*(?P<weight>[^:\s]+)\s*(?::\s*(?P<issues>\d+)\s*)?$")
        .unwrap()
});

/// Splits a raw path into labels, truncating at the first repeated label.
///
/// Segments are trimmed and empty ones dropped; adjacent duplicates collapse
/// into one before the repeat check, so `A > A > B` keeps `B` while
/// `A > B > A > C` stops after `B`.
pub fn normalize_path(raw: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return normalize_labels([raw.trim()]);
    }
    normalize_labels(raw.split(delimiter))
}

pub fn normalize_labels<'a, I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for label in labels.into_iter().map(str::trim) {
        if label.is_empty() {
            continue;
        }
        if out.last().map(String::as_str) == Some(label) {
            continue;
        }
        if !seen.insert(label) {
            break;
        }
        out.push(label.to_string());
    }
    out
}

pub fn join_path(labels: &[String], delimiter: &str) -> String {
    labels.join(&format!(" {} ", delimiter.trim()))
}

/// Parses a trace batch from either JSON or the line format
/// `Home > Search > Cart : 42 [: issues]`.
pub fn parse_traces(input: &str) -> FlowResult<TraceBatch> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return parse_trace_json(trimmed);
    }
    parse_trace_lines(input)
}

pub fn parse_trace_lines(input: &str) -> FlowResult<TraceBatch> {
    let mut traces = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("%%") {
            continue;
        }
        let caps = TRACE_LINE_RE
            .captures(line)
            .ok_or_else(|| FlowError::invalid_line(idx + 1, line))?;
        let weight_text = &caps["weight"];
        let weight = weight_text
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| FlowError::invalid_weight(idx + 1, weight_text))?;
        let issue_count = match caps.name("issues") {
            Some(issues) => issues
                .as_str()
                .parse::<u64>()
                .map_err(|_| FlowError::invalid_line(idx + 1, line))?,
            None => 0,
        };
        traces.push(PathTrace {
            path: caps["path"].trim().to_string(),
            weight,
            issue_count,
        });
    }
    Ok(TraceBatch::new(traces))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TraceDocument {
    Batch(TraceBatch),
    List(Vec<PathTrace>),
}

pub fn parse_trace_json(input: &str) -> FlowResult<TraceBatch> {
    let document: TraceDocument = serde_json::from_str(input)?;
    Ok(match document {
        TraceDocument::Batch(batch) => batch,
        TraceDocument::List(traces) => TraceBatch::new(traces),
    })
}

/// Parses a rooted tree; JSON5 so hand-written fixtures may carry comments.
pub fn parse_tree(input: &str) -> FlowResult<TreeNode> {
    Ok(json5::from_str(input)?)
}

/// Picks the input shape from the document itself: an object with an `id`
/// and no `traces` key is a tree, everything else is a trace batch.
pub fn parse_input(input: &str) -> FlowResult<FlowInput> {
    if looks_like_tree(input) {
        return parse_tree(input).map(FlowInput::Tree);
    }
    parse_traces(input).map(FlowInput::Traces)
}

fn looks_like_tree(input: &str) -> bool {
    if !skip_leading_comments(input).starts_with('{') {
        return false;
    }
    match json5::from_str::<serde_json::Value>(input) {
        Ok(serde_json::Value::Object(map)) => {
            map.contains_key("id") && !map.contains_key("traces")
        }
        _ => false,
    }
}

/// Skips whitespace and any `//` or `/* */` comments at the head of a JSON5
/// document.
fn skip_leading_comments(input: &str) -> &str {
    let mut rest = input.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("//") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}
