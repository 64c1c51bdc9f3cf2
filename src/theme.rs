use serde::{Deserialize, Serialize};

/// Colors and typography the reference SVG renderer maps style tokens to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub node_fill: String,
    pub node_text_color: String,
    pub node_border_color: String,
    pub line_color: String,
    pub severity_color: String,
    pub severity_fill: String,
    pub severity_text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            node_fill: "#ECECFF".to_string(),
            node_text_color: "#333333".to_string(),
            node_border_color: "#9370DB".to_string(),
            line_color: "#333333".to_string(),
            severity_color: "#D64545".to_string(),
            severity_fill: "#FDECEC".to_string(),
            severity_text_color: "#8A1F1F".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            node_fill: "#F8FAFF".to_string(),
            node_text_color: "#1C2430".to_string(),
            node_border_color: "#C7D2E5".to_string(),
            line_color: "#7A8AA6".to_string(),
            severity_color: "#E5484D".to_string(),
            severity_fill: "#FFF1F1".to_string(),
            severity_text_color: "#A12A2F".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
