use crate::config::{load_config, Config};
use crate::ir::FlowInput;
use crate::layout_dump::write_layout_dump;
use crate::parser::{parse_input, parse_traces, parse_tree};
use crate::render::{render_svg, write_output_svg};
use crate::theme::Theme;
use crate::{build_diagram, FlowDiagram};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ifg",
    version,
    about = "Render weighted user-journey traces as an acyclic layered flow diagram"
)]
pub struct Args {
    /// Input file (traces as text/JSON, or a JSON5 tree) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// How to read the input
    #[arg(short = 'm', long = "mode", value_enum, default_value = "auto")]
    pub mode: InputMode,

    /// Config JSON file (graph, layout, render sections and themeVariables)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme name, overriding the config file
    #[arg(short = 't', long = "theme")]
    pub theme: Option<String>,

    /// Path delimiter, overriding the config file
    #[arg(short = 'd', long = "delimiter")]
    pub delimiter: Option<String>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Detect from the document
    Auto,
    Traces,
    Tree,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = resolve_config(&args)?;
    let input = read_input(args.input.as_deref())?;
    let parsed = parse_with_mode(&input, args.mode)?;
    let diagram = build_diagram(&parsed, &config.graph, &config.layout);
    for warning in &diagram.warnings {
        tracing::warn!("{warning}");
    }

    write_diagram(&diagram, &config, args.output_format, args.output.as_deref())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.theme.as_deref() {
        config.theme = Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("Unknown theme `{name}`"))?;
    }
    if let Some(delimiter) = &args.delimiter {
        config.graph.delimiter = delimiter.clone();
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    Ok(config)
}

fn parse_with_mode(input: &str, mode: InputMode) -> Result<FlowInput> {
    let parsed = match mode {
        InputMode::Auto => parse_input(input)?,
        InputMode::Traces => FlowInput::Traces(parse_traces(input)?),
        InputMode::Tree => FlowInput::Tree(parse_tree(input)?),
    };
    Ok(parsed)
}

fn write_diagram(diagram: &FlowDiagram, config: &Config, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    match format {
        OutputFormat::Json => write_layout_dump(output, diagram, &config.graph.delimiter),
        OutputFormat::Svg => {
            let svg = render_svg(&diagram.layout, &config.theme, &config.layout);
            write_output_svg(&svg, output)
        }
        OutputFormat::Png => write_png(diagram, config, output),
    }
}

#[cfg(feature = "png")]
fn write_png(diagram: &FlowDiagram, config: &Config, output: Option<&Path>) -> Result<()> {
    let output = ensure_output(output, "png")?;
    let svg = render_svg(&diagram.layout, &config.theme, &config.layout);
    crate::render::write_output_png(&svg, &output, &config.render, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_diagram: &FlowDiagram, _config: &Config, _output: Option<&Path>) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: Option<&Path>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.to_path_buf());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
