use crate::config::{StartDepth, load_config};
use crate::engine::EngineState;
use crate::ir::{Dataset, LinkDirection};
use crate::layout_dump::{RenderDump, read_snapshot, write_layout_dump};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pgraph",
    version,
    about = "Aggregate, query and lay out a hierarchical variable graph"
)]
pub struct Args {
    /// Dataset JSON file ({"variables": [...], "links": [...]}) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the render dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Tier the view starts at (overrides the config file)
    #[arg(long = "start-depth", value_enum)]
    pub start_depth: Option<DepthArg>,

    /// Visible-id snapshot to restore before anything else
    #[arg(long = "restore")]
    pub restore: Option<PathBuf>,

    /// Double-activate a node; repeat to replay a sequence
    #[arg(long = "activate", value_name = "ID")]
    pub activate: Vec<String>,

    /// Dump the nearest-neighbor view around this node
    #[arg(long = "neighbors", value_name = "ID", conflicts_with = "path")]
    pub neighbors: Option<String>,

    /// Neighbor search depth (1-3)
    #[arg(long = "depth", default_value_t = 1)]
    pub depth: usize,

    /// Neighbor search direction
    #[arg(long = "direction", value_enum, default_value = "both")]
    pub direction: DirectionArg,

    /// Dump the shortest-path view between two nodes
    #[arg(long = "path", num_args = 2, value_names = ["FROM", "TO"])]
    pub path: Option<Vec<String>>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DepthArg {
    Variables,
    Segments,
    Submodules,
}

impl From<DepthArg> for StartDepth {
    fn from(value: DepthArg) -> Self {
        match value {
            DepthArg::Variables => StartDepth::Variables,
            DepthArg::Segments => StartDepth::Segments,
            DepthArg::Submodules => StartDepth::Submodules,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    Out,
    In,
    Both,
}

impl From<DirectionArg> for LinkDirection {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Out => LinkDirection::Outbound,
            DirectionArg::In => LinkDirection::Inbound,
            DirectionArg::Both => LinkDirection::Both,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(depth) = args.start_depth {
        config.start_depth = depth.into();
    }
    if let Some(width) = args.width {
        config.layout.width = width;
    }
    if let Some(height) = args.height {
        config.layout.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let dataset = Dataset::from_json(&input).context("dataset is not valid JSON")?;
    let mut engine = EngineState::from_dataset(dataset, config)?;

    if let Some(path) = args.restore.as_deref() {
        let snapshot = read_snapshot(path)?;
        engine.restore(&snapshot)?;
    }
    for id in &args.activate {
        let action = engine.activate(id)?;
        info!(node = %id, ?action, "activated");
    }

    let dump = if let Some(origin) = args.neighbors.as_deref() {
        let neighbors = engine.neighbors(origin, args.depth, args.direction.into())?;
        RenderDump::neighbors(&engine, &neighbors)
    } else if let Some([from, to]) = args.path.as_deref() {
        let path = engine.shortest_path(from, to)?;
        if !path.is_found() {
            eprintln!("no path from `{from}` to `{to}` in the current view");
        }
        RenderDump::path(&engine, &path)
    } else {
        RenderDump::overview(&engine)
    };

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &dump)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &dump)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
