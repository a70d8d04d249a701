use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "glvis",
    author,
    version,
    about = "Audio-reactive shader visualizations",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Configuration file (TOML); built-in defaults apply when omitted.
    #[arg(long, global = true, env = "GLVIS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shader base: an http(s) URL or a directory. Overrides `shaders.base`.
    #[arg(long, global = true, env = "GLVIS_SHADERS", value_name = "URL|DIR")]
    pub shaders: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the fragment source a visualization compiles with.
    Compose(ComposeArgs),
    /// Run the flocking simulation headless and report position statistics.
    Simulate(SimulateArgs),
    /// List visualizations from a catalog file or the built-in catalog.
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Catalog name or program path (e.g. `vertical_wav`, `flocking/texture`).
    #[arg(value_name = "PROGRAM")]
    pub program: String,

    #[arg(long, default_value_t = 800)]
    pub width: u32,

    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Value of the `time` uniform, in seconds.
    #[arg(long, default_value_t = 0.0)]
    pub time: f32,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of simulation steps to advance.
    #[arg(long, default_value_t = 60)]
    pub frames: u64,

    /// Seed for the initial positions; overrides `simulation.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// WAV file driving the audio features; silence when omitted.
    #[arg(long, value_name = "WAV")]
    pub audio: Option<PathBuf>,

    /// Skip copying the position surface back after each step.
    #[arg(long)]
    pub no_readback: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
