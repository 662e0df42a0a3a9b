use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::Mode;

#[derive(Parser, Debug)]
#[command(name = "automaster", about = "Automated mastering for spoken-word recordings")]
pub struct Cli {
    /// Input audio file (WAV, AIFF)
    pub input: PathBuf,

    /// Output audio file; the extension picks the format. Not needed in analysis mode.
    pub output: Option<PathBuf>,

    /// What to process
    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,

    /// Config file (defaults to ./automaster.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the analysis result as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}
