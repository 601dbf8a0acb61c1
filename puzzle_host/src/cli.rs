use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

const DEFAULT_FRAME_SECONDS: f64 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(
    about = "Headless host that replays scripted input against a puzzle scenario",
    version
)]
pub struct Args {
    /// Scene description JSON (nodes, animations, materials)
    #[arg(long)]
    pub scene: PathBuf,

    /// Scenario JSON describing the procedure to install
    #[arg(long)]
    pub scenario: PathBuf,

    /// Input script JSON to replay; without it the scenario is only installed
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Length of one simulated frame while waiting
    #[arg(long, default_value_t = DEFAULT_FRAME_SECONDS)]
    pub frame_seconds: f64,

    /// Path to write the runtime event journal as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the learning-record snapshot as JSON
    #[arg(long)]
    pub progress_json: Option<PathBuf>,

    /// Run without a learning-record adapter in the host window
    #[arg(long)]
    pub no_progress_api: bool,

    /// Print every journal event instead of the compact summary
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub struct ReplayArgs {
    pub scene: PathBuf,
    pub scenario: PathBuf,
    pub input: Option<PathBuf>,
    pub frame_seconds: f64,
    pub event_log_json: Option<PathBuf>,
    pub progress_json: Option<PathBuf>,
    pub progress_api: bool,
    pub verbose: bool,
}

pub fn parse() -> Result<ReplayArgs> {
    let args = Args::parse();
    args.into_replay()
}

impl Args {
    fn into_replay(self) -> Result<ReplayArgs> {
        if !self.frame_seconds.is_finite() || self.frame_seconds <= 0.0 {
            bail!("--frame-seconds must be a positive number");
        }
        if self.no_progress_api && self.progress_json.is_some() {
            bail!("--progress-json cannot be combined with --no-progress-api");
        }

        Ok(ReplayArgs {
            scene: self.scene,
            scenario: self.scenario,
            input: self.input,
            frame_seconds: self.frame_seconds,
            event_log_json: self.event_log_json,
            progress_json: self.progress_json,
            progress_api: !self.no_progress_api,
            verbose: self.verbose,
        })
    }
}
