mod analysis;
mod cli;
mod codec;
mod config;
mod dsp;
mod error;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

use cli::Cli;
use codec::AudioFormat;
use config::Config;
use dsp::buffer::samples_to_secs;
use error::MasterError;
use pipeline::{Master, Mode};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            match err.downcast_ref::<MasterError>() {
                Some(MasterError::InputTooLong { .. }) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Explicit --config path, or auto-detect automaster.toml / global config
fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("automaster.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("automaster").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("automaster").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

fn run(cli: Cli) -> Result<()> {
    let config = match find_config(cli.config.clone()) {
        Some(path) => match config::load_config(&path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}, using defaults", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    // Fail on a bad output before spending time on the input
    let output = match (cli.mode, cli.output.as_ref()) {
        (Mode::Analysis, _) => None,
        (_, Some(path)) => Some((path, AudioFormat::from_path(path)?)),
        (_, None) => anyhow::bail!("Output file is required in {:?} mode", cli.mode),
    };

    log::info!("automaster - automated spoken-word mastering");
    log::info!("Input: {}", cli.input.display());
    if let Some((path, _)) = output {
        log::info!("Output: {}", path.display());
    }

    // 1. Decode audio
    log::info!("Decoding audio...");
    let decoded = codec::decode::decode_audio(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    log::info!(
        "Source: {:?}, {} channel(s) at {}Hz",
        decoded.format,
        decoded.channels,
        decoded.source_rate
    );

    // 2. Analyze
    let mut master = Master::load(decoded.buffer, decoded.sample_rate, decoded.is_mono, config)?;
    log::info!("Analyzing audio...");
    let result = master.analyze()?;
    log::info!(
        "Analysis: left RMS {:.4}, right RMS {:.4}, overall gain {:.3}",
        result.left_rms,
        result.right_rms,
        result.overall_gain
    );
    let stalled = result.timed_out_labels();
    if !stalled.is_empty() {
        log::warn!("Analysis degraded, units timed out: {}", stalled.join(", "));
    }

    if let Some(ref path) = cli.report {
        let json = serde_json::to_string_pretty(result).context("Failed to serialize analysis")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }

    // 3. Process
    let Some((path, format)) = output else {
        log::info!("Analysis only, nothing written");
        return Ok(());
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stages {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    master.process(cli.mode, &pb)?;
    log::info!("Processed {:.1}s of audio", samples_to_secs(master.window().len()));

    // 4. Encode
    log::info!("Encoding...");
    codec::encode_audio(&master.export(), format, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Done! Output: {}", path.display());
    Ok(())
}
