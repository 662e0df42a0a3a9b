use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{self, AnalysisResult};
use crate::config::Config;
use crate::dsp::buffer::{min_to_samples, Channel, StereoBuffer, Window, SAMPLE_RATE};
use crate::dsp::dynamics::{gate, limiter, peak, phrase};
use crate::dsp::stereo::{self, Balance};
use crate::dsp::{eq, filter};
use crate::error::{MasterError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Measure only, write nothing
    Analysis,
    /// Master the first minutes
    Preview,
    Full,
}

/// One step of the processing chain, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    DcOffset,
    ChannelBalance,
    EqBalance,
    Highpass,
    Normalize,
    PhraseDynamics,
    Ambience,
    NoiseGate,
    PeakReduce,
    Limiter,
    Boost,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::DcOffset => "DC offset removal",
            Stage::ChannelBalance => "channel balance",
            Stage::EqBalance => "EQ balance",
            Stage::Highpass => "highpass",
            Stage::Normalize => "normalize",
            Stage::PhraseDynamics => "phrase dynamics",
            Stage::Ambience => "stereo ambience",
            Stage::NoiseGate => "noise gate",
            Stage::PeakReduce => "peak reduction",
            Stage::Limiter => "limiter",
            Stage::Boost => "boost to target",
        }
    }
}

/// A mastering session: owns the buffer, its active window, and the
/// analysis it is processed against.
pub struct Master {
    buffer: StereoBuffer,
    window: Window,
    is_mono: bool,
    config: Config,
    analysis: Option<AnalysisResult>,
    /// Left channel was a dropout replaced by the right one
    left_replaced: bool,
}

impl Master {
    pub fn load(buffer: StereoBuffer, sample_rate: u32, is_mono: bool, config: Config) -> Result<Self> {
        if sample_rate as f32 != SAMPLE_RATE {
            return Err(MasterError::UnsupportedFormat(format!(
                "{} Hz (engine runs at {} Hz)",
                sample_rate, SAMPLE_RATE
            )));
        }
        let max = config.processing.max_length_min;
        if buffer.len() > min_to_samples(max) {
            return Err(MasterError::InputTooLong {
                minutes: buffer.duration_secs() / 60.0,
                max_minutes: max,
            });
        }

        log::info!(
            "Loaded {} samples ({:.1}s){}",
            buffer.len(),
            buffer.duration_secs(),
            if is_mono { ", mono source" } else { "" }
        );

        let mut master = Self {
            window: buffer.full_window(),
            buffer,
            is_mono,
            config,
            analysis: None,
            left_replaced: false,
        };
        if master.config.analysis.normalize_first {
            let max_volume = master.config.stereo.max_volume();
            let win = master.window;
            stereo::normalize(&mut master.buffer, win, max_volume);
        }
        Ok(master)
    }

    /// Clamp and set the active window.
    pub fn set_window(&mut self, start: usize, end: usize) -> Window {
        self.window = self.buffer.window(start, end);
        self.window
    }

    pub fn window(&self) -> Window {
        self.window
    }

    #[cfg(test)]
    pub fn buffer(&self) -> &StereoBuffer {
        &self.buffer
    }

    #[cfg(test)]
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Measure the analysis range in parallel and derive gain targets.
    pub fn analyze(&mut self) -> Result<&AnalysisResult> {
        let cfg = self.config.analysis.clone();
        let (start, end) = (min_to_samples(cfg.start_min), min_to_samples(cfg.end_min));
        let mut win = self.set_window(start, end);
        if win.is_empty() {
            log::info!("Input shorter than the analysis start, analyzing all of it");
            win = self.set_window(0, end);
        }

        let shared = Arc::new(std::mem::take(&mut self.buffer));
        let result = analysis::analyze(&shared, win, Duration::from_secs(cfg.timeout_secs), cfg.target_rms_db);
        self.buffer = Arc::try_unwrap(shared).unwrap_or_else(|still_shared| {
            log::warn!("Stalled analysis still holds the buffer, continuing on a copy");
            (*still_shared).clone()
        });

        let timed_out = result.timed_out_labels();
        if !timed_out.is_empty() && cfg.fail_on_timeout {
            return Err(MasterError::AnalysisTimedOut(timed_out));
        }
        log::info!("Multi-threaded analysis complete");
        Ok(&*self.analysis.insert(result))
    }

    /// Stages `process` will run for `mode`.
    pub fn plan(&self, mode: Mode) -> Vec<Stage> {
        if mode == Mode::Analysis {
            return Vec::new();
        }
        let mut stages = vec![
            Stage::DcOffset,
            Stage::ChannelBalance,
            Stage::EqBalance,
            Stage::Highpass,
            Stage::Normalize,
            Stage::PhraseDynamics,
        ];
        if self.is_mono {
            stages.push(Stage::Ambience);
        }
        if self.config.gate.enabled {
            stages.push(Stage::NoiseGate);
        }
        if self.config.processing.adaptive_peak_reduce {
            stages.push(Stage::PeakReduce);
        }
        if self.config.limiter.threshold_db.is_some() {
            stages.push(Stage::Limiter);
        }
        stages.push(Stage::Boost);
        stages
    }

    /// Run the processing chain over the mode's range, analyzing first if
    /// that has not happened yet.
    pub fn process(&mut self, mode: Mode, progress: &ProgressBar) -> Result<&StereoBuffer> {
        if self.analysis.is_none() {
            self.analyze()?;
        }
        let stages = self.plan(mode);
        if stages.is_empty() {
            return Ok(&self.buffer);
        }

        let end_min = match mode {
            Mode::Preview => self.config.processing.preview_end_min,
            _ => self.config.processing.full_end_min,
        };
        let win = self.set_window(0, min_to_samples(end_min));
        log::info!("Processing samples {}..{} ({:?} mode)", win.start, win.end, mode);

        progress.set_length(stages.len() as u64);
        for stage in stages {
            progress.set_message(stage.name());
            log::info!("Stage: {}", stage.name());
            self.run_stage(stage, win);
            progress.inc(1);
        }
        progress.finish_with_message("mastered");

        Ok(&self.buffer)
    }

    fn run_stage(&mut self, stage: Stage, win: Window) {
        let Some(a) = self.analysis.as_ref() else {
            return;
        };
        let cfg = &self.config;
        let buf = &mut self.buffer;

        match stage {
            Stage::DcOffset => stereo::remove_dc_offset(buf, win),
            Stage::ChannelBalance => {
                let balance = stereo::channel_balance(buf, win, a.left_rms, a.right_rms, &cfg.stereo);
                self.left_replaced = balance == Balance::Copied { from: Channel::Right };
            }
            Stage::EqBalance => {
                let applied = eq::eq_balance(buf, win, &a.band_multipliers, &cfg.eq);
                log::info!("EQ bands corrected: {}", applied);
            }
            Stage::Highpass => {
                let p = &cfg.processing;
                for _ in 0..p.highpass_passes {
                    filter::highpass(buf, win, p.highpass_hz, p.highpass_q);
                }
            }
            Stage::Normalize => {
                stereo::normalize(buf, win, cfg.stereo.max_volume());
            }
            Stage::PhraseDynamics => {
                // A replaced left channel now carries the right one's level
                let reference = if self.left_replaced { a.right_rms } else { a.left_rms };
                phrase::phrase_dynamics(buf, win, reference, &cfg.dynamics);
            }
            Stage::Ambience => stereo::add_ambience(buf, win, &cfg.stereo),
            Stage::NoiseGate => {
                gate::noise_gate(buf, win, &cfg.gate);
            }
            Stage::PeakReduce => {
                let threshold = peak::adaptive_peak_threshold(&buf.left[win.range()]);
                peak::reduce_peaks(buf, win, threshold);
            }
            Stage::Limiter => {
                if let Some(db) = cfg.limiter.threshold_db {
                    limiter::limiter(buf, win, db);
                }
            }
            Stage::Boost => boost_to_target(buf, win, a.overall_gain, cfg.stereo.max_volume()),
        }
    }

    /// Windowed copy of the buffer for the encoder.
    pub fn export(&self) -> StereoBuffer {
        self.buffer.slice(self.window)
    }
}

/// Apply the overall gain, catch any new overs, then renormalize.
fn boost_to_target(buf: &mut StereoBuffer, win: Window, overall_gain: f32, max_volume: f32) {
    if overall_gain > 1.0 {
        stereo::apply_gain(buf, win, overall_gain);
        peak::reduce_peaks(buf, win, 1.0);
    } else {
        log::info!("RMS above target, no gain required");
    }
    stereo::normalize(buf, win, max_volume);
}
