use serde::Deserialize;
use std::path::Path;

/// All engine tunables. Times are in milliseconds or minutes as named,
/// levels are linear amplitude unless the field ends in `_db`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub eq: EqConfig,
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    #[serde(default)]
    pub stereo: StereoConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Skip intros and jingles
    #[serde(default = "default_analyze_start_min")]
    pub start_min: u32,
    #[serde(default = "default_analyze_end_min")]
    pub end_min: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Turn a missed analysis deadline into an error instead of a warning
    #[serde(default)]
    pub fail_on_timeout: bool,
    #[serde(default = "default_target_rms_db")]
    pub target_rms_db: f32,
    #[serde(default = "default_true")]
    pub normalize_first: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_preview_end_min")]
    pub preview_end_min: u32,
    #[serde(default = "default_full_end_min")]
    pub full_end_min: u32,
    #[serde(default = "default_max_length_min")]
    pub max_length_min: u32,
    #[serde(default = "default_highpass_hz")]
    pub highpass_hz: f32,
    #[serde(default = "default_highpass_q")]
    pub highpass_q: f32,
    #[serde(default = "default_highpass_passes")]
    pub highpass_passes: usize,
    #[serde(default)]
    pub adaptive_peak_reduce: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EqConfig {
    #[serde(default = "default_min_band_gain")]
    pub min_band_gain: f32,
    #[serde(default = "default_max_band_gain")]
    pub max_band_gain: f32,
    /// Corrections closer to unity than this are inaudible and skipped
    #[serde(default = "default_eq_tolerance")]
    pub tolerance: f32,
}

/// Phrase leveling. Thresholds are multiples of the left channel RMS.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicsConfig {
    #[serde(default = "default_attack_ratio")]
    pub attack_ratio: f32,
    #[serde(default = "default_release_ratio")]
    pub release_ratio: f32,
    #[serde(default = "default_target_ratio")]
    pub target_ratio: f32,
    #[serde(default = "default_min_phrase_gain")]
    pub min_gain: f32,
    #[serde(default = "default_max_phrase_gain")]
    pub max_gain: f32,
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u32,
    #[serde(default = "default_min_phrase_ms")]
    pub min_phrase_ms: u32,
    /// 0.0 = no leveling, 1.0 = full correction
    #[serde(default = "default_strength")]
    pub strength: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StereoConfig {
    #[serde(default = "default_silent_threshold")]
    pub silent_threshold: f32,
    #[serde(default = "default_max_volume_db")]
    pub max_volume_db: f32,
    #[serde(default = "default_ambience_delay_ms")]
    pub ambience_delay_ms: u32,
    #[serde(default = "default_ambience_gain")]
    pub ambience_gain: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_gate_threshold")]
    pub threshold: f32,
    #[serde(default = "default_gate_attack_ms")]
    pub attack_ms: u32,
    #[serde(default = "default_gate_release_ms")]
    pub release_ms: u32,
    /// 1.0 = total silence, 0.0 = no reduction
    #[serde(default = "default_gate_reduction")]
    pub reduction: f32,
    #[serde(default = "default_gate_min_gap_ms")]
    pub min_gap_ms: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimiterConfig {
    /// Limiter is skipped unless a threshold is set
    #[serde(default)]
    pub threshold_db: Option<f32>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start_min: default_analyze_start_min(),
            end_min: default_analyze_end_min(),
            timeout_secs: default_timeout_secs(),
            fail_on_timeout: false,
            target_rms_db: default_target_rms_db(),
            normalize_first: true,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            preview_end_min: default_preview_end_min(),
            full_end_min: default_full_end_min(),
            max_length_min: default_max_length_min(),
            highpass_hz: default_highpass_hz(),
            highpass_q: default_highpass_q(),
            highpass_passes: default_highpass_passes(),
            adaptive_peak_reduce: false,
        }
    }
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            min_band_gain: default_min_band_gain(),
            max_band_gain: default_max_band_gain(),
            tolerance: default_eq_tolerance(),
        }
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            attack_ratio: default_attack_ratio(),
            release_ratio: default_release_ratio(),
            target_ratio: default_target_ratio(),
            min_gain: default_min_phrase_gain(),
            max_gain: default_max_phrase_gain(),
            min_gap_ms: default_min_gap_ms(),
            min_phrase_ms: default_min_phrase_ms(),
            strength: default_strength(),
        }
    }
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            silent_threshold: default_silent_threshold(),
            max_volume_db: default_max_volume_db(),
            ambience_delay_ms: default_ambience_delay_ms(),
            ambience_gain: default_ambience_gain(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_gate_threshold(),
            attack_ms: default_gate_attack_ms(),
            release_ms: default_gate_release_ms(),
            reduction: default_gate_reduction(),
            min_gap_ms: default_gate_min_gap_ms(),
        }
    }
}

impl StereoConfig {
    /// Normalization ceiling, a little headroom below full scale.
    pub fn max_volume(&self) -> f32 {
        2f32.powf(self.max_volume_db / 6.0)
    }
}

fn default_true() -> bool { true }
fn default_analyze_start_min() -> u32 { 1 }
fn default_analyze_end_min() -> u32 { 15 }
fn default_timeout_secs() -> u64 { 120 }
fn default_target_rms_db() -> f32 { -21.0 }
fn default_preview_end_min() -> u32 { 2 }
fn default_full_end_min() -> u32 { 60 }
fn default_max_length_min() -> u32 { 60 }
fn default_highpass_hz() -> f32 { 75.0 }
fn default_highpass_q() -> f32 { 0.1 }
fn default_highpass_passes() -> usize { 3 }
fn default_min_band_gain() -> f32 { 0.5 }
fn default_max_band_gain() -> f32 { 1.5 }
fn default_eq_tolerance() -> f32 { 0.02 }
fn default_attack_ratio() -> f32 { 0.75 }
fn default_release_ratio() -> f32 { 0.4 }
fn default_target_ratio() -> f32 { 2.5 }
fn default_min_phrase_gain() -> f32 { 0.5 }
fn default_max_phrase_gain() -> f32 { 2.0 }
fn default_min_gap_ms() -> u32 { 200 }
fn default_min_phrase_ms() -> u32 { 750 }
fn default_strength() -> f32 { 1.0 }
fn default_silent_threshold() -> f32 { 0.02 }
fn default_max_volume_db() -> f32 { -0.2 }
fn default_ambience_delay_ms() -> u32 { 15 }
fn default_ambience_gain() -> f32 { 0.125 }
fn default_gate_threshold() -> f32 { 0.08 }
fn default_gate_attack_ms() -> u32 { 200 }
fn default_gate_release_ms() -> u32 { 10 }
fn default_gate_reduction() -> f32 { 0.25 }
fn default_gate_min_gap_ms() -> u32 { 750 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
