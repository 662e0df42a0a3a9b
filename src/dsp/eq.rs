use crate::config::EqConfig;

use super::buffer::{StereoBuffer, Window};
use super::filter::band_pass;

#[derive(Clone, Copy, Debug)]
pub struct Band {
    pub center_hz: f32,
    pub q: f32,
    /// Target share of the louder channel's RMS
    pub target_ratio: f32,
}

//                            vocal root, mud, radio, sensitive, sibilance, air
pub const BANDS: [Band; 6] = [
    Band { center_hz: 150.0, q: 1.0, target_ratio: 0.5 },
    Band { center_hz: 400.0, q: 1.0, target_ratio: 0.5 },
    Band { center_hz: 1500.0, q: 1.0, target_ratio: 0.35 },
    Band { center_hz: 4000.0, q: 1.0, target_ratio: 0.35 },
    Band { center_hz: 8000.0, q: 1.0, target_ratio: 0.15 },
    Band { center_hz: 14000.0, q: 1.0, target_ratio: 0.08076 },
];

/// Apply one band correction. Returns the gain actually used, or `None`
/// when the clamped correction is within tolerance of unity.
pub fn band_gain(buf: &mut StereoBuffer, win: Window, band: &Band, multiplier: f32, cfg: &EqConfig) -> Option<f32> {
    let gain = multiplier.clamp(cfg.min_band_gain, cfg.max_band_gain);
    if (1.0 - gain).abs() < cfg.tolerance {
        log::debug!("Band {}Hz: gain {:.4} within tolerance, skipped", band.center_hz, gain);
        return None;
    }
    log::info!("Band {}Hz: applying gain {:.4}", band.center_hz, gain);
    band_pass(buf, win, band.center_hz, band.q, gain);
    Some(gain)
}

/// Correct every band toward its target ratio.
pub fn eq_balance(buf: &mut StereoBuffer, win: Window, multipliers: &[f32; BANDS.len()], cfg: &EqConfig) -> usize {
    BANDS
        .iter()
        .zip(multipliers)
        .filter_map(|(band, &m)| band_gain(buf, win, band, m, cfg))
        .count()
}
