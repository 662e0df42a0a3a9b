use crate::dsp::eq::{Band, BANDS};

use super::level::{amp_to_db, db_to_amp};

/// Gain needed to bring the louder channel up to `target_db`.
/// Never reduces level; a silent measurement yields unity.
pub fn overall_gain(left_rms: f32, right_rms: f32, target_db: f32) -> f32 {
    let rms = left_rms.max(right_rms);
    let target = db_to_amp(target_db);
    log::info!(
        "RMS={:.5} ({:.2}db), target={:.5} ({:.2}db)",
        rms,
        amp_to_db(rms),
        target,
        target_db
    );
    if rms > 0.0 && rms < target {
        let gain = target / rms;
        log::info!("RMS below target, gain factor = {:.4}", gain);
        gain
    } else {
        1.0
    }
}

/// Per-band correction: how far each band's share of the louder channel's
/// energy is from its target ratio. Not clamped here.
pub fn band_multipliers(left_rms: f32, right_rms: f32, band_rms: &[f32; BANDS.len()]) -> [f32; BANDS.len()] {
    let rms = left_rms.max(right_rms);
    let mut out = [1.0f32; BANDS.len()];
    for (i, (Band { center_hz, target_ratio, .. }, &measured)) in BANDS.iter().zip(band_rms).enumerate() {
        if rms <= 0.0 || measured <= 0.0 {
            log::debug!("Band {}Hz: no energy, multiplier left at 1", center_hz);
            continue;
        }
        let actual = measured / rms;
        out[i] = target_ratio / actual;
        log::debug!(
            "Band {}Hz: ratio actual={:.5} target={:.5} multiplier={:.4}",
            center_hz,
            actual,
            target_ratio,
            out[i]
        );
    }
    out
}
