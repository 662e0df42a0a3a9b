use std::f64::consts::PI;

use crate::analysis::level::db_to_amp;
use crate::dsp::buffer::{StereoBuffer, Window, SAMPLE_RATE};

/// Smoothing cutoff of the envelope follower
const ENVELOPE_HZ: f64 = 100.0;
/// Keeps the smoothed state strictly positive
const DC: f64 = 1e-30;

/// Feed-forward limiter on a smoothed stereo envelope.
///
/// The envelope never drops below the instantaneous level, so dividing by
/// `max(envelope, threshold) / threshold` keeps every output sample at or
/// under the threshold while leaving quieter material at unity gain.
pub fn limiter(buf: &mut StereoBuffer, win: Window, threshold_db: f32) {
    let thresh = db_to_amp(threshold_db) as f64;
    log::info!("Limiting at {:.2}db ({:.5})", threshold_db, thresh);

    let b = -(-2.0 * PI * ENVELOPE_HZ / SAMPLE_RATE as f64).exp();
    let a = 1.0 + b;
    let mut t = 0.0f64;
    let mut limited = 0usize;

    for i in win.range() {
        let instant = (buf.left[i].abs() as f64).max(buf.right[i].abs() as f64);
        t = a * instant - b * t + DC;
        let envelope = (t - DC).max(0.0).sqrt().max(instant);
        let gain = if envelope > thresh {
            limited += 1;
            envelope / thresh
        } else {
            1.0
        };
        buf.left[i] = (buf.left[i] as f64 / gain) as f32;
        buf.right[i] = (buf.right[i] as f64 / gain) as f32;
    }

    log::debug!("Limiter engaged on {} samples", limited);
}
