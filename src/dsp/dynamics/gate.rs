use crate::config::GateConfig;
use crate::dsp::buffer::{ms_to_samples, StereoBuffer, Window};

/// End of the quiet run starting at `from`: first index at or above
/// `threshold`, or the window end.
fn quiet_run_end(samples: &[f32], win: Window, from: usize, threshold: f32) -> usize {
    samples[from..win.end]
        .iter()
        .position(|s| s.abs() >= threshold)
        .map_or(win.end, |p| from + p)
}

/// Gain inside a gated run at offset `j` from its start.
fn gate_gain(j: usize, run_len: usize, attack: usize, release: usize, reduction: f32) -> f32 {
    if j <= attack {
        let through = j as f32 / attack.max(1) as f32;
        1.0 - reduction * through
    } else if j + release >= run_len {
        let through = (j + release - run_len) as f32 / release.max(1) as f32;
        1.0 - reduction * (1.0 - through)
    } else {
        1.0 - reduction
    }
}

/// Attenuate long silences, fading down over the attack time and back up
/// over the release time. The left channel decides what is silent.
/// Returns the number of gated runs.
pub fn noise_gate(buf: &mut StereoBuffer, win: Window, cfg: &GateConfig) -> usize {
    let attack = ms_to_samples(cfg.attack_ms);
    let release = ms_to_samples(cfg.release_ms);
    let min_gap = ms_to_samples(cfg.min_gap_ms);

    let mut gated = 0;
    let mut i = win.start;
    while i < win.end {
        if buf.left[i].abs() >= cfg.threshold {
            i += 1;
            continue;
        }
        let end = quiet_run_end(&buf.left, win, i, cfg.threshold);
        let run_len = end - i;
        if run_len > min_gap {
            gated += 1;
            for j in 0..run_len {
                let g = gate_gain(j, run_len, attack, release, cfg.reduction);
                buf.left[i + j] *= g;
                buf.right[i + j] *= g;
            }
        }
        i = end + 1;
    }

    log::info!("Noise gaps gated: {}", gated);
    gated
}
