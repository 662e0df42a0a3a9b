//! Phrase leveling: split the window into phrases separated by pauses and
//! bring each phrase toward a common loudness, ramping gain through the
//! pauses so there are no jumps.

use crate::analysis::level::rms_above_noise;
use crate::config::DynamicsConfig;
use crate::dsp::buffer::{ms_to_samples, StereoBuffer, Window};

/// A detected span `[start, end)` and the flat gain it receives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Phrase {
    pub start: usize,
    pub end: usize,
    pub rms: f32,
    pub gain: f32,
}

/// Thresholds derived from the reference (left channel) RMS.
#[derive(Clone, Copy, Debug)]
pub struct PhraseParams {
    pub attack: f32,
    pub release: f32,
    pub target: f32,
    pub min_gain: f32,
    pub max_gain: f32,
    pub min_gap: usize,
    pub min_phrase: usize,
    pub strength: f32,
}

impl PhraseParams {
    pub fn new(reference_rms: f32, cfg: &DynamicsConfig) -> Self {
        Self {
            attack: reference_rms * cfg.attack_ratio,
            release: reference_rms * cfg.release_ratio,
            target: reference_rms * cfg.target_ratio,
            min_gain: cfg.min_gain,
            max_gain: cfg.max_gain,
            min_gap: ms_to_samples(cfg.min_gap_ms),
            min_phrase: ms_to_samples(cfg.min_phrase_ms),
            strength: cfg.strength,
        }
    }

    fn gain_for(&self, phrase_rms: f32) -> f32 {
        if phrase_rms <= 0.0 {
            return 1.0;
        }
        let gain = (self.target / phrase_rms).clamp(self.min_gain, self.max_gain);
        1.0 + (gain - 1.0) * self.strength
    }
}

/// First index in `[from, win.end)` whose magnitude exceeds `threshold`.
fn next_above(samples: &[f32], win: Window, from: usize, threshold: f32) -> usize {
    if from >= win.end {
        return win.end;
    }
    samples[from..win.end]
        .iter()
        .position(|s| s.abs() > threshold)
        .map_or(win.end, |p| from + p)
}

/// Start of the first run at or below `threshold` longer than `min_gap`,
/// searching from `from`. A run cut off by the window end still counts.
fn next_gap(samples: &[f32], win: Window, from: usize, threshold: f32, min_gap: usize) -> usize {
    let mut run_start = None;
    for i in from.min(win.end)..win.end {
        if samples[i].abs() > threshold {
            run_start = None;
            continue;
        }
        let start = *run_start.get_or_insert(i);
        if i + 1 - start > min_gap {
            return start;
        }
    }
    win.end
}

/// Detect the next phrase at or after `cursor`.
pub fn detect_phrase(samples: &[f32], win: Window, cursor: usize, p: &PhraseParams) -> Phrase {
    let start = next_above(samples, win, cursor, p.attack);
    let end = next_gap(samples, win, start.saturating_add(p.min_phrase), p.release, p.min_gap).max(start);
    let rms = rms_above_noise(&samples[start..end], p.attack);
    Phrase {
        start,
        end,
        rms,
        gain: p.gain_for(rms),
    }
}

fn ramp(buf: &mut StereoBuffer, from: usize, to: usize, from_gain: f32, to_gain: f32) {
    let len = to.saturating_sub(from);
    for (n, i) in (from..to).enumerate() {
        let g = from_gain + (n as f32 / len as f32) * (to_gain - from_gain);
        buf.left[i] *= g;
        buf.right[i] *= g;
    }
}

/// Level every phrase in the window against `reference_rms`.
///
/// One forward pass: each phrase is ramped into from the end of the
/// previous one and then held at its own flat gain. After the last phrase
/// the gain ramps back to unity at the window end.
pub fn phrase_dynamics(buf: &mut StereoBuffer, win: Window, reference_rms: f32, cfg: &DynamicsConfig) -> Vec<Phrase> {
    let p = PhraseParams::new(reference_rms, cfg);
    log::info!(
        "Phrase dynamics: attack={:.5} release={:.5} target={:.5}",
        p.attack,
        p.release,
        p.target
    );

    let mut phrases = Vec::new();
    let mut prev_end = win.start;
    let mut prev_gain = 1.0f32;
    let mut cursor = win.start;

    while cursor < win.end {
        let phrase = detect_phrase(&buf.left, win, cursor, &p);
        log::debug!(
            "Phrase {}..{} rms={:.5} gain={:.4}",
            phrase.start,
            phrase.end,
            phrase.rms,
            phrase.gain
        );

        ramp(buf, prev_end, phrase.start, prev_gain, phrase.gain);
        for i in phrase.start..phrase.end {
            buf.left[i] *= phrase.gain;
            buf.right[i] *= phrase.gain;
        }

        prev_end = phrase.end;
        prev_gain = phrase.gain;
        cursor = phrase.end + 1;
        if phrase.start < phrase.end {
            phrases.push(phrase);
        }
    }

    log::info!("Phrases leveled: {}", phrases.len());
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::level::channel_rms;
    use std::f32::consts::PI;

    /// Two bursts of a tone with different levels separated by silence.
    fn two_bursts(a1: f32, a2: f32) -> (StereoBuffer, [(usize, usize); 2]) {
        let sec = 44100;
        let b1 = (sec / 2, sec / 2 + sec);
        let b2 = (b1.1 + sec, b1.1 + 2 * sec);
        let total = b2.1 + sec / 2;
        let samples: Vec<f32> = (0..total)
            .map(|i| {
                let s = (2.0 * PI * 220.0 * i as f32 / 44100.0).sin();
                if (b1.0..b1.1).contains(&i) {
                    a1 * s
                } else if (b2.0..b2.1).contains(&i) {
                    a2 * s
                } else {
                    0.0
                }
            })
            .collect();
        (StereoBuffer::from_mono(samples), [b1, b2])
    }

    fn expected_gain(reference: f32, burst_rms_above_attack: f32) -> f32 {
        (2.5 * reference / burst_rms_above_attack).clamp(0.5, 2.0)
    }

    #[test]
    fn bursts_are_leveled_toward_target() {
        let cfg = DynamicsConfig::default();
        let (mut buf, bursts) = two_bursts(0.8, 0.3);
        let win = buf.full_window();
        let reference = channel_rms(&buf.left);
        let attack = reference * cfg.attack_ratio;

        let before: Vec<(f32, f32)> = bursts
            .iter()
            .map(|&(s, e)| (channel_rms(&buf.left[s..e]), rms_above_noise(&buf.left[s..e], attack)))
            .collect();

        let phrases = phrase_dynamics(&mut buf, win, reference, &cfg);
        assert_eq!(phrases.len(), 2);

        for (k, &(s, e)) in bursts.iter().enumerate() {
            let (burst_rms, loud_rms) = before[k];
            let gain = expected_gain(reference, loud_rms);
            assert!((phrases[k].gain - gain).abs() < 1e-3, "phrase {k} gain {}", phrases[k].gain);
            // Measure well inside the phrase where the flat gain applies
            let after = channel_rms(&buf.left[s + 2000..e - 2000]);
            assert!((after - gain * burst_rms).abs() < 0.01 * gain * burst_rms, "phrase {k}: {after}");
        }
        // The quieter burst gets the larger boost, capped at the maximum
        assert!(phrases[1].gain > phrases[0].gain);
        assert_eq!(phrases[1].gain, cfg.max_gain);
    }

    #[test]
    fn gap_ramp_is_monotonic() {
        let cfg = DynamicsConfig::default();
        let (buf, _) = two_bursts(0.8, 0.3);
        let win = buf.full_window();
        let reference = channel_rms(&buf.left);

        // Run on a constant carrier so the applied gain is directly visible
        let mut probe = StereoBuffer::new(buf.left.clone(), vec![1.0; buf.len()]);
        let phrases = phrase_dynamics(&mut probe, win, reference, &cfg);
        let (first, second) = (phrases[0], phrases[1]);

        let gains = &probe.right[first.end..second.start];
        assert!(!gains.is_empty());
        assert!(gains.windows(2).all(|w| w[1] >= w[0] - 1e-6));
        assert!((gains[0] - first.gain).abs() < 1e-3);
        assert!((gains[gains.len() - 1] - second.gain).abs() < 0.01);
        // Held flat across each phrase
        assert!(probe.right[first.start..first.end].iter().all(|&g| (g - first.gain).abs() < 1e-6));
    }

    #[test]
    fn phrase_ends_at_first_long_pause() {
        let cfg = DynamicsConfig::default();
        let (buf, bursts) = two_bursts(0.5, 0.5);
        let win = buf.full_window();
        let p = PhraseParams::new(channel_rms(&buf.left), &cfg);
        let phrase = detect_phrase(&buf.left, win, win.start, &p);
        assert!(phrase.start >= bursts[0].0 && phrase.start < bursts[0].0 + 200);
        // The pause starts at the last quiet sample run of the burst
        assert!(phrase.end <= bursts[0].1 && phrase.end + ms_to_samples(5) > bursts[0].1);
    }

    #[test]
    fn silence_is_untouched() {
        let cfg = DynamicsConfig::default();
        let mut buf = StereoBuffer::from_mono(vec![0.0; 44100]);
        let win = buf.full_window();
        let phrases = phrase_dynamics(&mut buf, win, 0.0, &cfg);
        assert!(phrases.is_empty());
        assert!(buf.left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn samples_outside_window_are_not_touched() {
        let cfg = DynamicsConfig::default();
        let (mut buf, _) = two_bursts(0.8, 0.3);
        let before = buf.clone();
        let win = buf.window(30000, buf.len() - 30000);
        let reference = channel_rms(&buf.left[win.range()]);
        phrase_dynamics(&mut buf, win, reference, &cfg);
        assert_eq!(buf.left[..30000], before.left[..30000]);
        assert_eq!(buf.left[win.end..], before.left[win.end..]);
    }

    #[test]
    fn zero_strength_is_identity_gain() {
        let cfg = DynamicsConfig { strength: 0.0, ..DynamicsConfig::default() };
        let p = PhraseParams::new(0.1, &cfg);
        assert_eq!(p.gain_for(0.05), 1.0);
        assert_eq!(p.gain_for(0.0), 1.0);
    }
}
