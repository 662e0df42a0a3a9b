use crate::analysis::level::peak;
use crate::config::StereoConfig;

use super::buffer::{ms_to_samples, Channel, StereoBuffer, Window};

pub fn peak_level(buf: &StereoBuffer, win: Window) -> f32 {
    peak(&buf.left[win.range()]).max(peak(&buf.right[win.range()]))
}

pub fn apply_gain(buf: &mut StereoBuffer, win: Window, gain: f32) {
    log::debug!("Gain {:.4} over {}..{}", gain, win.start, win.end);
    apply_channel_gain(buf, win, Channel::Left, gain);
    apply_channel_gain(buf, win, Channel::Right, gain);
}

pub fn apply_channel_gain(buf: &mut StereoBuffer, win: Window, ch: Channel, gain: f32) {
    for s in &mut buf.channel_mut(ch)[win.range()] {
        *s *= gain;
    }
}

pub fn copy_channel(buf: &mut StereoBuffer, win: Window, from: Channel) {
    let (src, dst) = match from {
        Channel::Left => (&buf.left, &mut buf.right),
        Channel::Right => (&buf.right, &mut buf.left),
    };
    dst[win.range()].copy_from_slice(&src[win.range()]);
}

/// Scale both channels so the stereo peak sits at `max_volume`.
/// A silent window is left alone. Returns the factor applied.
pub fn normalize(buf: &mut StereoBuffer, win: Window, max_volume: f32) -> f32 {
    let stereo_peak = peak_level(buf, win);
    if stereo_peak <= 0.0 {
        log::debug!("Normalize: silent window, skipped");
        return 1.0;
    }
    let factor = max_volume / stereo_peak;
    log::info!("Normalizing: peak={:.5}, factor={:.4}", stereo_peak, factor);
    apply_gain(buf, win, factor);
    factor
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Balance {
    /// The near-silent channel was replaced by the other one
    Copied { from: Channel },
    Scaled { channel: Channel, gain: f32 },
    Unchanged,
}

/// Even out the channels given their measured RMS.
///
/// A channel under the silence threshold while the other is not is treated
/// as a dropout and overwritten. Otherwise the quieter channel is raised;
/// the louder one is never touched.
pub fn channel_balance(buf: &mut StereoBuffer, win: Window, left_rms: f32, right_rms: f32, cfg: &StereoConfig) -> Balance {
    let left_silent = left_rms < cfg.silent_threshold;
    let right_silent = right_rms < cfg.silent_threshold;

    if left_silent && !right_silent {
        log::info!("Left channel below silent threshold, copying right");
        copy_channel(buf, win, Channel::Right);
        return Balance::Copied { from: Channel::Right };
    }
    if right_silent && !left_silent {
        log::info!("Right channel below silent threshold, copying left");
        copy_channel(buf, win, Channel::Left);
        return Balance::Copied { from: Channel::Left };
    }

    let (channel, louder, quieter) = if right_rms < left_rms {
        (Channel::Right, left_rms, right_rms)
    } else {
        (Channel::Left, right_rms, left_rms)
    };
    if quieter <= 0.0 || louder == quieter {
        return Balance::Unchanged;
    }
    let gain = louder / quieter;
    log::info!("Balancing {:?} channel by {:.4}", channel, gain);
    apply_channel_gain(buf, win, channel, gain);
    Balance::Scaled { channel, gain }
}

/// One-pole DC blocker per channel.
pub fn remove_dc_offset(buf: &mut StereoBuffer, win: Window) {
    for samples in [&mut buf.left, &mut buf.right] {
        let mut prev_in = 0.0f32;
        let mut prev_out = 0.0f32;
        for s in &mut samples[win.range()] {
            let current = 0.999 * prev_out + *s - prev_in;
            prev_in = *s;
            prev_out = current;
            *s = current;
        }
    }
}

/// Synthesize width for a mono source by feeding a delayed copy of the mid
/// signal into the side signal.
pub fn add_ambience(buf: &mut StereoBuffer, win: Window, cfg: &StereoConfig) {
    let delay = ms_to_samples(cfg.ambience_delay_ms);
    log::info!("Adding stereo ambience ({} sample delay)", delay);
    for i in win.range() {
        let mid = (buf.left[i] + buf.right[i]) * 0.5;
        let mut side = (buf.left[i] - buf.right[i]) * 0.5;
        // Earlier samples were already rewritten, but their mid is unchanged
        if i >= win.start + delay {
            let j = i - delay;
            let delayed_mid = (buf.left[j] + buf.right[j]) * 0.5;
            side += delayed_mid * cfg.ambience_gain;
        }
        buf.left[i] = mid + side;
        buf.right[i] = mid - side;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::level::channel_rms;
    use std::f32::consts::PI;

    fn tone(freq: f32, amp: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn rms_pair(buf: &StereoBuffer) -> (f32, f32) {
        (channel_rms(&buf.left), channel_rms(&buf.right))
    }

    #[test]
    fn normalize_hits_max_volume() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::new(tone(220.0, 0.3, 4410), tone(330.0, 0.6, 4410));
        let win = buf.full_window();
        normalize(&mut buf, win, cfg.max_volume());
        assert!((peak_level(&buf, win) - cfg.max_volume()).abs() < 1e-5);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let mut buf = StereoBuffer::from_mono(vec![0.0; 100]);
        let win = buf.full_window();
        assert_eq!(normalize(&mut buf, win, 0.9), 1.0);
        assert!(buf.left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn balance_raises_quieter_channel_only() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::new(tone(440.0, 0.5, 4410), tone(440.0, 0.2, 4410));
        let louder = buf.left.clone();
        let win = buf.full_window();
        let (l, r) = rms_pair(&buf);
        let result = channel_balance(&mut buf, win, l, r, &cfg);
        assert!(matches!(result, Balance::Scaled { channel: Channel::Right, .. }));
        assert_eq!(buf.left, louder);
        let (l, r) = rms_pair(&buf);
        assert!((l - r).abs() < 1e-4);
    }

    #[test]
    fn balance_copies_over_dropout() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::new(vec![0.001; 1000], tone(440.0, 0.5, 1000));
        let win = buf.full_window();
        let (l, r) = rms_pair(&buf);
        let result = channel_balance(&mut buf, win, l, r, &cfg);
        assert_eq!(result, Balance::Copied { from: Channel::Right });
        assert_eq!(buf.left, buf.right);
    }

    #[test]
    fn balance_of_equal_channels_is_noop() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::from_mono(vec![0.5; 44100]);
        let before = buf.clone();
        let win = buf.full_window();
        let (l, r) = rms_pair(&buf);
        assert_eq!(channel_balance(&mut buf, win, l, r, &cfg), Balance::Unchanged);
        assert_eq!(buf, before);
    }

    #[test]
    fn dc_offset_decays() {
        let mut buf = StereoBuffer::new(
            tone(440.0, 0.2, 44100).iter().map(|s| s + 0.3).collect(),
            vec![0.25; 44100],
        );
        let win = buf.full_window();
        remove_dc_offset(&mut buf, win);
        let tail = &buf.left[40000..];
        let mean: f32 = tail.iter().sum::<f32>() / tail.len() as f32;
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!(buf.right[44099].abs() < 0.001);
    }

    #[test]
    fn ambience_widens_mono_and_keeps_mid() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::from_mono(tone(300.0, 0.4, 4410));
        let before = buf.clone();
        let win = buf.full_window();
        add_ambience(&mut buf, win, &cfg);

        let delay = ms_to_samples(cfg.ambience_delay_ms);
        // Nothing to delay yet at the start of the window
        assert_eq!(buf.left[..delay], before.left[..delay]);
        assert_ne!(buf.left, buf.right);
        for i in 0..buf.len() {
            let mid = (buf.left[i] + buf.right[i]) * 0.5;
            assert!((mid - before.left[i]).abs() < 1e-6);
        }
        let i = delay + 100;
        let side = (buf.left[i] - buf.right[i]) * 0.5;
        assert!((side - before.left[i - delay] * cfg.ambience_gain).abs() < 1e-6);
    }

    #[test]
    fn constant_signal_end_to_end() {
        let cfg = StereoConfig::default();
        let mut buf = StereoBuffer::from_mono(vec![0.5; 44100]);
        let win = buf.full_window();
        let (l, r) = rms_pair(&buf);
        assert!((l - 0.5).abs() < 1e-6 && (r - 0.5).abs() < 1e-6);
        assert_eq!(channel_balance(&mut buf, win, l, r, &cfg), Balance::Unchanged);
        normalize(&mut buf, win, cfg.max_volume());
        assert!(buf
            .left
            .iter()
            .chain(&buf.right)
            .all(|&s| (s - cfg.max_volume()).abs() < 1e-6));
    }
}
