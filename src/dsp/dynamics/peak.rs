use crate::dsp::buffer::{Channel, StereoBuffer, Window};

#[inline]
fn sign_change(a: f32, b: f32) -> bool {
    (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0)
}

/// First sample of the lobe containing `i`, not earlier than `floor`.
fn lobe_start(samples: &[f32], i: usize, floor: usize) -> usize {
    (floor + 1..=i)
        .rev()
        .find(|&j| sign_change(samples[j - 1], samples[j]))
        .unwrap_or(floor)
}

/// Last sample of the lobe containing `i`, or the window's last sample.
fn lobe_end(samples: &[f32], i: usize, win: Window) -> usize {
    (i..win.end.saturating_sub(1))
        .find(|&j| sign_change(samples[j], samples[j + 1]))
        .unwrap_or(win.end - 1)
}

/// Detection threshold that only the outliers clear: mean + 8σ of |x|.
pub fn adaptive_peak_threshold(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| s.abs() as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|s| (s.abs() as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let threshold = mean + 8.0 * variance.sqrt();
    log::debug!("Peak threshold: mean={:.5} sd={:.5} -> {:.5}", mean, variance.sqrt(), threshold);
    threshold as f32
}

/// Scale each excursion above `threshold` so its top lands on the threshold.
///
/// An excursion is bounded by the zero crossings around it, so the scaled
/// region starts and ends near zero. Returns the number of events reduced.
pub fn reduce_channel_peaks(buf: &mut StereoBuffer, win: Window, ch: Channel, threshold: f32) -> usize {
    let samples = buf.channel_mut(ch);
    let mut reduced = 0;
    let mut floor = win.start;
    let mut i = win.start;

    while i < win.end {
        if samples[i].abs() <= threshold {
            i += 1;
            continue;
        }
        let start = lobe_start(samples, i, floor);
        let end = lobe_end(samples, i, win);
        let top = samples[start..=end].iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        let gain = threshold / top;
        for s in &mut samples[start..=end] {
            *s *= gain;
        }
        reduced += 1;
        floor = end + 1;
        i = end + 1;
    }

    log::debug!("{:?}: peaks reduced={}", ch, reduced);
    reduced
}

pub fn reduce_peaks(buf: &mut StereoBuffer, win: Window, threshold: f32) -> usize {
    let n = reduce_channel_peaks(buf, win, Channel::Left, threshold)
        + reduce_channel_peaks(buf, win, Channel::Right, threshold);
    log::info!("Peak reduction at {:.4}: {} events", threshold, n);
    n
}
