//! Two-pole recursive filters over a window of both channels.
//!
//! Coefficients are derived on every call and the delay lines start at zero,
//! so cascading means calling the same filter again.

use std::f32::consts::PI;

use super::buffer::{StereoBuffer, Window, SAMPLE_RATE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
}

#[derive(Clone, Copy, Debug)]
pub struct PassCoefficients {
    pub k: f32,
    pub a1: f32,
    pub a0: f32,
}

impl PassCoefficients {
    pub fn new(freq_hz: f32, q: f32) -> Self {
        let damp = 0.01 + q * 20.0;
        let c = 1.0 / (PI * freq_hz / SAMPLE_RATE).tan();
        let k = 1.0 / (1.0 + c * (c + damp));
        Self {
            k,
            a1: 2.0 * (1.0 - c * c) * k,
            a0: (1.0 + c * (c - damp)) * k,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BandCoefficients {
    pub k: f32,
    pub a1: f32,
    pub a0: f32,
}

impl BandCoefficients {
    /// `width` runs from 0 (narrow) to 1 (wide).
    pub fn new(freq_hz: f32, width: f32) -> Self {
        let damp = width * 0.999 + 0.001;
        let c = 1.0 / (PI * freq_hz / SAMPLE_RATE).tan();
        let a2 = 1.0 + c * (c + damp);
        Self {
            k: c * damp / a2,
            a1: 2.0 * (1.0 - c * c) / a2,
            a0: (1.0 + c * (c - damp)) / a2,
        }
    }
}

/// Delay line for one channel.
#[derive(Clone, Copy, Debug, Default)]
struct Delay {
    d1: f32,
    d2: f32,
}

impl Delay {
    /// Advances the lowpass state and returns the reconstructed lowpass sample.
    #[inline]
    fn pass(&mut self, c: &PassCoefficients, x: f32) -> f32 {
        let d0 = c.k * x - c.a1 * self.d1 - c.a0 * self.d2;
        let out = d0 + self.d1 + self.d1 + self.d2;
        self.d2 = self.d1;
        self.d1 = d0;
        out
    }

    /// Advances the bandpass state and returns the in-band ("wet") sample.
    #[inline]
    fn band(&mut self, c: &BandCoefficients, x: f32) -> f32 {
        let d0 = c.k * x - (c.a1 * self.d1 + c.a0 * self.d2);
        let wet = d0 - self.d2;
        self.d2 = self.d1;
        self.d1 = d0;
        wet
    }
}

/// Lowpass or highpass both channels over `win`, in place.
pub fn pass_filter(buf: &mut StereoBuffer, win: Window, freq_hz: f32, q: f32, kind: FilterKind) {
    let coeffs = PassCoefficients::new(freq_hz, q);
    for samples in [&mut buf.left, &mut buf.right] {
        let mut delay = Delay::default();
        for s in &mut samples[win.range()] {
            let low = delay.pass(&coeffs, *s);
            *s = match kind {
                FilterKind::Lowpass => low,
                FilterKind::Highpass => *s - low,
            };
        }
    }
}

pub fn highpass(buf: &mut StereoBuffer, win: Window, freq_hz: f32, q: f32) {
    pass_filter(buf, win, freq_hz, q, FilterKind::Highpass);
}

#[allow(dead_code)]
pub fn lowpass(buf: &mut StereoBuffer, win: Window, freq_hz: f32, q: f32) {
    pass_filter(buf, win, freq_hz, q, FilterKind::Lowpass);
}

/// Resonant bandpass blended back into the signal with `gain`.
///
/// Each sample becomes `x + wet * (gain - 1)`, so a gain of 1 leaves the
/// buffer untouched. Returns the RMS of the left channel's wet component
/// over the window either way, which is what band analysis measures.
pub fn band_pass(buf: &mut StereoBuffer, win: Window, freq_hz: f32, width: f32, gain: f32) -> f32 {
    if win.is_empty() {
        return 0.0;
    }
    let coeffs = BandCoefficients::new(freq_hz, width);
    let wet_gain = gain - 1.0;
    let (mut dl, mut dr) = (Delay::default(), Delay::default());
    let mut sum = 0.0f64;
    for i in win.range() {
        let wet_l = dl.band(&coeffs, buf.left[i]);
        let wet_r = dr.band(&coeffs, buf.right[i]);
        if wet_gain != 0.0 {
            buf.left[i] += wet_l * wet_gain;
            buf.right[i] += wet_r * wet_gain;
        }
        sum += (wet_l as f64) * (wet_l as f64);
    }
    (sum / win.len() as f64).sqrt() as f32
}

/// Measurement-only bandpass: wet RMS of `samples` over `win`, no mutation.
pub fn measure_band(samples: &[f32], win: Window, freq_hz: f32, width: f32) -> f32 {
    if win.is_empty() {
        return 0.0;
    }
    let coeffs = BandCoefficients::new(freq_hz, width);
    let mut delay = Delay::default();
    let sum: f64 = samples[win.range()]
        .iter()
        .map(|&x| {
            let wet = delay.band(&coeffs, x) as f64;
            wet * wet
        })
        .sum();
    (sum / win.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::level::channel_rms;
    use proptest::prelude::*;

    fn sine(freq: f32, amp: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn stereo_sine(freq: f32, amp: f32, len: usize) -> StereoBuffer {
        StereoBuffer::from_mono(sine(freq, amp, len))
    }

    fn tail_rms(samples: &[f32]) -> f32 {
        // Skip the filter's settling time
        let tail = &samples[samples.len() / 2..];
        channel_rms(tail)
    }

    #[test]
    fn cascaded_highpass_removes_rumble_keeps_voice() {
        let sine_rms = 0.5 / 2f32.sqrt();

        let mut low = stereo_sine(20.0, 0.5, 44100);
        let win = low.full_window();
        highpass(&mut low, win, 75.0, 0.1);
        let single = tail_rms(&low.left);
        assert!(single < 0.6 * sine_rms);
        highpass(&mut low, win, 75.0, 0.1);
        highpass(&mut low, win, 75.0, 0.1);
        assert!(tail_rms(&low.left) < 0.2 * sine_rms);
        assert!(tail_rms(&low.left) < single);

        let mut mid = stereo_sine(1000.0, 0.5, 44100);
        for _ in 0..3 {
            highpass(&mut mid, win, 75.0, 0.1);
        }
        let ratio = tail_rms(&mid.left) / sine_rms;
        assert!((ratio - 1.0).abs() < 0.05, "ratio {ratio}");
    }

    #[test]
    fn lowpass_removes_highs() {
        let mut buf = stereo_sine(10000.0, 0.5, 44100);
        let win = buf.full_window();
        lowpass(&mut buf, win, 200.0, 0.1);
        assert!(tail_rms(&buf.right) < 0.05);
    }

    #[test]
    fn repeated_highpass_is_deterministic() {
        let mut a = stereo_sine(440.0, 0.3, 8820);
        let win = a.full_window();
        highpass(&mut a, win, 75.0, 0.1);
        let snapshot = a.clone();

        let mut b = snapshot.clone();
        let mut c = snapshot.clone();
        highpass(&mut b, win, 75.0, 0.1);
        highpass(&mut c, win, 75.0, 0.1);
        assert_eq!(b, c);

        // A stationary tone far above the corner passes almost unchanged
        let diff = b.left[4410..]
            .iter()
            .zip(&snapshot.left[4410..])
            .map(|(x, y)| (x - y).abs())
            .fold(0.0f32, f32::max);
        assert!(diff < 0.02, "diff {diff}");
    }

    #[test]
    fn filter_only_touches_window() {
        let mut buf = stereo_sine(50.0, 0.5, 1000);
        let before = buf.clone();
        let win = buf.window(200, 800);
        highpass(&mut buf, win, 75.0, 0.1);
        assert_eq!(&buf.left[..200], &before.left[..200]);
        assert_eq!(&buf.right[800..], &before.right[800..]);
        assert_ne!(&buf.left[200..800], &before.left[200..800]);
    }

    #[test]
    fn unity_gain_band_pass_only_measures() {
        let mut buf = stereo_sine(1500.0, 0.5, 22050);
        let before = buf.clone();
        let win = buf.full_window();
        let rms = band_pass(&mut buf, win, 1500.0, 1.0, 1.0);
        assert_eq!(buf, before);
        assert!(rms > 0.0);
        assert_eq!(rms, measure_band(&before.left, win, 1500.0, 1.0));
    }

    #[test]
    fn band_measurement_prefers_center_frequency() {
        let len = 44100;
        let in_band = StereoBuffer::from_mono(sine(4000.0, 0.5, len));
        let out_band = StereoBuffer::from_mono(sine(150.0, 0.5, len));
        let win = in_band.full_window();
        let a = measure_band(&in_band.left, win, 4000.0, 1.0);
        let b = measure_band(&out_band.left, win, 4000.0, 1.0);
        assert!(a > 2.0 * b, "in-band {a} out-of-band {b}");
    }

    #[test]
    fn band_gain_boosts_and_cuts() {
        let base = stereo_sine(1500.0, 0.25, 44100);
        let win = base.full_window();
        let before = tail_rms(&base.left);

        let mut boosted = base.clone();
        band_pass(&mut boosted, win, 1500.0, 1.0, 1.5);
        assert!(tail_rms(&boosted.left) > before * 1.1);

        let mut cut = base.clone();
        band_pass(&mut cut, win, 1500.0, 1.0, 0.5);
        assert!(tail_rms(&cut.left) < before * 0.9);
    }

    #[test]
    fn empty_window_measures_zero() {
        let mut buf = stereo_sine(100.0, 0.5, 100);
        let win = buf.window(50, 50);
        assert_eq!(band_pass(&mut buf, win, 150.0, 1.0, 1.0), 0.0);
    }

    proptest! {
        #[test]
        fn filters_stay_finite(
            samples in prop::collection::vec(-1.0f32..1.0, 64..512),
            freq in 40.0f32..16000.0,
            gain in 0.5f32..1.5,
        ) {
            let mut buf = StereoBuffer::from_mono(samples);
            let win = buf.full_window();
            highpass(&mut buf, win, freq, 0.1);
            band_pass(&mut buf, win, freq, 1.0, gain);
            prop_assert!(buf.left.iter().chain(&buf.right).all(|s| s.is_finite()));
        }
    }
}
