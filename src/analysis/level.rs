/// Amplitude-per-decibel constant of the log/exp level mapping.
///
/// This is not the 20·log10 scale; thresholds throughout were tuned
/// against this exact value.
pub const AMP_DB: f32 = 8.656_170_25;

pub fn db_to_amp(db: f32) -> f32 {
    (db / AMP_DB).exp()
}

pub fn amp_to_db(amp: f32) -> f32 {
    AMP_DB * amp.ln()
}

/// Root-mean-square of a span; 0 for an empty span.
pub fn channel_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// RMS of only the samples whose magnitude exceeds `noise_floor`.
pub fn rms_above_noise(samples: &[f32], noise_floor: f32) -> f32 {
    let (sum, count) = samples
        .iter()
        .filter(|s| s.abs() > noise_floor)
        .fold((0.0f64, 0usize), |(sum, n), &s| (sum + (s as f64) * (s as f64), n + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt() as f32
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn constant_signal_rms_equals_amplitude() {
        for &a in &[0.0f32, 0.01, 0.25, 0.5, 0.999, 1.0] {
            let samples = vec![a; 44100];
            assert!((channel_rms(&samples) - a).abs() < 1e-6, "amplitude {a}");
            let negative = vec![-a; 1000];
            assert!((channel_rms(&negative) - a).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_span_has_zero_rms() {
        assert_eq!(channel_rms(&[]), 0.0);
        assert_eq!(rms_above_noise(&[], 0.1), 0.0);
    }

    #[test]
    fn noise_floor_samples_are_excluded() {
        let samples = [0.5, -0.5, 0.01, -0.02, 0.0];
        assert!((rms_above_noise(&samples, 0.1) - 0.5).abs() < 1e-6);
        assert_eq!(rms_above_noise(&samples, 0.6), 0.0);
    }

    #[test]
    fn target_level_matches_reference() {
        // -21 on this scale is roughly 0.0884 linear
        assert!((db_to_amp(-21.0) - 0.0884).abs() < 1e-3);
        assert_eq!(db_to_amp(0.0), 1.0);
    }

    proptest! {
        #[test]
        fn db_round_trip(x in 1e-6f32..10.0) {
            let back = db_to_amp(amp_to_db(x));
            prop_assert!((back - x).abs() <= x * 1e-5);
        }

        #[test]
        fn db_mapping_is_monotonic(a in 1e-6f32..10.0, b in 1e-6f32..10.0) {
            if a < b {
                prop_assert!(amp_to_db(a) <= amp_to_db(b));
            }
        }
    }
}
