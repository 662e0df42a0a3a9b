/// Fixed internal sample rate; every time constant assumes it.
pub const SAMPLE_RATE: f32 = 44100.0;

pub fn ms_to_samples(ms: u32) -> usize {
    (ms as f32 / 1000.0 * SAMPLE_RATE) as usize
}

pub fn min_to_samples(min: u32) -> usize {
    (min as f32 * 60.0 * SAMPLE_RATE) as usize
}

pub fn samples_to_secs(samples: usize) -> f32 {
    samples as f32 / SAMPLE_RATE
}

/// Half-open range `[start, end)` of the samples an operation may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Two equal-length channels of normalized samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl StereoBuffer {
    /// Both channels are truncated to the shorter of the two.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().min(right.len());
        left.truncate(len);
        right.truncate(len);
        Self { left, right }
    }

    pub fn from_mono(samples: Vec<f32>) -> Self {
        Self {
            right: samples.clone(),
            left: samples,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        samples_to_secs(self.len())
    }

    /// Window over `[start, end)`, clamped to the buffer.
    pub fn window(&self, start: usize, end: usize) -> Window {
        let end = end.min(self.len());
        let start = start.min(end);
        Window { start, end }
    }

    pub fn full_window(&self) -> Window {
        self.window(0, self.len())
    }

    pub fn channel_mut(&mut self, ch: Channel) -> &mut [f32] {
        match ch {
            Channel::Left => &mut self.left,
            Channel::Right => &mut self.right,
        }
    }

    /// Copy of the windowed samples, for handing to the encoder.
    pub fn slice(&self, win: Window) -> StereoBuffer {
        StereoBuffer {
            left: self.left[win.range()].to_vec(),
            right: self.right[win.range()].to_vec(),
        }
    }

    pub fn interleaved(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .flat_map(|(&l, &r)| [l, r])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps_to_length() {
        let buf = StereoBuffer::from_mono(vec![0.0; 100]);
        assert_eq!(buf.window(10, 1000), Window { start: 10, end: 100 });
        assert_eq!(buf.window(500, 1000), Window { start: 100, end: 100 });
        assert!(buf.window(500, 1000).is_empty());
        assert_eq!(buf.window(50, 20), Window { start: 20, end: 20 });
    }

    #[test]
    fn time_conversions() {
        assert_eq!(ms_to_samples(1000), 44100);
        assert_eq!(ms_to_samples(15), 661);
        assert_eq!(min_to_samples(1), 2_646_000);
    }

    #[test]
    fn new_truncates_to_shorter_channel() {
        let buf = StereoBuffer::new(vec![0.1; 10], vec![0.2; 7]);
        assert_eq!(buf.left.len(), 7);
        assert_eq!(buf.right.len(), 7);
    }

    #[test]
    fn interleave_alternates_channels() {
        let buf = StereoBuffer::new(vec![1.0, 2.0], vec![-1.0, -2.0]);
        assert_eq!(buf.interleaved(), vec![1.0, -1.0, 2.0, -2.0]);
    }
}
