pub mod decode;
pub mod ffmpeg;
pub mod wav;

use std::path::Path;

use crate::dsp::buffer::StereoBuffer;
use crate::error::{MasterError, Result};

/// Container formats the tool reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Aiff,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "wav" | "wave" => Ok(AudioFormat::Wav),
            "aif" | "aiff" | "aifc" => Ok(AudioFormat::Aiff),
            _ => Err(MasterError::UnsupportedFormat(format!(
                "unrecognized file type: {}",
                path.display()
            ))),
        }
    }
}

/// Full-scale float to signed 16-bit.
pub fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Encode as 16-bit signed PCM stereo at 44100 Hz.
pub fn encode_audio(buf: &StereoBuffer, format: AudioFormat, path: &Path) -> Result<()> {
    let samples: Vec<i16> = buf.interleaved().into_iter().map(to_i16).collect();
    log::info!("Saving {} ({:?}, {:.1}s)", path.display(), format, buf.duration_secs());

    match format {
        AudioFormat::Wav => wav::write_wav(path, &samples)?,
        AudioFormat::Aiff => {
            let mut encoder = ffmpeg::FfmpegEncoder::new(path)?;
            encoder.write_samples(&samples)?;
            encoder.finish()?;
        }
    }
    Ok(())
}
