use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use crate::dsp::buffer::SAMPLE_RATE;
use crate::error::{MasterError, Result};

/// Streams 16-bit PCM into an ffmpeg child that writes a big-endian AIFF.
pub struct FfmpegEncoder {
    child: Child,
}

impl FfmpegEncoder {
    pub fn new(output_path: &Path) -> Result<Self> {
        let output = output_path
            .to_str()
            .ok_or_else(|| MasterError::Encode("output path is not valid UTF-8".into()))?;

        let args = [
            "-y".to_string(),
            "-f".into(), "s16le".into(),
            "-ar".into(), (SAMPLE_RATE as u32).to_string(),
            "-ac".into(), "2".into(),
            "-i".into(), "pipe:0".into(),
            "-c:a".into(), "pcm_s16be".into(),
            "-f".into(), "aiff".into(),
            output.to_string(),
        ];

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MasterError::Encode(format!("failed to spawn ffmpeg ({}). Is ffmpeg installed?", e)))?;

        log::info!("FFmpeg encoder started: {}", output_path.display());
        Ok(Self { child })
    }

    /// Write interleaved stereo samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| MasterError::Encode("ffmpeg stdin not available".into()))?;
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        stdin.write_all(&bytes)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MasterError::Encode(format!("ffmpeg exited with error:\n{}", stderr)));
        }

        log::info!("FFmpeg encoding complete");
        Ok(())
    }
}
