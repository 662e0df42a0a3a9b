use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioFormat;
use crate::dsp::buffer::{StereoBuffer, SAMPLE_RATE};
use crate::error::{MasterError, Result};

pub struct DecodedAudio {
    /// Always stereo at the engine rate
    pub buffer: StereoBuffer,
    /// Rate of `buffer`
    pub sample_rate: u32,
    /// Rate of the source before conversion
    pub source_rate: u32,
    pub channels: usize,
    pub is_mono: bool,
    pub format: AudioFormat,
}

/// Decode a WAV or AIFF file into a stereo buffer at 44100 Hz.
/// Mono sources are duplicated into both channels and flagged.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    let format = AudioFormat::from_path(path)?;
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| MasterError::Decode("no audio tracks found".into()))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    if channels > 2 {
        return Err(MasterError::TooManyChannels(channels));
    }
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MasterError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut left: Vec<f32> = Vec::new();
    let mut right: Vec<f32> = Vec::new();

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::warn!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channels) {
            left.push(frame[0]);
            if channels == 2 {
                right.push(frame[1]);
            }
        }
    }

    let is_mono = channels == 1;
    let mut buffer = if is_mono {
        StereoBuffer::from_mono(left)
    } else {
        StereoBuffer::new(left, right)
    };

    if source_rate as f32 != SAMPLE_RATE {
        log::info!("Converting {}Hz to {}Hz", source_rate, SAMPLE_RATE);
        buffer = resample(&buffer, source_rate)?;
    }

    log::info!(
        "Decoded audio: {} samples/channel, {} channel(s) at {}Hz, {:.1}s",
        buffer.len(),
        channels,
        source_rate,
        buffer.duration_secs()
    );

    Ok(DecodedAudio {
        buffer,
        sample_rate: SAMPLE_RATE as u32,
        source_rate,
        channels,
        is_mono,
        format,
    })
}

/// Resample both channels from `from_rate` to the engine rate using rubato.
fn resample(buf: &StereoBuffer, from_rate: u32) -> Result<StereoBuffer> {
    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    if buf.is_empty() {
        return Ok(StereoBuffer::default());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = SAMPLE_RATE as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0, // max relative ratio
        params,
        buf.len(),
        2,
    )
    .map_err(|e| MasterError::Decode(format!("failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let target_rate = SAMPLE_RATE as u64;
    let expected = ((buf.len() as u64 * target_rate).div_ceil(from_rate as u64)) as usize;

    let input = vec![buf.left.clone(), buf.right.clone()];
    let mut channels = resampler
        .process(&input, None)
        .map_err(|e| MasterError::Decode(format!("resampling failed: {}", e)))?;
    // One zero-padded chunk pushes the filter tail out
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| MasterError::Decode(format!("resampler flush failed: {}", e)))?;
    for (ch, rest) in channels.iter_mut().zip(tail) {
        ch.extend(rest);
    }
    log::debug!("Resampler delay {} frames, keeping {}", delay, expected);

    let mut aligned = channels
        .into_iter()
        .map(|ch| ch.into_iter().skip(delay).take(expected).collect::<Vec<f32>>());
    let left = aligned.next().unwrap_or_default();
    let right = aligned.next().unwrap_or_default();
    Ok(StereoBuffer::new(left, right))
}
