// Audio decoder using Symphonia
// Decodes a whole file to stereo f32 PCM at the engine sample rate

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::PlayerError;

/// Frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// A fully decoded, playback-ready audio buffer.
///
/// Interleaved stereo f32 at the engine sample rate. Once built it is
/// immutable and shared behind an `Arc`, so any number of playback channels
/// can read it concurrently.
#[derive(Debug, Clone)]
pub struct DecodedSound {
    /// Interleaved stereo samples (left, right, left, right, ...).
    pub frames: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedSound {
    pub fn from_frames(frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
        }
    }

    /// Number of stereo frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len() / 2
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

fn decode_err(path: &Path, reason: impl ToString) -> PlayerError {
    PlayerError::Decode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Decode an entire audio file into memory.
///
/// This is the slow path; callers are expected to run it on the preload
/// thread and hit the sound cache afterwards. Malformed packets are skipped,
/// matching how streaming players treat recoverable decode errors.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<DecodedSound, PlayerError> {
    let file = File::open(path).map_err(|e| decode_err(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint using the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(path, e))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err(path, "no audio track found"))?;

    let track_id = track.id;
    let source_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(path, e))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_err(path, e)),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                if sample_buf.is_none() {
                    sample_buf = Some(SampleBuffer::<f32>::new(
                        audio_buf.capacity() as u64,
                        *audio_buf.spec(),
                    ));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(audio_buf);
                    interleaved.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = %path.display(), error = %e, "skipping malformed packet");
                continue;
            }
            Err(e) => return Err(decode_err(path, e)),
        }
    }

    if interleaved.is_empty() {
        return Err(decode_err(path, "no audio frames decoded"));
    }

    let stereo = to_stereo(&interleaved, channels);
    let frames = if source_rate != target_rate {
        resample(&stereo, source_rate, target_rate, path)?
    } else {
        stereo
    };

    Ok(DecodedSound::from_frames(frames, target_rate))
}

/// Map any interleaved channel layout to stereo: mono is duplicated, wider
/// layouts keep the first two channels.
fn to_stereo(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.iter().flat_map(|&s| [s, s]).collect(),
        _ => interleaved
            .chunks_exact(channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Sample-rate convert interleaved stereo using a windowed-sinc resampler.
fn resample(
    stereo: &[f32],
    source_rate: u32,
    target_rate: u32,
    path: &Path,
) -> Result<Vec<f32>, PlayerError> {
    let frame_count = stereo.len() / 2;
    let mut left = Vec::with_capacity(frame_count);
    let mut right = Vec::with_capacity(frame_count);
    for frame in stereo.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        2.0,
        params,
        RESAMPLE_CHUNK,
        2,
    )
    .map_err(|e| decode_err(path, e))?;

    let mut out_left: Vec<f32> = Vec::new();
    let mut out_right: Vec<f32> = Vec::new();
    let mut pos = 0;

    while pos + RESAMPLE_CHUNK <= frame_count {
        let chunk = [
            &left[pos..pos + RESAMPLE_CHUNK],
            &right[pos..pos + RESAMPLE_CHUNK],
        ];
        let out = resampler
            .process(&chunk, None)
            .map_err(|e| decode_err(path, e))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
        pos += RESAMPLE_CHUNK;
    }

    // Remaining partial chunk, then drain the resampler's internal delay line
    if pos < frame_count {
        let chunk = [&left[pos..], &right[pos..]];
        let out = resampler
            .process_partial(Some(&chunk), None)
            .map_err(|e| decode_err(path, e))?;
        out_left.extend_from_slice(&out[0]);
        out_right.extend_from_slice(&out[1]);
    }
    let out = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| decode_err(path, e))?;
    out_left.extend_from_slice(&out[0]);
    out_right.extend_from_slice(&out[1]);

    let mut frames = Vec::with_capacity(out_left.len() * 2);
    for (l, r) in out_left.iter().zip(out_right.iter()) {
        frames.push(*l);
        frames.push(*r);
    }
    Ok(frames)
}
