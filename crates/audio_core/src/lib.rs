use shared::{domain::AdjustmentKind, instruction::SpeedAdjustment};
use thiserror::Error;
use tracing::debug;

mod decode;
mod dsp;
mod wav;

pub use decode::{decode_audio, decode_audio_limited};
pub use dsp::{resample_varispeed, time_stretch};
pub use wav::write_wav;

pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// 64 Mi samples: 256 MiB of `f32` working audio, about 12 minutes of 48 kHz
/// stereo.
pub const DEFAULT_MAX_OUTPUT_SAMPLES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("failed to encode WAV output: {0}")]
    Wav(#[from] hound::Error),
    #[error("failed to set up resampler: {0}")]
    ResamplerSetup(#[from] rubato::ResamplerConstructionError),
    #[error("resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("audio would hold {samples} samples, more than the limit of {max_samples}")]
    TooManySamples { samples: u64, max_samples: usize },
    #[error("adjustment {adjustment} gives speed factor {factor}, which must be greater than zero")]
    FactorOutOfRange { adjustment: String, factor: f64 },
}

/// Interleaved PCM audio normalised to `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / usize::from(self.channels)
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Playback-rate multiplier for one adjustment: `SPEED:n` plays `1 + n/100`
/// times as fast, `SLOW:n` plays `1 - n/100` times as fast.
pub fn speed_factor(adjustment: &SpeedAdjustment) -> Result<f64, AudioError> {
    let change = f64::from(adjustment.value) / 100.0;
    let factor = match adjustment.kind {
        AdjustmentKind::Speed => 1.0 + change,
        AdjustmentKind::Slow => 1.0 - change,
    };
    if factor <= 0.0 {
        return Err(AudioError::FactorOutOfRange {
            adjustment: adjustment.to_string(),
            factor,
        });
    }
    Ok(factor)
}

/// Applies every adjustment in order. Factors and the size of every
/// intermediate clip are checked against `max_samples` before any audio is
/// touched.
pub fn apply_adjustments(
    clip: AudioClip,
    adjustments: &[SpeedAdjustment],
    max_samples: usize,
) -> Result<AudioClip, AudioError> {
    let factors = adjustments
        .iter()
        .map(|adjustment| speed_factor(adjustment).map(|factor| (adjustment, factor)))
        .filter(|step| !matches!(step, Ok((_, factor)) if *factor == 1.0))
        .collect::<Result<Vec<_>, _>>()?;

    let peak = peak_samples(&clip, factors.iter().map(|(_, factor)| *factor));
    if peak > max_samples as u64 {
        return Err(AudioError::TooManySamples {
            samples: peak,
            max_samples,
        });
    }

    let mut clip = clip;
    for (adjustment, factor) in factors {
        debug!(%adjustment, factor, frames = clip.frames(), "applying speed adjustment");
        clip = if adjustment.pitch_preserved {
            time_stretch(&clip, factor)
        } else {
            resample_varispeed(&clip, factor)?
        };
    }
    Ok(clip)
}

/// Largest sample count any step of the chain produces, including the input.
fn peak_samples(clip: &AudioClip, factors: impl IntoIterator<Item = f64>) -> u64 {
    let channels = f64::from(clip.channels);
    let mut frames = clip.frames() as f64;
    let mut peak = frames * channels;
    for factor in factors {
        frames = (frames / factor).round();
        peak = peak.max(frames * channels);
    }
    peak as u64
}

pub trait AudioProcessor: Send + Sync {
    fn process(&self, input: &[u8], adjustments: &[SpeedAdjustment])
        -> Result<Vec<u8>, AudioError>;

    fn content_type(&self) -> &'static str;
}

/// Decodes any supported input, applies the adjustments and re-encodes as
/// 16-bit WAV at the input sample rate.
#[derive(Debug, Clone, Copy)]
pub struct WavSpeedProcessor {
    max_samples: usize,
}

impl WavSpeedProcessor {
    pub fn new(max_samples: usize) -> Self {
        Self { max_samples }
    }
}

impl Default for WavSpeedProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_SAMPLES)
    }
}

impl AudioProcessor for WavSpeedProcessor {
    fn process(
        &self,
        input: &[u8],
        adjustments: &[SpeedAdjustment],
    ) -> Result<Vec<u8>, AudioError> {
        let clip = decode_audio_limited(input, self.max_samples)?;
        let input_secs = clip.duration_secs();
        let processed = apply_adjustments(clip, adjustments, self.max_samples)?;
        debug!(
            input_secs,
            output_secs = processed.duration_secs(),
            adjustments = adjustments.len(),
            "processed clip"
        );
        write_wav(&processed)
    }

    fn content_type(&self) -> &'static str {
        WAV_CONTENT_TYPE
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
