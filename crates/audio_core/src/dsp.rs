use std::f64::consts::PI;

use rubato::{FastFixedIn, PolynomialDegree, Resampler};

use crate::{AudioClip, AudioError};

const RESAMPLE_CHUNK: usize = 1024;
const STRETCH_FRAME: usize = 2048;
const STRETCH_SYNTHESIS_HOP: usize = STRETCH_FRAME / 4;
const MIN_WINDOW_SUM: f64 = 1e-6;

fn output_frames(frames: usize, factor: f64) -> usize {
    (frames as f64 / factor).round() as usize
}

/// Changes tempo and pitch together: the clip is resampled from its rate to
/// `rate / factor` and then played back at the original rate.
pub fn resample_varispeed(clip: &AudioClip, factor: f64) -> Result<AudioClip, AudioError> {
    let channels = usize::from(clip.channels);
    let frames = clip.frames();
    let out_frames = output_frames(frames, factor);
    if frames == 0 || out_frames == 0 {
        return Ok(AudioClip {
            sample_rate: clip.sample_rate,
            channels: clip.channels,
            samples: Vec::new(),
        });
    }

    let input = deinterleave(&clip.samples, channels);
    let mut resampler = FastFixedIn::<f32>::new(
        1.0 / factor,
        1.0,
        PolynomialDegree::Septic,
        RESAMPLE_CHUNK,
        channels,
    )?;
    let delay = resampler.output_delay();
    let wanted = delay + out_frames;
    let mut output_buffer = resampler.output_buffer_allocate(true);
    let mut resampled: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= frames {
        let chunk: Vec<&[f32]> = input.iter().map(|ch| &ch[pos..]).collect();
        let (in_len, out_len) =
            resampler.process_into_buffer(chunk.as_slice(), output_buffer.as_mut_slice(), None)?;
        pos += in_len;
        append_frames(&mut resampled, &output_buffer, out_len);
    }
    if pos < frames {
        let tail: Vec<&[f32]> = input.iter().map(|ch| &ch[pos..]).collect();
        let (_, out_len) = resampler.process_partial_into_buffer(
            Some(tail.as_slice()),
            output_buffer.as_mut_slice(),
            None,
        )?;
        append_frames(&mut resampled, &output_buffer, out_len);
    }
    // Flush the filter delay so the tail of the clip is not cut short.
    while resampled[0].len() < wanted {
        let (_, out_len) = resampler.process_partial_into_buffer(
            None::<&[&[f32]]>,
            output_buffer.as_mut_slice(),
            None,
        )?;
        if out_len == 0 {
            break;
        }
        append_frames(&mut resampled, &output_buffer, out_len);
    }

    let mut samples = Vec::with_capacity(out_frames * channels);
    for frame in delay..wanted {
        for channel in &resampled {
            samples.push(channel.get(frame).copied().unwrap_or(0.0));
        }
    }

    Ok(AudioClip {
        sample_rate: clip.sample_rate,
        channels: clip.channels,
        samples,
    })
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    (0..channels)
        .map(|c| samples.iter().skip(c).step_by(channels).copied().collect())
        .collect()
}

fn append_frames(dst: &mut [Vec<f32>], src: &[Vec<f32>], len: usize) {
    for (dst, src) in dst.iter_mut().zip(src) {
        dst.extend_from_slice(&src[..len]);
    }
}

/// Changes tempo while keeping pitch, using Hann-windowed overlap-add: frames
/// are read every `hop * factor` input samples and written every `hop`
/// output samples.
pub fn time_stretch(clip: &AudioClip, factor: f64) -> AudioClip {
    let channels = usize::from(clip.channels);
    let frames = clip.frames();
    let out_frames = output_frames(frames, factor);
    let window = hann_window(STRETCH_FRAME);
    let analysis_hop = STRETCH_SYNTHESIS_HOP as f64 * factor;

    let mut acc = vec![0.0f64; (out_frames + STRETCH_FRAME) * channels];
    let mut weights = vec![0.0f64; out_frames + STRETCH_FRAME];

    let mut k = 0usize;
    loop {
        let out_start = k * STRETCH_SYNTHESIS_HOP;
        if out_start >= out_frames {
            break;
        }
        let in_start = (k as f64 * analysis_hop).round() as usize;
        for (n, &w) in window.iter().enumerate() {
            let dst = out_start + n;
            weights[dst] += w;
            let src = in_start + n;
            if src >= frames {
                continue;
            }
            for c in 0..channels {
                acc[dst * channels + c] += w * f64::from(clip.samples[src * channels + c]);
            }
        }
        k += 1;
    }

    let mut samples = Vec::with_capacity(out_frames * channels);
    for frame in 0..out_frames {
        let weight = weights[frame];
        for c in 0..channels {
            let value = acc[frame * channels + c];
            let normalised = if weight > MIN_WINDOW_SUM {
                value / weight
            } else {
                value
            };
            samples.push(normalised as f32);
        }
    }

    AudioClip {
        sample_rate: clip.sample_rate,
        channels: clip.channels,
        samples,
    }
}

fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / len as f64).cos())
        .collect()
}
