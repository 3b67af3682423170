use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{AudioClip, AudioError};

const OUTPUT_BITS_PER_SAMPLE: u16 = 16;

pub fn write_wav(clip: &AudioClip) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: clip.channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: OUTPUT_BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in &clip.samples {
            let scaled = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round();
            writer.write_sample(scaled as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
