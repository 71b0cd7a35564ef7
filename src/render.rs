//! Offline rendering of a note sequence to a WAV file.
//!
//! Uses the same timeline as live playback: every sounding note is
//! synthesized at its own rate, resampled to the output rate and mixed in at
//! its scheduled offset.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::audio::resample_nearest;
use crate::error::SoundError;
use crate::parser::Note;
use crate::scheduler::{plan, total_length};
use crate::synth::{buffer_len, Synthesizer};

/// Mix the whole sequence into one mono track at `sample_rate`.
///
/// The track length is checked against
/// [`MAX_SAMPLES`](crate::synth::MAX_SAMPLES) before anything is allocated.
pub fn render_samples(
    notes: &[Note],
    synth: &Synthesizer,
    sample_rate: u32,
) -> Result<Vec<f32>, SoundError> {
    let rate = sample_rate as f64;
    let len = buffer_len(total_length(notes) * rate)?;
    let mut track = vec![0.0f32; len];

    for entry in plan(notes) {
        let Some(buffer) = synth.try_synthesize(entry.tone, entry.duration)? else {
            continue;
        };
        let start = (entry.offset * rate).round() as usize;
        let samples = resample_nearest(&buffer, rate);
        for (out, sample) in track.iter_mut().skip(start).zip(samples) {
            *out = (*out + sample).clamp(-1.0, 1.0);
        }
    }

    Ok(track)
}

/// Write mono samples as 16-bit PCM.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), SoundError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Render `notes` and write them to `path`.
pub fn render_wav(
    notes: &[Note],
    synth: &Synthesizer,
    sample_rate: u32,
    path: &Path,
) -> Result<usize, SoundError> {
    let samples = render_samples(notes, synth, sample_rate)?;
    write_wav(path, &samples, sample_rate)?;
    info!(path = %path.display(), samples = samples.len(), sample_rate, "wrote WAV");
    Ok(samples.len())
}
