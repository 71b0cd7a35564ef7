//! # Square-Wave Synthesizer
//!
//! Each tone is rendered at its own sample rate: exactly `samples_per_period`
//! samples (100 by default) per waveform cycle, so the sample rate is
//! `f × 100` and the buffer plays back at exactly `f` Hz. The first half of
//! every cycle is `+amplitude`, the second half `-amplitude`.
//!
//! No buffer is ever longer than [`MAX_SAMPLES`]. At the default settings that
//! is about ten minutes of the highest tone.

use serde::Serialize;
use tracing::warn;

use crate::config::SynthConfig;
use crate::error::SoundError;
use crate::tone::Tone;

/// Largest sample buffer the synthesizer and renderers allocate.
pub const MAX_SAMPLES: usize = 1 << 25;

/// Round a fractional sample count to a buffer length within [`MAX_SAMPLES`].
///
/// Negative and NaN counts are empty.
pub fn buffer_len(samples: f64) -> Result<usize, SoundError> {
    let samples = samples.round();
    if samples.is_nan() || samples <= 0.0 {
        return Ok(0);
    }
    if samples > MAX_SAMPLES as f64 {
        return Err(SoundError::TooLong {
            samples,
            limit: MAX_SAMPLES,
        });
    }
    Ok(samples as usize)
}

/// Mono samples with the rate they are meant to be played at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneBuffer {
    pub sample_rate: f64,
    pub samples: Vec<f32>,
}

impl ToneBuffer {
    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    config: SynthConfig,
}

impl Synthesizer {
    pub fn new(config: SynthConfig) -> Self {
        Self { config }
    }

    /// Sample rate used for `tone`, `None` for a rest.
    pub fn sample_rate(&self, tone: Tone) -> Option<f64> {
        tone.frequency()
            .map(|f| f * self.config.samples_per_period as f64)
    }

    /// Render `tone` for `duration` seconds, `Ok(None)` for a rest.
    ///
    /// Fails with [`SoundError::TooLong`] before allocating anything when the
    /// buffer would exceed [`MAX_SAMPLES`].
    pub fn try_synthesize(
        &self,
        tone: Tone,
        duration: f64,
    ) -> Result<Option<ToneBuffer>, SoundError> {
        let Some(sample_rate) = self.sample_rate(tone) else {
            return Ok(None);
        };
        let len = buffer_len(sample_rate * duration)?;
        let period = self.config.samples_per_period.max(1);
        let high = self.config.amplitude;

        let samples = (0..len)
            .map(|i| if i % period < period / 2 { high } else { -high })
            .collect();

        Ok(Some(ToneBuffer {
            sample_rate,
            samples,
        }))
    }

    /// Render `tone` for `duration` seconds, `None` for a rest.
    ///
    /// A note too long to synthesize is logged and also yields `None`.
    pub fn synthesize(&self, tone: Tone, duration: f64) -> Option<ToneBuffer> {
        self.try_synthesize(tone, duration).unwrap_or_else(|e| {
            warn!(%tone, duration, "{}", e);
            None
        })
    }
}

/// Render `tone` with the default square wave: 100 samples per cycle, ±0.5.
///
/// ```
/// # use sound_effect::{synthesize, Tone};
/// let buffer = synthesize(Tone::C, 0.5).unwrap();
/// assert_eq!(buffer.samples[0], 0.5);
/// assert_eq!(buffer.samples[50], -0.5);
/// assert!(synthesize(Tone::None, 1.0).is_none());
/// ```
pub fn synthesize(tone: Tone, duration: f64) -> Option<ToneBuffer> {
    Synthesizer::default().synthesize(tone, duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_length_matches_rate() {
        for tone in Tone::ALL.iter().copied().filter(|t| !t.is_rest()) {
            let f = tone.frequency().unwrap();
            for duration in [0.0, 0.1, 0.5, 1.0, 2.25] {
                let buffer = synthesize(tone, duration).unwrap();
                assert_eq!(buffer.sample_rate, f * 100.0);
                assert_eq!(buffer.samples.len(), (f * 100.0 * duration).round() as usize);
            }
        }
    }

    #[test]
    fn test_square_wave_shape() {
        let buffer = synthesize(Tone::A, 0.1).unwrap();
        for (i, &sample) in buffer.samples.iter().enumerate() {
            let expected = if i % 100 < 50 { 0.5 } else { -0.5 };
            assert_eq!(sample, expected, "sample {}", i);
        }
    }

    #[test]
    fn test_one_cycle_per_hundred_samples() {
        let buffer = synthesize(Tone::E, 1.0).unwrap();
        let rising_edges = buffer
            .samples
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] > 0.0)
            .count();
        // the last partial cycle may or may not finish
        let cycles = buffer.samples.len() / 100;
        assert!(rising_edges == cycles || rising_edges + 1 == cycles);
    }

    #[test]
    fn test_playback_length_close_to_duration() {
        let buffer = synthesize(Tone::Fs, 0.75).unwrap();
        assert!((buffer.duration() - 0.75).abs() < 1.0 / buffer.sample_rate);
    }

    #[test]
    fn test_rest_has_no_buffer() {
        assert!(synthesize(Tone::None, 3.0).is_none());
        assert!(Synthesizer::default().sample_rate(Tone::None).is_none());
    }

    #[test]
    fn test_custom_amplitude() {
        let synth = Synthesizer::new(SynthConfig {
            amplitude: 0.25,
            ..SynthConfig::default()
        });
        let buffer = synth.synthesize(Tone::G, 0.01).unwrap();
        assert_eq!(buffer.samples[0], 0.25);
        assert_eq!(buffer.samples[60], -0.25);
    }

    #[test]
    fn test_huge_duration_is_refused() {
        let notes = crate::parser::parse("C: 1000000000000000").unwrap();
        let synth = Synthesizer::default();
        let err = synth.try_synthesize(notes[0].tone, notes[0].duration).unwrap_err();
        assert!(matches!(err, SoundError::TooLong { limit: MAX_SAMPLES, .. }));
        assert!(synth.synthesize(notes[0].tone, notes[0].duration).is_none());
        assert!(synthesize(Tone::Ch, f64::INFINITY).is_none());
    }

    #[test]
    fn test_buffer_len_bounds() {
        assert_eq!(buffer_len(-3.0).unwrap(), 0);
        assert_eq!(buffer_len(f64::NAN).unwrap(), 0);
        assert_eq!(buffer_len(2.4).unwrap(), 2);
        assert_eq!(buffer_len(MAX_SAMPLES as f64).unwrap(), MAX_SAMPLES);
        assert!(buffer_len(MAX_SAMPLES as f64 + 1.0).is_err());
    }
}
