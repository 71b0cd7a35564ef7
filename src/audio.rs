//! # Audio Output
//!
//! Synthesized buffers are handed to an [`AudioSink`] the moment they are
//! ready. Sinks are shared between deferred playback tasks, hence `Send + Sync`.
//!
//! - [`CollectingSink`] keeps every buffer in memory (tests, dry runs).
//! - `DeviceOutput` (feature `audio-out`) plays through the default cpal
//!   output device. Buffers that overlap in time are summed.

use std::sync::{Arc, Mutex, PoisonError};

use crate::synth::ToneBuffer;

pub trait AudioSink: Send + Sync {
    fn play(&self, buffer: ToneBuffer);
}

impl<S: AudioSink + ?Sized> AudioSink for Arc<S> {
    fn play(&self, buffer: ToneBuffer) {
        (**self).play(buffer)
    }
}

/// Sink that records buffers instead of playing them.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    buffers: Arc<Mutex<Vec<ToneBuffer>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> Vec<ToneBuffer> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSink for CollectingSink {
    fn play(&self, buffer: ToneBuffer) {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buffer);
    }
}

/// Resample with nearest-neighbour lookup.
///
/// Square waves have hard edges anyway, so interpolation buys nothing here.
pub fn resample_nearest(buffer: &ToneBuffer, target_rate: f64) -> Vec<f32> {
    if buffer.samples.is_empty() || buffer.sample_rate <= 0.0 || target_rate <= 0.0 {
        return Vec::new();
    }
    let ratio = buffer.sample_rate / target_rate;
    let len = (buffer.duration() * target_rate).round() as usize;
    (0..len)
        .map(|j| {
            let src = ((j as f64 * ratio) as usize).min(buffer.samples.len() - 1);
            buffer.samples[src]
        })
        .collect()
}

#[cfg(feature = "audio-out")]
pub use device::{DeviceOutput, Mixer};

#[cfg(feature = "audio-out")]
mod device {
    use super::{resample_nearest, AudioSink, PoisonError};
    use crate::error::SoundError;
    use crate::synth::ToneBuffer;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, SizedSample};
    use std::sync::{Arc, Mutex};
    use tracing::{info, warn};

    struct Voice {
        samples: Vec<f32>,
        position: usize,
    }

    /// Cloneable handle that queues buffers into the running output stream.
    #[derive(Clone)]
    pub struct Mixer {
        voices: Arc<Mutex<Vec<Voice>>>,
        sample_rate: f64,
    }

    impl Mixer {
        fn next_sample(voices: &mut Vec<Voice>) -> f32 {
            let mut value = 0.0;
            for voice in voices.iter_mut() {
                if let Some(&s) = voice.samples.get(voice.position) {
                    value += s;
                    voice.position += 1;
                }
            }
            value.clamp(-1.0, 1.0)
        }
    }

    impl AudioSink for Mixer {
        fn play(&self, buffer: ToneBuffer) {
            let samples = resample_nearest(&buffer, self.sample_rate);
            self.voices
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Voice {
                    samples,
                    position: 0,
                });
        }
    }

    /// The open output stream. Playback stops when this is dropped.
    pub struct DeviceOutput {
        _stream: cpal::Stream,
        mixer: Mixer,
    }

    impl DeviceOutput {
        pub fn open_default() -> Result<Self, SoundError> {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| SoundError::Audio("no output device available".to_string()))?;
            let config = device
                .default_output_config()
                .map_err(|e| SoundError::Audio(e.to_string()))?;

            info!(
                device = %device.name().unwrap_or_default(),
                sample_rate = config.sample_rate().0,
                channels = config.channels(),
                "opened audio output"
            );

            let mixer = Mixer {
                voices: Arc::new(Mutex::new(Vec::new())),
                sample_rate: config.sample_rate().0 as f64,
            };

            let stream = match config.sample_format() {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), &mixer)?,
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), &mixer)?,
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), &mixer)?,
                other => {
                    return Err(SoundError::Audio(format!(
                        "unsupported sample format: {:?}",
                        other
                    )))
                }
            };
            stream.play().map_err(|e| SoundError::Audio(e.to_string()))?;

            Ok(Self {
                _stream: stream,
                mixer,
            })
        }

        pub fn mixer(&self) -> Mixer {
            self.mixer.clone()
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mixer: &Mixer,
    ) -> Result<cpal::Stream, SoundError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let voices = mixer.voices.clone();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut voices = voices.lock().unwrap_or_else(PoisonError::into_inner);
                    for frame in data.chunks_mut(channels) {
                        let value = Mixer::next_sample(&mut voices);
                        for sample in frame.iter_mut() {
                            *sample = T::from_sample(value);
                        }
                    }
                    voices.retain(|v| v.position < v.samples.len());
                },
                |err| warn!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| SoundError::Audio(e.to_string()))
    }
}
