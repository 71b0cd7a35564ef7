//! # Configuration
//!
//! Optional YAML file; every field has a default that reproduces the fixed
//! behaviour, so an empty file (or no file) changes nothing.
//!
//! ```yaml
//! synth:
//!   amplitude: 0.5
//!   samples-per-period: 100
//! render:
//!   sample-rate: 44100
//! speaker:
//!   queue-capacity: 16
//!   sample-rate: 44100
//!   amplitude: 0.5
//! format:
//!   function: speaker::enqueue_note
//!   tone-path: Tone
//!   suffix: e6
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::SoundError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub synth: SynthConfig,
    pub render: RenderConfig,
    pub speaker: SpeakerConfig,
    pub format: FormatConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SynthConfig {
    /// Level of the high half of the square wave; the low half is its negation
    pub amplitude: f32,
    /// Samples per waveform cycle, which also fixes the per-tone sample rate
    pub samples_per_period: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            samples_per_period: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RenderConfig {
    pub sample_rate: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { sample_rate: 44100 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SpeakerConfig {
    /// Notes the device queue holds before `enqueue_note` starts refusing
    pub queue_capacity: usize,
    pub sample_rate: u32,
    pub amplitude: f32,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            sample_rate: 44100,
            amplitude: 0.5,
        }
    }
}

/// Shape of each generated statement: `<function>(<tone-path>::<tone>, <n><suffix>);`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FormatConfig {
    pub function: String,
    pub tone_path: String,
    pub suffix: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            function: "speaker::enqueue_note".to_string(),
            tone_path: "Tone".to_string(),
            suffix: "e6".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, SoundError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(content).map_err(|e| SoundError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SoundError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), SoundError> {
        if self.synth.samples_per_period < 2 {
            return Err(SoundError::Config(
                "synth.samples-per-period must be at least 2".to_string(),
            ));
        }
        if self.render.sample_rate == 0 || self.speaker.sample_rate == 0 {
            return Err(SoundError::Config("sample-rate must be positive".to_string()));
        }
        if self.speaker.queue_capacity == 0 {
            return Err(SoundError::Config(
                "speaker.queue-capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.synth.amplitude, 0.5);
        assert_eq!(config.synth.samples_per_period, 100);
        assert_eq!(config.render.sample_rate, 44100);
        assert_eq!(config.speaker.queue_capacity, 16);
        assert_eq!(config.format, FormatConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let config = Config::from_yaml("render:\n  sample-rate: 22050\n").unwrap();
        assert_eq!(config.render.sample_rate, 22050);
        assert_eq!(config.synth.samples_per_period, 100);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_yaml("synth:\n  volume: 3\n").unwrap_err();
        assert!(matches!(err, SoundError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_yaml("synth:\n  samples-per-period: 1\n").is_err());
        assert!(Config::from_yaml("speaker:\n  queue-capacity: 0\n").is_err());
        assert!(Config::from_yaml("render:\n  sample-rate: 0\n").is_err());
    }
}
