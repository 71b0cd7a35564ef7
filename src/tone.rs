//! # Tones
//!
//! The 14 tone symbols understood by the parser and by the firmware's
//! `speaker::enqueue_note`: a rest (`None`) plus thirteen chromatic pitches from
//! `C` up to `Ch`, the C one octave above.
//!
//! Each pitched tone maps to the firmware's period constant in microseconds
//! (`C` = 3822 µs). Frequencies are derived from it, never stored separately:
//! `f = 1_000_000 / period`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    None,
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
    Ch,
}

/// Every tone with its period in microseconds (`None` has no period).
pub static TONE_TABLE: [(Tone, Option<u32>); 14] = [
    (Tone::None, None),
    (Tone::C, Some(3822)),
    (Tone::Cs, Some(3677)),
    (Tone::D, Some(3405)),
    (Tone::Ds, Some(3214)),
    (Tone::E, Some(3033)),
    (Tone::F, Some(2863)),
    (Tone::Fs, Some(2702)),
    (Tone::G, Some(2551)),
    (Tone::Gs, Some(2407)),
    (Tone::A, Some(2272)),
    (Tone::As, Some(2145)),
    (Tone::B, Some(2024)),
    (Tone::Ch, Some(1911)),
];

impl Tone {
    pub const ALL: [Tone; 14] = [
        Tone::None,
        Tone::C,
        Tone::Cs,
        Tone::D,
        Tone::Ds,
        Tone::E,
        Tone::F,
        Tone::Fs,
        Tone::G,
        Tone::Gs,
        Tone::A,
        Tone::As,
        Tone::B,
        Tone::Ch,
    ];

    /// Canonical spelling, identical to the firmware enum member.
    pub fn name(self) -> &'static str {
        match self {
            Tone::None => "None",
            Tone::C => "C",
            Tone::Cs => "Cs",
            Tone::D => "D",
            Tone::Ds => "Ds",
            Tone::E => "E",
            Tone::F => "F",
            Tone::Fs => "Fs",
            Tone::G => "G",
            Tone::Gs => "Gs",
            Tone::A => "A",
            Tone::As => "As",
            Tone::B => "B",
            Tone::Ch => "Ch",
        }
    }

    pub fn is_rest(self) -> bool {
        self == Tone::None
    }

    /// Waveform period in microseconds, `None` for a rest.
    pub fn period_us(self) -> Option<u32> {
        TONE_TABLE
            .iter()
            .find(|(tone, _)| *tone == self)
            .and_then(|(_, period)| *period)
    }

    /// Frequency in Hz, `None` for a rest.
    ///
    /// ```
    /// # use sound_effect::Tone;
    /// let f = Tone::C.frequency().unwrap();
    /// assert!((f - 261.64).abs() < 0.01);
    /// assert_eq!(Tone::None.frequency(), None);
    /// ```
    pub fn frequency(self) -> Option<f64> {
        self.period_us().map(|period| 1e6 / period as f64)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Error returned when a token names no tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTone(pub String);

impl fmt::Display for UnknownTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown tone: {}", self.0)
    }
}

impl std::error::Error for UnknownTone {}

impl FromStr for Tone {
    type Err = UnknownTone;

    /// Case-insensitive: `cs`, `CS` and `Cs` all name the same tone.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .iter()
            .copied()
            .find(|tone| tone.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTone(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pitch_has_a_period() {
        for tone in Tone::ALL {
            assert_eq!(tone.period_us().is_none(), tone.is_rest(), "{}", tone);
        }
    }

    #[test]
    fn test_periods_descend_with_pitch() {
        let periods: Vec<u32> = Tone::ALL.iter().filter_map(|t| t.period_us()).collect();
        assert_eq!(periods.len(), 13);
        assert!(periods.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_ch_is_roughly_an_octave_above_c() {
        let c = Tone::C.frequency().unwrap();
        let ch = Tone::Ch.frequency().unwrap();
        assert!((ch / c - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_from_str_ignores_case() {
        assert_eq!("cs".parse::<Tone>().unwrap(), Tone::Cs);
        assert_eq!("CH".parse::<Tone>().unwrap(), Tone::Ch);
        assert_eq!("none".parse::<Tone>().unwrap(), Tone::None);
        assert_eq!("As".parse::<Tone>().unwrap(), Tone::As);
        assert!("H".parse::<Tone>().is_err());
        assert!("Db".parse::<Tone>().is_err());
        assert!("".parse::<Tone>().is_err());
    }

    #[test]
    fn test_display_uses_canonical_name() {
        assert_eq!(Tone::Fs.to_string(), "Fs");
        assert_eq!(Tone::None.to_string(), "None");
    }
}
