//! # Note Text Parser
//!
//! Input is one note per line:
//!
//! ```text
//! <tone> : <seconds>
//! ```
//!
//! - `<tone>` is one of `None C Cs D Ds E F Fs G Gs A As B Ch`, matched
//!   case-insensitively. The spelling as written is kept for code generation.
//! - Any number of spaces may surround the colon; nothing else may appear on
//!   the line.
//! - `<seconds>` is an unsigned decimal: `1`, `0.5`, `.5` and `2.` are all
//!   accepted, an empty value means `0`.
//! - Blank and whitespace-only lines are ignored.
//!
//! The first line that does not fit aborts the parse with a [`SyntaxError`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyntaxError;
use crate::tone::Tone;

/// A single parsed line: a tone held for `duration` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub tone: Tone,
    /// Tone token exactly as written (`cs`, `CS`, `Cs`, ...)
    pub spelling: String,
    /// Length in seconds
    pub duration: f64,
}

impl Note {
    /// Build a note using the canonical spelling of `tone`.
    pub fn new(tone: Tone, duration: f64) -> Self {
        Self {
            tone,
            spelling: tone.name().to_string(),
            duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.tone.is_rest()
    }
}

/// Parse note text into an ordered note sequence.
///
/// ```
/// # use sound_effect::{parse, Tone};
/// let notes = parse("C: 1\n\nnone : .5\n").unwrap();
/// assert_eq!(notes.len(), 2);
/// assert_eq!(notes[1].tone, Tone::None);
/// assert_eq!(notes[1].spelling, "none");
/// assert_eq!(notes[1].duration, 0.5);
/// ```
pub fn parse(text: &str) -> Result<Vec<Note>, SyntaxError> {
    let mut notes = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let note = parse_line(line).ok_or_else(|| SyntaxError {
            line: index + 1,
            text: line.to_string(),
        })?;
        notes.push(note);
    }

    debug!(count = notes.len(), "parsed note text");
    Ok(notes)
}

/// Parse one non-blank line, `None` when it does not match the grammar.
fn parse_line(line: &str) -> Option<Note> {
    let (tone_part, number_part) = line.split_once(':')?;

    let spelling = tone_part.trim_end_matches(' ');
    let tone: Tone = spelling.parse().ok()?;
    let duration = parse_seconds(number_part.trim_start_matches(' '))?;

    Some(Note {
        tone,
        spelling: spelling.to_string(),
        duration,
    })
}

/// `\d*\.?\d*`, with an empty token read as zero.
///
/// A lone `.` and values too large to represent are refused.
fn parse_seconds(token: &str) -> Option<f64> {
    let (whole, fraction) = match token.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (token, None),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return None;
    }

    match (whole.is_empty(), fraction) {
        (true, None) => Some(0.0),
        (true, Some("")) => None,
        _ => token.parse::<f64>().ok().filter(|value| value.is_finite()),
    }
}
