//! # Error Types
//!
//! Parsing is all-or-nothing and has exactly one failure mode: [`SyntaxError`],
//! raised on the first non-blank line that does not match `<tone> : <number>`.
//! It carries the offending line verbatim so the caller can show it unchanged.
//!
//! [`SoundError`] wraps it for the outer surfaces (CLI, rendering, audio output)
//! together with the I/O, WAV and configuration failures those layers can hit.
//!
//! ## Usage
//! ```rust
//! use sound_effect::{parse, SyntaxError};
//!
//! match parse("C: 1\nQ: 2\n") {
//!     Ok(notes) => println!("{} notes", notes.len()),
//!     Err(SyntaxError { line, text }) => eprintln!("line {}: {}", line, text),
//! }
//! ```

use thiserror::Error;

/// A non-blank line that does not match the note grammar.
///
/// # Example
/// ```
/// # use sound_effect::SyntaxError;
/// let err = SyntaxError { line: 3, text: "Q: 1".to_string() };
/// assert_eq!(err.to_string(), "Syntax error: Q: 1");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Syntax error: {text}")]
pub struct SyntaxError {
    /// 1-based line number in the input text
    pub line: usize,
    /// The line exactly as written
    pub text: String,
}

#[derive(Error, Debug)]
pub enum SoundError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Audio output error: {0}")]
    Audio(String),

    #[error("Too long: {samples} samples exceeds the limit of {limit}")]
    TooLong { samples: f64, limit: usize },

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
