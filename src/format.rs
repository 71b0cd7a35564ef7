//! # Firmware Code Generation
//!
//! Turns a note sequence into statements for the device's speaker driver:
//!
//! ```text
//! speaker::enqueue_note(Tone::C, 1e6);
//! speaker::enqueue_note(Tone::None, 0.5e6);
//! ```
//!
//! The duration is written as parsed with an `e6` suffix, which makes the
//! firmware receive microseconds. The tone is written with the spelling used in
//! the input. This text is consumed by the firmware build, so its exact form
//! must not drift.

use crate::config::FormatConfig;
use crate::parser::Note;

/// Format notes with the default `speaker::enqueue_note(Tone::X, Ne6);` shape.
pub fn format_notes(notes: &[Note]) -> String {
    format_notes_with(notes, &FormatConfig::default())
}

pub fn format_notes_with(notes: &[Note], config: &FormatConfig) -> String {
    let mut out = String::new();
    for note in notes {
        out.push_str(&format!(
            "{}({}::{}, {}{});\n",
            config.function, config.tone_path, note.spelling, note.duration, config.suffix
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tone::Tone;

    #[test]
    fn test_format_exact_output() {
        let notes = vec![Note::new(Tone::C, 1.0), Note::new(Tone::None, 0.5)];
        assert_eq!(
            format_notes(&notes),
            "speaker::enqueue_note(Tone::C, 1e6);\nspeaker::enqueue_note(Tone::None, 0.5e6);\n"
        );
    }

    #[test]
    fn test_spelling_kept_verbatim() {
        let notes = parse("cs: 2\nNONE: .25\n").unwrap();
        assert_eq!(
            format_notes(&notes),
            "speaker::enqueue_note(Tone::cs, 2e6);\nspeaker::enqueue_note(Tone::NONE, 0.25e6);\n"
        );
    }

    #[test]
    fn test_number_normalized_like_parsed_value() {
        let notes = parse("G: 2.\nA: 0010\nB: 0.100\nC:\n").unwrap();
        let out = format_notes(&notes);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "speaker::enqueue_note(Tone::G, 2e6);");
        assert_eq!(lines[1], "speaker::enqueue_note(Tone::A, 10e6);");
        assert_eq!(lines[2], "speaker::enqueue_note(Tone::B, 0.1e6);");
        assert_eq!(lines[3], "speaker::enqueue_note(Tone::C, 0e6);");
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(format_notes(&[]), "");
    }

    #[test]
    fn test_custom_shape() {
        let config = FormatConfig {
            function: "buzzer.play".to_string(),
            tone_path: "Note".to_string(),
            suffix: "e3".to_string(),
        };
        let notes = vec![Note::new(Tone::Ds, 0.125)];
        assert_eq!(
            format_notes_with(&notes, &config),
            "buzzer.play(Note::Ds, 0.125e3);\n"
        );
    }
}
