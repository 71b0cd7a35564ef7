pub mod audio;
pub mod config;
pub mod error;
pub mod format;
pub mod parser;
pub mod presets;
pub mod render;
pub mod scheduler;
pub mod speaker;
pub mod synth;
pub mod tone;

pub use audio::{AudioSink, CollectingSink};
pub use config::{Config, FormatConfig};
pub use error::*;
pub use format::{format_notes, format_notes_with};
pub use parser::{parse, Note};
pub use scheduler::{
    plan, schedule_playback, ManualTimer, Playback, ScheduledNote, TaskHandle, Timer, TokioTimer,
};
pub use synth::{synthesize, Synthesizer, ToneBuffer};
pub use tone::Tone;

/// Convert note text to firmware statements.
/// This is the main entry point for the "convert" action.
pub fn convert(text: &str) -> Result<String, SyntaxError> {
    let notes = parse(text)?;
    Ok(format_notes(&notes))
}

/// Convert with a custom statement shape.
pub fn convert_with(text: &str, config: &FormatConfig) -> Result<String, SyntaxError> {
    let notes = parse(text)?;
    Ok(format_notes_with(&notes, config))
}

/// Parse note text and place every sounding note on the timeline.
pub fn playback_plan(text: &str) -> Result<Vec<ScheduledNote>, SyntaxError> {
    let notes = parse(text)?;
    Ok(plan(&notes))
}
