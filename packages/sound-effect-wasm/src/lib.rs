use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct ParseFailure {
    message: String,
    line: usize,
    text: String,
}

fn syntax_error_to_js(e: sound_effect::SyntaxError) -> JsValue {
    let failure = ParseFailure {
        message: e.to_string(),
        line: e.line,
        text: e.text,
    };
    match serde_json::to_string(&failure) {
        Ok(json) => JsValue::from_str(&json),
        Err(_) => JsValue::from_str(&failure.message),
    }
}

fn unknown_tone(tone: &str) -> JsValue {
    JsValue::from_str(&format!("Unknown tone: {}", tone))
}

/// Convert note text to `speaker::enqueue_note` statements
#[wasm_bindgen]
pub fn convert(text: &str) -> Result<String, JsValue> {
    sound_effect::convert(text).map_err(syntax_error_to_js)
}

/// Parse note text into an array of `{ tone, spelling, duration }`
#[wasm_bindgen]
pub fn parse_notes(text: &str) -> Result<JsValue, JsValue> {
    let notes = sound_effect::parse(text).map_err(syntax_error_to_js)?;
    serde_wasm_bindgen::to_value(&notes).map_err(JsValue::from)
}

/// Square-wave samples for one tone, to be played at `tone_sample_rate(tone)`.
/// A rest yields an empty buffer; a note too long to hold in memory is an error.
#[wasm_bindgen]
pub fn synthesize(tone: &str, duration: f64) -> Result<Vec<f32>, JsValue> {
    let tone: sound_effect::Tone = tone.parse().map_err(|_| unknown_tone(tone))?;
    let buffer = sound_effect::Synthesizer::default()
        .try_synthesize(tone, duration)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(buffer.map(|buffer| buffer.samples).unwrap_or_default())
}

/// Sample rate for a tone's buffer (100 samples per cycle), 0 for a rest
#[wasm_bindgen]
pub fn tone_sample_rate(tone: &str) -> Result<f64, JsValue> {
    let tone: sound_effect::Tone = tone.parse().map_err(|_| unknown_tone(tone))?;
    Ok(sound_effect::Synthesizer::default()
        .sample_rate(tone)
        .unwrap_or(0.0))
}

/// Timeline for playback as JSON: `[{ offset, tone, duration }]`, seconds.
/// The page submits one timer per entry and plays `synthesize(tone, duration)`.
#[wasm_bindgen]
pub fn playback_plan(text: &str) -> Result<String, JsValue> {
    let plan = sound_effect::playback_plan(text).map_err(syntax_error_to_js)?;
    serde_json::to_string(&plan).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Names of the built-in sound effects
#[wasm_bindgen]
pub fn preset_names() -> Vec<String> {
    sound_effect::presets::NAMES.iter().map(|s| s.to_string()).collect()
}

/// Note text of a built-in sound effect
#[wasm_bindgen]
pub fn preset(name: &str) -> Result<String, JsValue> {
    sound_effect::presets::preset(name)
        .map(str::to_string)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
