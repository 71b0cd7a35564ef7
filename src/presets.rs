//! Built-in sound effects shipped with the device firmware, as note text.

use crate::error::SoundError;

pub const HIT: &str = "\
C: 0.1
E: 0.1
G: 0.1
";

pub const TULIP: &str = "\
C: 0.5
D: 0.5
E: 0.5
None: 0.5
C: 0.5
D: 0.5
E: 0.5
None: 0.5

G: 0.5
E: 0.5
D: 0.5
C: 0.5
D: 0.5
E: 0.5
D: 0.5
None: 0.5

C: 0.5
D: 0.5
E: 0.5
None: 0.5
C: 0.5
D: 0.5
E: 0.5
None: 0.5

G: 0.5
E: 0.5
D: 0.5
C: 0.5
D: 0.5
E: 0.5
C: 0.5
None: 0.5

G: 0.5
None: 0.001
G: 0.5
E: 0.5
G: 0.5
A: 0.5
None: 0.001
A: 0.5
G: 0.5
None: 0.5

E: 0.5
None: 0.001
E: 0.5
D: 0.5
None: 0.001
D: 0.5
Ch: 1.0
";

pub const NAMES: [&str; 2] = ["hit", "tulip"];

/// Look up a preset by name (case-insensitive).
pub fn preset(name: &str) -> Result<&'static str, SoundError> {
    match name.to_ascii_lowercase().as_str() {
        "hit" => Ok(HIT),
        "tulip" => Ok(TULIP),
        _ => Err(SoundError::UnknownPreset(name.to_string())),
    }
}
