//! # Firmware Speaker Emulation
//!
//! Replays generated `speaker::enqueue_note` calls the way the device driver
//! executes them, to hear what the firmware will actually produce.
//!
//! The driver owns a fixed-size ring queue (16 entries) and a periodic timer:
//!
//! - `enqueue_note(tone, length_us)` returns `false` and drops the note when
//!   the queue is full.
//! - A pitched note with period `p` sets the timer to `p / 2` µs and toggles
//!   the pin `2 * length / p` times (integer division). One further tick is
//!   spent popping the next note, so a note lasts `length + p / 2` µs.
//! - A rest sets the timer to `length / 2` µs and pops the next note on the
//!   following tick, so a rest lasts half its nominal length.
//!
//! Those timing quirks are reproduced on purpose.
//!
//! A trace stops at [`MAX_TRACE_US`]; anything queued past that is dropped.

use std::collections::VecDeque;
use tracing::warn;

use crate::error::SoundError;
use crate::parser::Note;
use crate::synth::buffer_len;
use crate::tone::Tone;

/// Longest stretch of driver time a trace covers: ten minutes.
pub const MAX_TRACE_US: u64 = 600_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedNote {
    pub tone: Tone,
    pub length_us: u64,
}

#[derive(Debug, Clone)]
pub struct Speaker {
    queue: VecDeque<QueuedNote>,
    capacity: usize,
}

impl Default for Speaker {
    fn default() -> Self {
        Self::new(16)
    }
}

impl Speaker {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a note, `false` when the queue is full.
    pub fn enqueue_note(&mut self, tone: Tone, length_us: u64) -> bool {
        if self.queue.len() >= self.capacity {
            return false;
        }
        self.queue.push_back(QueuedNote { tone, length_us });
        true
    }

    /// Queue parsed notes as the generated code would, returning how many fit.
    pub fn enqueue_notes(&mut self, notes: &[Note]) -> usize {
        let mut accepted = 0;
        for note in notes {
            // `<n>e6` arrives as a double and is truncated to whole microseconds
            let length_us = (note.duration * 1e6) as u64;
            if self.enqueue_note(note.tone, length_us) {
                accepted += 1;
            }
        }
        if accepted < notes.len() {
            warn!(
                accepted,
                dropped = notes.len() - accepted,
                capacity = self.capacity,
                "speaker queue full, notes dropped"
            );
        }
        accepted
    }

    /// Run the driver until the queue is empty or the trace reaches
    /// [`MAX_TRACE_US`].
    pub fn drain(&mut self) -> SpeakerTrace {
        let mut now = 0u64;
        let mut toggles = Vec::new();

        while let Some(note) = self.queue.pop_front() {
            match note.tone.period_us() {
                None => now = now.saturating_add(note.length_us / 2),
                Some(period) => {
                    let period = period as u64;
                    let interval = period / 2;
                    let count_to = note.length_us.saturating_mul(2) / period;
                    // now <= MAX_TRACE_US at the top of every iteration
                    let recorded = count_to.min((MAX_TRACE_US - now) / interval);
                    for _ in 0..recorded {
                        now += interval;
                        toggles.push(now);
                    }
                    let remaining = (count_to - recorded).saturating_add(1);
                    now = now.saturating_add(interval.saturating_mul(remaining));
                }
            }

            if now > MAX_TRACE_US {
                warn!(
                    limit_us = MAX_TRACE_US,
                    dropped = self.queue.len(),
                    "speaker trace too long, truncated"
                );
                self.queue.clear();
                now = MAX_TRACE_US;
            }
        }

        SpeakerTrace {
            toggles,
            end_us: now,
        }
    }
}

/// Pin toggle times produced by draining the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTrace {
    /// Microseconds from the first note at which the pin flips
    pub toggles: Vec<u64>,
    /// Time at which the driver went idle
    pub end_us: u64,
}

impl SpeakerTrace {
    /// Sample the pin level: low is `-amplitude`, high is `+amplitude`.
    pub fn render(&self, sample_rate: u32, amplitude: f32) -> Result<Vec<f32>, SoundError> {
        let len = (self.end_us as u128 * sample_rate as u128).div_ceil(1_000_000);
        let len = buffer_len(len as f64)?;
        let mut samples = Vec::with_capacity(len);
        let mut next = 0;
        let mut high = false;

        for j in 0..len {
            let t = (j as u128 * 1_000_000 / sample_rate as u128) as u64;
            while next < self.toggles.len() && self.toggles[next] <= t {
                high = !high;
                next += 1;
            }
            samples.push(if high { amplitude } else { -amplitude });
        }

        Ok(samples)
    }
}
