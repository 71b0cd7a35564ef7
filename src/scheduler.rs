//! # Playback Scheduling
//!
//! Notes are played by submitting one deferred task per sounding note to a
//! [`Timer`]. The delay of each task is the running sum of the durations of all
//! notes before it, rests included:
//!
//! ```text
//! C:1      -> task at 0s
//! None:2   -> no task, offset 1s -> 3s
//! D:1      -> task at 3s
//! ```
//!
//! Tasks are fire-and-forget. Each one owns its tone and duration, synthesizes
//! when it fires and hands the buffer to the [`AudioSink`]. Every submission
//! returns a [`TaskHandle`] whose cancellation token stops the task if it has
//! not fired yet.
//!
//! Two timers are provided:
//! - [`TokioTimer`] sleeps on a tokio runtime (real playback).
//! - [`ManualTimer`] is a virtual clock advanced by hand (tests, dry runs).

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::audio::AudioSink;
use crate::parser::Note;
use crate::synth::Synthesizer;
use crate::tone::Tone;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to one submitted task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: CancellationToken,
    delay: Duration,
}

impl TaskHandle {
    fn new(delay: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            delay,
        }
    }

    /// Prevent the task from running. No effect once it has fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Delay the task was submitted with.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Something that runs a task once a fixed delay has elapsed.
pub trait Timer {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Timer backed by `tokio::time::sleep` on a runtime handle.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: tokio::runtime::Handle,
}

impl TokioTimer {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new(delay);
        let token = handle.token.clone();

        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => trace!(?delay, "task cancelled"),
                _ = tokio::time::sleep(delay) => task(),
            }
        });

        handle
    }
}

struct PendingTask {
    due: Duration,
    seq: u64,
    token: CancellationToken,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTask>,
}

/// Timer driven by an explicit virtual clock.
///
/// Nothing runs until [`ManualTimer::advance`] moves the clock past a task's
/// due time. Due tasks fire in due-time order, ties in submission order.
#[derive(Default)]
pub struct ManualTimer {
    state: Mutex<ManualState>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    // Tasks never run under the lock, so a poisoned state is still whole.
    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Tasks submitted and neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.state()
            .pending
            .iter()
            .filter(|p| !p.token.is_cancelled())
            .count()
    }

    /// Move the clock forward and run every task that became due.
    ///
    /// Returns the number of tasks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        self.run_until(target)
    }

    /// Run every pending task, moving the clock to the last due time.
    pub fn run_all(&self) -> usize {
        let last_due = self.state().pending.iter().map(|p| p.due).max();
        match last_due {
            Some(due) => self.run_until(due.max(self.now())),
            None => 0,
        }
    }

    fn run_until(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            // Pop outside the lock so tasks may submit more work.
            let next = {
                let mut state = self.state();
                let index = state
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                match index {
                    Some(i) => {
                        let task = state.pending.remove(i);
                        state.now = state.now.max(task.due);
                        Some(task)
                    }
                    None => {
                        state.now = state.now.max(target);
                        None
                    }
                }
            };

            match next {
                Some(pending) if pending.token.is_cancelled() => {}
                Some(pending) => {
                    (pending.task)();
                    fired += 1;
                }
                None => return fired,
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new(delay);
        let mut state = self.state();
        let due = state.now.saturating_add(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(PendingTask {
            due,
            seq,
            token: handle.token.clone(),
            task,
        });
        handle
    }
}

/// One sounding note placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNote {
    /// Seconds from the start of the sequence
    pub offset: f64,
    pub tone: Tone,
    /// Seconds
    pub duration: f64,
}

/// Place every sounding note at the accumulated length of the notes before it.
///
/// Rests produce no entry but still push later notes back.
pub fn plan(notes: &[Note]) -> Vec<ScheduledNote> {
    let mut offset = 0.0;
    let mut scheduled = Vec::new();

    for note in notes {
        if !note.is_rest() {
            scheduled.push(ScheduledNote {
                offset,
                tone: note.tone,
                duration: note.duration,
            });
        }
        offset += note.duration;
    }

    scheduled
}

/// Total length of the sequence in seconds.
pub fn total_length(notes: &[Note]) -> f64 {
    notes.iter().map(|n| n.duration).sum()
}

/// Seconds to a timer delay, saturating instead of panicking on huge values.
pub fn seconds_to_delay(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Tasks submitted for one sequence.
#[derive(Debug, Clone)]
pub struct Playback {
    handles: Vec<TaskHandle>,
    length: Duration,
}

impl Playback {
    pub fn handles(&self) -> &[TaskHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Time from the first task until the last note ends.
    pub fn length(&self) -> Duration {
        self.length
    }

    /// Cancel every task that has not fired yet.
    pub fn cancel(&self) {
        for handle in &self.handles {
            handle.cancel();
        }
    }
}

/// Schedule the sequence with the default square wave.
pub fn schedule_playback<T: Timer + ?Sized>(
    notes: &[Note],
    timer: &T,
    sink: Arc<dyn AudioSink>,
) -> Playback {
    schedule_playback_with(notes, timer, &Synthesizer::default(), sink)
}

pub fn schedule_playback_with<T: Timer + ?Sized>(
    notes: &[Note],
    timer: &T,
    synth: &Synthesizer,
    sink: Arc<dyn AudioSink>,
) -> Playback {
    let mut handles = Vec::new();

    for entry in plan(notes) {
        let delay = seconds_to_delay(entry.offset);
        debug!(tone = %entry.tone, offset = entry.offset, duration = entry.duration, "scheduling note");

        let synth = synth.clone();
        let sink = sink.clone();
        let ScheduledNote { tone, duration, .. } = entry;
        let handle = timer.schedule(
            delay,
            Box::new(move || {
                trace!(%tone, duration, "playing note");
                if let Some(buffer) = synth.synthesize(tone, duration) {
                    sink.play(buffer);
                }
            }),
        );
        handles.push(handle);
    }

    Playback {
        handles,
        length: seconds_to_delay(total_length(notes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CollectingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seq(notes: &[(Tone, f64)]) -> Vec<Note> {
        notes.iter().map(|&(t, d)| Note::new(t, d)).collect()
    }

    #[test]
    fn test_plan_accumulates_rests() {
        let notes = seq(&[(Tone::C, 1.0), (Tone::None, 2.0), (Tone::D, 1.0)]);
        let planned = plan(&notes);
        assert_eq!(
            planned,
            vec![
                ScheduledNote { offset: 0.0, tone: Tone::C, duration: 1.0 },
                ScheduledNote { offset: 3.0, tone: Tone::D, duration: 1.0 },
            ]
        );
        assert_eq!(total_length(&notes), 4.0);
    }

    #[test]
    fn test_plan_all_rests() {
        let notes = seq(&[(Tone::None, 1.0), (Tone::None, 0.5)]);
        assert!(plan(&notes).is_empty());
        assert_eq!(total_length(&notes), 1.5);
    }

    #[test]
    fn test_seconds_to_delay() {
        assert_eq!(seconds_to_delay(1.5), Duration::from_millis(1500));
        assert_eq!(seconds_to_delay(0.0), Duration::ZERO);
        assert_eq!(seconds_to_delay(f64::NAN), Duration::ZERO);
        assert_eq!(seconds_to_delay(1e300), Duration::MAX);
    }

    #[test]
    fn test_manual_timer_orders_by_due_then_submission() {
        let timer = ManualTimer::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, ms) in [("b", 20), ("a", 10), ("c", 20)] {
            let log = log.clone();
            timer.schedule(
                Duration::from_millis(ms),
                Box::new(move || log.lock().unwrap().push(name)),
            );
        }
        assert_eq!(timer.pending(), 3);
        assert_eq!(timer.advance(Duration::from_millis(15)), 1);
        assert_eq!(timer.now(), Duration::from_millis(15));
        assert_eq!(timer.advance(Duration::from_millis(5)), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_manual_timer_cancel() {
        let timer = ManualTimer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = timer.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.run_all(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_timer_usable_after_poison() {
        let timer = Arc::new(ManualTimer::new());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        timer.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let shared = timer.clone();
        let _ = std::thread::spawn(move || {
            let _state = shared.state.lock().unwrap();
            panic!("holder died");
        })
        .join();
        assert!(timer.state.is_poisoned());

        assert_eq!(timer.pending(), 1);
        assert_eq!(timer.advance(Duration::from_secs(1)), 1);
        assert_eq!(timer.now(), Duration::from_secs(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_schedule_playback_two_tasks() {
        let notes = seq(&[(Tone::C, 1.0), (Tone::None, 2.0), (Tone::D, 1.0)]);
        let timer = ManualTimer::new();
        let sink = CollectingSink::new();

        let playback = schedule_playback(&notes, &timer, Arc::new(sink.clone()));
        assert_eq!(playback.len(), 2);
        assert_eq!(playback.handles()[0].delay(), Duration::ZERO);
        assert_eq!(playback.handles()[1].delay(), Duration::from_secs(3));
        assert_eq!(playback.length(), Duration::from_secs(4));

        assert_eq!(timer.advance(Duration::ZERO), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(timer.advance(Duration::from_millis(2999)), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);

        let buffers = sink.buffers();
        assert_eq!(buffers[0].sample_rate, Tone::C.frequency().unwrap() * 100.0);
        assert_eq!(buffers[1].sample_rate, Tone::D.frequency().unwrap() * 100.0);
    }

    #[test]
    fn test_playback_cancel_stops_remaining() {
        let notes = seq(&[(Tone::E, 0.5), (Tone::F, 0.5), (Tone::G, 0.5)]);
        let timer = ManualTimer::new();
        let sink = CollectingSink::new();

        let playback = schedule_playback(&notes, &timer, Arc::new(sink.clone()));
        timer.advance(Duration::from_millis(600));
        assert_eq!(sink.len(), 2);

        playback.cancel();
        assert_eq!(timer.run_all(), 0);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let timer = TokioTimer::current();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        timer.schedule(
            Duration::from_secs(2),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancel() {
        let timer = TokioTimer::current();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = timer.schedule(
            Duration::from_secs(1),
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_playback_reaches_sink() {
        let notes = seq(&[(Tone::A, 0.25), (Tone::None, 0.25), (Tone::B, 0.25)]);
        let sink = CollectingSink::new();
        let playback = schedule_playback(&notes, &TokioTimer::current(), Arc::new(sink.clone()));

        tokio::time::sleep(playback.length()).await;
        let buffers = sink.buffers();
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[1].sample_rate, Tone::B.frequency().unwrap() * 100.0);
    }
}
