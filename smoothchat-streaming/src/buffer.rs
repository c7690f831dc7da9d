//! Smooth reveal buffer.
//!
//! [`SmoothBuffer`] decouples the rate at which content arrives from the rate
//! at which it is shown. Callers set a *target* string as content arrives;
//! each [`tick`](SmoothBuffer::tick) grows the *displayed* prefix toward the
//! target by an amount derived from the adaptive speed, the elapsed time and
//! the current generation pattern.
//!
//! The buffer does not own a timer. Whoever drives it calls `tick` at the
//! display cadence (see [`FrameTicker`](crate::ticker::FrameTicker)); tests
//! call it by hand with a [`ManualClock`](crate::clock::ManualClock).

use crate::clock::{Clock, SystemClock};
use crate::config::SharedStreamConfig;
use crate::pattern::{GenerationPattern, PatternDetector};
use crate::speed::{byte_offset, speed_with_rng};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Receives displayed-content updates.
pub trait RevealSink: Send + Sync {
    /// Called with the full displayed text and the part added since the last call.
    fn on_reveal(&self, displayed: &str, delta: &str);
}

impl<F> RevealSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_reveal(&self, displayed: &str, delta: &str) {
        self(displayed, delta)
    }
}

/// Lifecycle state of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    /// Nothing added yet.
    Idle,
    /// Accepting content; may or may not be animating.
    Streaming,
    /// Finished; displayed equals target.
    Completed,
    /// Halted and cleared.
    Stopped,
}

/// Point-in-time view of the buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferSnapshot {
    /// Latest target content.
    pub target: String,
    /// Content currently shown.
    pub displayed: String,
    /// Lifecycle state.
    pub state: BufferState,
    /// Whether the reveal loop is running.
    pub animating: bool,
    /// Current generation pattern.
    pub pattern: GenerationPattern,
}

/// Reveals a target string progressively.
pub struct SmoothBuffer {
    config: SharedStreamConfig,
    sink: Arc<dyn RevealSink>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    detector: PatternDetector,
    target: String,
    target_chars: usize,
    displayed: String,
    displayed_chars: usize,
    state: BufferState,
    running: bool,
    last_tick: Option<Instant>,
}

impl SmoothBuffer {
    /// Create a buffer on the system clock.
    pub fn new(config: SharedStreamConfig, sink: Arc<dyn RevealSink>) -> Self {
        Self {
            config,
            sink,
            clock: Arc::new(SystemClock),
            rng: StdRng::from_entropy(),
            detector: PatternDetector::new(),
            target: String::new(),
            target_chars: 0,
            displayed: String::new(),
            displayed_chars: 0,
            state: BufferState::Idle,
            running: false,
            last_tick: None,
        }
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the prose jitter for reproducible reveals.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Latest target content.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Content currently shown.
    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Lifecycle state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Whether the reveal loop is running.
    pub fn is_animating(&self) -> bool {
        self.running
    }

    /// Whether the buffer has completed.
    pub fn is_completed(&self) -> bool {
        self.state == BufferState::Completed
    }

    /// Current generation pattern.
    pub fn pattern(&self) -> GenerationPattern {
        self.detector.current()
    }

    /// Capture the current state.
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            target: self.target.clone(),
            displayed: self.displayed.clone(),
            state: self.state,
            animating: self.running,
            pattern: self.detector.current(),
        }
    }

    /// Set a new target and animate toward it.
    ///
    /// When animation is disabled the target is shown at once.
    pub fn add_content(&mut self, target: impl Into<String>) {
        self.set_target(target.into());
        self.state = BufferState::Streaming;

        if !self.config.read().enabled {
            self.reveal_all();
            return;
        }

        self.detector.observe(self.clock.now());
        self.start();
    }

    /// Show `content` at once, without animation, and mark completed.
    pub fn add_immediate_content(&mut self, content: impl Into<String>) {
        self.halt();
        self.set_target(content.into());
        self.state = BufferState::Completed;
        self.reveal_all();
    }

    /// Replace the target and restart the reveal from nothing.
    ///
    /// This is a hard reset, not a diff: everything shown so far is dropped.
    pub fn replace_content(&mut self, target: impl Into<String>) {
        self.halt();
        self.target = target.into();
        self.target_chars = self.target.chars().count();
        self.displayed.clear();
        self.displayed_chars = 0;
        self.state = BufferState::Streaming;
        debug!(target_chars = self.target_chars, "Reveal target replaced");

        if !self.config.read().enabled {
            self.reveal_all();
            return;
        }

        self.detector.observe(self.clock.now());
        self.start();
    }

    /// Mark completed, snapping the displayed content to the target.
    pub fn complete(&mut self) {
        self.halt();
        self.state = BufferState::Completed;
        if self.displayed_chars != self.target_chars || self.displayed != self.target {
            self.reveal_all();
        }
    }

    /// Halt and clear everything.
    pub fn stop(&mut self) {
        self.halt();
        self.target.clear();
        self.target_chars = 0;
        self.displayed.clear();
        self.displayed_chars = 0;
        self.detector.reset();
        self.state = BufferState::Stopped;
        debug!("Reveal buffer stopped");
    }

    /// Advance the reveal by one frame.
    ///
    /// Returns whether the loop is still running. A halted loop stays halted
    /// until new content arrives.
    pub fn tick(&mut self) -> bool {
        if !self.running || matches!(self.state, BufferState::Completed | BufferState::Stopped) {
            self.running = false;
            return false;
        }

        let shared = Arc::clone(&self.config);
        let config = shared.read();
        if !config.enabled {
            drop(config);
            self.reveal_all();
            self.running = false;
            return false;
        }

        let now = self.clock.now();
        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);

        // The frame interval caps how much time one tick may account for.
        let dt = elapsed.min(config.frame_interval()).as_secs_f64();
        let speed = speed_with_rng(&self.target, self.displayed_chars, &config, &mut self.rng);
        drop(config);

        // Epsilon absorbs float error so 100 chars/s over 30ms is 3, not 2.
        let base = ((speed * dt + 1e-9).floor() as usize).max(1);
        let pattern = self.detector.current();
        let chars = ((base as f64 * pattern.multiplier()).floor() as usize).max(1);

        let next = (self.displayed_chars + chars).min(self.target_chars);
        let start = byte_offset(&self.target, self.displayed_chars);
        let end = byte_offset(&self.target, next);
        self.displayed_chars = next;
        self.displayed = self.target[..end].to_string();
        trace!(chars, ?pattern, displayed = next, target = self.target_chars, "Reveal tick");
        self.sink.on_reveal(&self.displayed, &self.target[start..end]);

        if next == self.target_chars {
            self.running = false;
        }
        self.running
    }

    fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_tick = Some(self.clock.now());
        }
    }

    fn halt(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    fn set_target(&mut self, target: String) {
        self.target = target;
        self.target_chars = self.target.chars().count();
        self.displayed_chars = self.displayed_chars.min(self.target_chars);
        let end = byte_offset(&self.target, self.displayed_chars);
        self.displayed = self.target[..end].to_string();
    }

    fn reveal_all(&mut self) {
        let start = if self.target.starts_with(&self.displayed) {
            self.displayed.len()
        } else {
            0
        };
        self.displayed = self.target.clone();
        self.displayed_chars = self.target_chars;
        self.sink.on_reveal(&self.displayed, &self.target[start..]);
    }
}

impl fmt::Debug for SmoothBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmoothBuffer")
            .field("target_chars", &self.target_chars)
            .field("displayed_chars", &self.displayed_chars)
            .field("state", &self.state)
            .field("running", &self.running)
            .field("pattern", &self.detector.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{SmoothStreamConfig, SmoothStreamConfigPatch};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<(String, String)>>,
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.updates.lock().len()
        }

        fn last(&self) -> Option<(String, String)> {
            self.updates.lock().last().cloned()
        }
    }

    impl RevealSink for Recorder {
        fn on_reveal(&self, displayed: &str, delta: &str) {
            self.updates
                .lock()
                .push((displayed.to_string(), delta.to_string()));
        }
    }

    struct Harness {
        buffer: SmoothBuffer,
        clock: Arc<ManualClock>,
        sink: Arc<Recorder>,
        config: SharedStreamConfig,
    }

    fn harness(config: SmoothStreamConfig) -> Harness {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(Recorder::default());
        let config = config.into_shared();
        let buffer = SmoothBuffer::new(config.clone(), sink.clone())
            .with_clock(clock.clone())
            .with_seed(3);
        Harness {
            buffer,
            clock,
            sink,
            config,
        }
    }

    fn linear(base_speed: f64) -> SmoothStreamConfig {
        SmoothStreamConfig::new()
            .base_speed(base_speed)
            .adaptive_speed(false)
    }

    fn step(h: &mut Harness, ms: u64) -> bool {
        h.clock.advance(Duration::from_millis(ms));
        h.buffer.tick()
    }

    #[test]
    fn test_disabled_shows_immediately() {
        let mut h = harness(SmoothStreamConfig::new().enabled(false));
        h.buffer.add_content("Hello");
        assert_eq!(h.buffer.displayed(), "Hello");
        assert!(!h.buffer.is_animating());
        assert_eq!(h.sink.last(), Some(("Hello".into(), "Hello".into())));

        h.buffer.add_content("Hello world");
        assert_eq!(h.sink.last(), Some(("Hello world".into(), " world".into())));
    }

    #[test]
    fn test_tick_reveals_by_speed() {
        let mut h = harness(linear(100.0));
        h.buffer.add_content("abcdefghijklmnopqrstuvwxyz");
        assert!(h.buffer.is_animating());
        assert_eq!(h.buffer.displayed(), "");

        // 100 chars/s for 30ms
        step(&mut h, 30);
        assert_eq!(h.buffer.displayed(), "abc");
        assert_eq!(h.sink.last(), Some(("abc".into(), "abc".into())));

        step(&mut h, 20);
        assert_eq!(h.buffer.displayed(), "abcde");
        assert_eq!(h.sink.last(), Some(("abcde".into(), "de".into())));
    }

    #[test]
    fn test_at_least_one_char_per_tick() {
        let mut h = harness(linear(1.0));
        h.buffer.add_content("xyz");
        step(&mut h, 0);
        assert_eq!(h.buffer.displayed(), "x");
        step(&mut h, 1);
        assert_eq!(h.buffer.displayed(), "xy");
    }

    #[test]
    fn test_frame_interval_caps_elapsed_time() {
        // Medium smoothness: at most 50ms of content per tick.
        let mut h = harness(linear(100.0));
        h.buffer.add_content("a".repeat(100));
        step(&mut h, 1_000);
        assert_eq!(h.buffer.displayed().len(), 5);
    }

    #[test]
    fn test_monotonic_under_append() {
        let mut h = harness(SmoothStreamConfig::new().base_speed(200.0));
        let mut target = String::new();
        let mut previous = 0;
        for chunk in ["Hello", ", world", "! This is ", "`code` and **bold**", " text."] {
            target.push_str(chunk);
            h.buffer.add_content(target.clone());
            for _ in 0..3 {
                step(&mut h, 16);
                let shown = h.buffer.displayed().chars().count();
                assert!(shown >= previous);
                assert!(shown <= h.buffer.target().chars().count());
                assert!(target.starts_with(h.buffer.displayed()));
                previous = shown;
            }
        }
        while step(&mut h, 16) {}
        assert_eq!(h.buffer.displayed(), target);
    }

    #[test]
    fn test_loop_halts_when_caught_up_and_resumes() {
        let mut h = harness(linear(1_000.0));
        h.buffer.add_content("hi");
        assert!(!step(&mut h, 50));
        assert_eq!(h.buffer.displayed(), "hi");
        assert!(!h.buffer.is_animating());
        assert_eq!(h.buffer.state(), BufferState::Streaming);

        let before = h.sink.count();
        assert!(!h.buffer.tick());
        assert_eq!(h.sink.count(), before);

        h.buffer.add_content("hi there");
        assert!(h.buffer.is_animating());
        step(&mut h, 50);
        assert_eq!(h.buffer.displayed(), "hi there");
    }

    #[test]
    fn test_replace_is_hard_reset() {
        let mut h = harness(linear(1_000.0));
        h.buffer.add_content("hello world");
        step(&mut h, 50);
        assert_eq!(h.buffer.displayed(), "hello world");

        h.buffer.replace_content("fresh");
        assert_eq!(h.buffer.displayed(), "");
        assert_eq!(h.buffer.target(), "fresh");
        assert!(h.buffer.is_animating());

        step(&mut h, 50);
        assert_eq!(h.buffer.displayed(), "fresh");
        assert_eq!(h.sink.last(), Some(("fresh".into(), "fresh".into())));
    }

    #[test]
    fn test_replace_when_disabled_shows_target() {
        let mut h = harness(SmoothStreamConfig::new().enabled(false));
        h.buffer.add_content("old");
        h.buffer.replace_content("new");
        assert_eq!(h.buffer.displayed(), "new");
    }

    #[test]
    fn test_complete_snaps_once() {
        let mut h = harness(linear(10.0));
        h.buffer.add_content("a long answer");
        step(&mut h, 16);
        let before = h.sink.count();

        h.buffer.complete();
        assert_eq!(h.buffer.displayed(), "a long answer");
        assert!(h.buffer.is_completed());
        assert!(!h.buffer.is_animating());
        assert_eq!(h.sink.count(), before + 1);

        h.buffer.complete();
        assert_eq!(h.sink.count(), before + 1);
        assert!(!step(&mut h, 16));
    }

    #[test]
    fn test_immediate_content() {
        let mut h = harness(linear(10.0));
        h.buffer.add_content("typing");
        h.buffer.add_immediate_content("typing\n\n🔧 banner");
        assert_eq!(h.buffer.displayed(), "typing\n\n🔧 banner");
        assert!(h.buffer.is_completed());
        assert!(!h.buffer.is_animating());
        assert_eq!(h.sink.count(), 1);

        // Later content resumes animation.
        h.buffer.add_content("typing\n\n🔧 banner\n\nmore");
        assert!(h.buffer.is_animating());
        assert_eq!(h.buffer.state(), BufferState::Streaming);
    }

    #[test]
    fn test_stop_clears_and_silences() {
        let mut h = harness(linear(10.0));
        h.buffer.add_content("partial");
        step(&mut h, 16);
        let before = h.sink.count();

        h.buffer.stop();
        assert_eq!(h.buffer.target(), "");
        assert_eq!(h.buffer.displayed(), "");
        assert_eq!(h.buffer.state(), BufferState::Stopped);
        assert!(!step(&mut h, 16));
        assert_eq!(h.sink.count(), before);
    }

    #[test]
    fn test_burst_pattern_slows_reveal() {
        let mut h = harness(linear(100.0));
        let mut text = String::new();
        for _ in 0..3 {
            text.push_str("abcdefghij");
            h.buffer.add_content(text.clone());
            h.clock.advance(Duration::from_millis(10));
        }
        assert_eq!(h.buffer.pattern(), GenerationPattern::Burst);

        // 30ms elapsed since the loop started: floor(100 * 0.03) = 3, burst -> floor(2.1) = 2
        h.buffer.tick();
        assert_eq!(h.buffer.displayed(), "ab");
    }

    #[test]
    fn test_slow_pattern_speeds_reveal() {
        let mut h = harness(linear(100.0));
        let mut text = String::new();
        for _ in 0..3 {
            text.push_str("abcdefghij");
            h.buffer.add_content(text.clone());
            h.clock.advance(Duration::from_millis(300));
            h.buffer.tick();
        }
        assert_eq!(h.buffer.pattern(), GenerationPattern::Slow);
        let shown = h.buffer.displayed().chars().count();

        // 50ms cap: floor(100 * 0.05) = 5, slow -> floor(6.5) = 6
        step(&mut h, 50);
        assert_eq!(h.buffer.displayed().chars().count(), shown + 6);
    }

    #[test]
    fn test_config_change_applies_next_tick() {
        let mut h = harness(linear(100.0));
        h.buffer.add_content("a".repeat(200));
        step(&mut h, 20);
        assert_eq!(h.buffer.displayed().len(), 2);

        h.config
            .write()
            .apply(SmoothStreamConfigPatch::new().base_speed(1_000.0));
        step(&mut h, 20);
        assert_eq!(h.buffer.displayed().len(), 22);

        h.config.write().apply(SmoothStreamConfigPatch::new().enabled(false));
        assert!(!h.buffer.tick());
        assert_eq!(h.buffer.displayed().len(), 200);
    }

    #[test]
    fn test_rewrite_in_place_reslices_prefix() {
        let mut h = harness(linear(1_000.0));
        h.buffer.add_content("⏳ running");
        step(&mut h, 50);
        h.buffer.add_content("✅ done");
        assert_eq!(h.buffer.displayed(), "✅ done");
        assert!(h.buffer.displayed().chars().count() <= h.buffer.target().chars().count());
    }

    #[test]
    fn test_snapshot() {
        let mut h = harness(linear(100.0));
        h.buffer.add_content("abc");
        let snapshot = h.buffer.snapshot();
        assert_eq!(snapshot.target, "abc");
        assert_eq!(snapshot.displayed, "");
        assert_eq!(snapshot.state, BufferState::Streaming);
        assert!(snapshot.animating);
        assert_eq!(snapshot.pattern, GenerationPattern::Steady);
    }
}
