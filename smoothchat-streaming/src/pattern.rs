//! Classification of chunk arrival cadence.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of arrival timestamps retained.
pub const MAX_SAMPLES: usize = 10;

/// Samples needed before the pattern is re-evaluated.
pub const MIN_SAMPLES: usize = 3;

const BURST_BELOW: Duration = Duration::from_millis(50);
const SLOW_ABOVE: Duration = Duration::from_millis(200);

/// Coarse classification of how content is arriving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPattern {
    /// Chunks arrive faster than every 50ms on average.
    Burst,
    /// Between the two thresholds.
    #[default]
    Steady,
    /// Chunks arrive slower than every 200ms on average.
    Slow,
}

impl GenerationPattern {
    /// Multiplier applied to the per-tick reveal amount.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Burst => 0.7,
            Self::Steady => 1.0,
            Self::Slow => 1.3,
        }
    }
}

/// Tracks recent arrival timestamps and classifies the cadence.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    timestamps: VecDeque<Instant>,
    pattern: GenerationPattern,
}

impl PatternDetector {
    /// Create a detector in the `Steady` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival.
    pub fn observe(&mut self, at: Instant) {
        self.timestamps.push_back(at);
        while self.timestamps.len() > MAX_SAMPLES {
            self.timestamps.pop_front();
        }

        if self.timestamps.len() < MIN_SAMPLES {
            return;
        }

        let intervals: Vec<Duration> = self
            .timestamps
            .iter()
            .zip(self.timestamps.iter().skip(1))
            .map(|(prev, next)| next.saturating_duration_since(*prev))
            .collect();
        let total: Duration = intervals.iter().sum();
        let mean = total / intervals.len() as u32;

        self.pattern = if mean < BURST_BELOW {
            GenerationPattern::Burst
        } else if mean > SLOW_ABOVE {
            GenerationPattern::Slow
        } else {
            GenerationPattern::Steady
        };
    }

    /// The current classification.
    #[must_use]
    pub fn current(&self) -> GenerationPattern {
        self.pattern
    }

    /// Number of retained samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Forget all samples and return to `Steady`.
    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.pattern = GenerationPattern::Steady;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn feed(detector: &mut PatternDetector, gaps_ms: &[u64]) {
        let mut at = Instant::now();
        detector.observe(at);
        for gap in gaps_ms {
            at += Duration::from_millis(*gap);
            detector.observe(at);
        }
    }

    #[test]
    fn test_default_is_steady() {
        assert_eq!(PatternDetector::new().current(), GenerationPattern::Steady);
    }

    #[test]
    fn test_needs_three_samples() {
        let mut detector = PatternDetector::new();
        feed(&mut detector, &[5]);
        assert_eq!(detector.sample_count(), 2);
        assert_eq!(detector.current(), GenerationPattern::Steady);
    }

    #[rstest]
    #[case(&[10, 20], GenerationPattern::Burst)]
    #[case(&[100, 100], GenerationPattern::Steady)]
    #[case(&[50, 50], GenerationPattern::Steady)]
    #[case(&[200, 200], GenerationPattern::Steady)]
    #[case(&[300, 250], GenerationPattern::Slow)]
    fn test_classification(#[case] gaps: &[u64], #[case] expected: GenerationPattern) {
        let mut detector = PatternDetector::new();
        feed(&mut detector, gaps);
        assert_eq!(detector.current(), expected);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut detector = PatternDetector::new();
        // Old slow samples roll out of the window.
        feed(&mut detector, &[500, 500, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5]);
        assert_eq!(detector.sample_count(), MAX_SAMPLES);
        assert_eq!(detector.current(), GenerationPattern::Burst);
    }

    #[test]
    fn test_reset() {
        let mut detector = PatternDetector::new();
        feed(&mut detector, &[1, 1, 1]);
        assert_eq!(detector.current(), GenerationPattern::Burst);
        detector.reset();
        assert_eq!(detector.sample_count(), 0);
        assert_eq!(detector.current(), GenerationPattern::Steady);
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(GenerationPattern::Burst.multiplier(), 0.7);
        assert_eq!(GenerationPattern::Steady.multiplier(), 1.0);
        assert_eq!(GenerationPattern::Slow.multiplier(), 1.3);
    }
}
