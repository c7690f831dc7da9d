//! Reveal configuration.

use crate::error::{StreamError, StreamResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smoothchat_core::EventKind;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared between a client and its live reveal buffer.
///
/// Writers update it in place; the buffer re-reads it on every tick.
pub type SharedStreamConfig = Arc<RwLock<SmoothStreamConfig>>;

/// How finely the reveal is sliced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothness {
    /// 100ms of content per tick at most.
    Low,
    /// 50ms of content per tick at most.
    #[default]
    Medium,
    /// 16ms of content per tick at most.
    High,
}

impl Smoothness {
    /// The frame interval this smoothness maps to.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        match self {
            Self::Low => Duration::from_millis(100),
            Self::Medium => Duration::from_millis(50),
            Self::High => Duration::from_millis(16),
        }
    }
}

/// Configuration for smooth reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothStreamConfig {
    /// Whether to animate at all. When false every update is shown at once.
    pub enabled: bool,
    /// Base reveal speed in characters per second.
    pub base_speed: f64,
    /// Whether to adapt the speed to the upcoming content.
    pub adaptive_speed: bool,
    /// Reveal granularity.
    pub smoothness: Smoothness,
    /// Event kinds that bypass animation entirely.
    pub instant_messages: BTreeSet<EventKind>,
}

impl Default for SmoothStreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_speed: 60.0,
            adaptive_speed: true,
            smoothness: Smoothness::Medium,
            instant_messages: [EventKind::FunctionCall, EventKind::FunctionCallOutput]
                .into_iter()
                .collect(),
        }
    }
}

impl SmoothStreamConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable animation.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the base speed.
    pub fn base_speed(mut self, chars_per_second: f64) -> Self {
        self.base_speed = chars_per_second;
        self
    }

    /// Enable or disable adaptive speed.
    pub fn adaptive_speed(mut self, adaptive: bool) -> Self {
        self.adaptive_speed = adaptive;
        self
    }

    /// Set the smoothness.
    pub fn smoothness(mut self, smoothness: Smoothness) -> Self {
        self.smoothness = smoothness;
        self
    }

    /// Replace the set of instantly displayed event kinds.
    pub fn instant_messages(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.instant_messages = kinds.into_iter().collect();
        self
    }

    /// Check whether events of `kind` skip animation.
    #[must_use]
    pub fn is_instant(&self, kind: EventKind) -> bool {
        self.instant_messages.contains(&kind)
    }

    /// Frame interval derived from the smoothness.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.smoothness.frame_interval()
    }

    /// Validate the config.
    pub fn validate(&self) -> StreamResult<()> {
        if !self.base_speed.is_finite() || self.base_speed <= 0.0 {
            return Err(StreamError::InvalidConfig(format!(
                "base_speed must be a positive number, got {}",
                self.base_speed
            )));
        }
        Ok(())
    }

    /// Parse and validate a config from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> StreamResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge a partial update into this config.
    pub fn apply(&mut self, patch: SmoothStreamConfigPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(speed) = patch.base_speed {
            self.base_speed = speed;
        }
        if let Some(adaptive) = patch.adaptive_speed {
            self.adaptive_speed = adaptive;
        }
        if let Some(smoothness) = patch.smoothness {
            self.smoothness = smoothness;
        }
        if let Some(kinds) = patch.instant_messages {
            self.instant_messages = kinds;
        }
    }

    /// Wrap into a shared handle.
    pub fn into_shared(self) -> SharedStreamConfig {
        Arc::new(RwLock::new(self))
    }
}

/// Partial update for [`SmoothStreamConfig`]. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothStreamConfigPatch {
    /// New `enabled` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New base speed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_speed: Option<f64>,
    /// New adaptive flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive_speed: Option<bool>,
    /// New smoothness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<Smoothness>,
    /// New instant event kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant_messages: Option<BTreeSet<EventKind>>,
}

impl SmoothStreamConfigPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `enabled`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set the base speed.
    pub fn base_speed(mut self, chars_per_second: f64) -> Self {
        self.base_speed = Some(chars_per_second);
        self
    }

    /// Set the adaptive flag.
    pub fn adaptive_speed(mut self, adaptive: bool) -> Self {
        self.adaptive_speed = Some(adaptive);
        self
    }

    /// Set the smoothness.
    pub fn smoothness(mut self, smoothness: Smoothness) -> Self {
        self.smoothness = Some(smoothness);
        self
    }

    /// Set the instant event kinds.
    pub fn instant_messages(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.instant_messages = Some(kinds.into_iter().collect());
        self
    }
}
