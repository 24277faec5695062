use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::SchedulerConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaptiveConfig {
    /// Seconds of audio per classification
    #[serde(default = "default_analysis_window")]
    pub analysis_window: f32,
    /// Seconds of audio retained by the streaming buffer
    #[serde(default = "default_queue_max_seconds")]
    pub queue_max_seconds: f32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_capture_frame_count")]
    pub capture_frame_count: usize,
    #[serde(default = "default_capture_backoff_ms")]
    pub capture_backoff_ms: u64,
    #[serde(default = "default_worker_backoff_ms")]
    pub worker_backoff_ms: u64,
}

/// Thresholds and timing of the profile decision state machine.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    #[serde(default = "default_speech_threshold")]
    pub speech_threshold: f32,
    #[serde(default = "default_movie_threshold")]
    pub movie_threshold: f32,
    #[serde(default = "default_genre_threshold")]
    pub genre_threshold: f32,
    #[serde(default = "default_music_threshold")]
    pub music_threshold: f32,
    /// Seconds a candidate must persist before switching
    #[serde(default = "default_hysteresis_delay")]
    pub hysteresis_delay: f64,
    /// Minimum seconds between two switches
    #[serde(default = "default_cooldown_period")]
    pub cooldown_period: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionConfig {
    /// Interpolation steps per second
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,
    #[serde(default = "default_switch_duration")]
    pub switch_duration: f32,
    #[serde(default = "default_restore_duration")]
    pub restore_duration: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Where the EqualizerAPO config is written
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    /// Profile catalog overriding the built-in one
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            analysis_window: default_analysis_window(),
            queue_max_seconds: default_queue_max_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            capture_frame_count: default_capture_frame_count(),
            capture_backoff_ms: default_capture_backoff_ms(),
            worker_backoff_ms: default_worker_backoff_ms(),
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            speech_threshold: default_speech_threshold(),
            movie_threshold: default_movie_threshold(),
            genre_threshold: default_genre_threshold(),
            music_threshold: default_music_threshold(),
            hysteresis_delay: default_hysteresis_delay(),
            cooldown_period: default_cooldown_period(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            switch_duration: default_switch_duration(),
            restore_duration: default_restore_duration(),
        }
    }
}

fn default_analysis_window() -> f32 { 4.0 }
fn default_queue_max_seconds() -> f32 { 8.0 }
fn default_poll_interval_ms() -> u64 { 100 }
fn default_capture_frame_count() -> usize { 4096 }
fn default_capture_backoff_ms() -> u64 { 1000 }
fn default_worker_backoff_ms() -> u64 { 500 }
fn default_speech_threshold() -> f32 { 0.6 }
fn default_movie_threshold() -> f32 { 0.5 }
fn default_genre_threshold() -> f32 { 0.4 }
fn default_music_threshold() -> f32 { 0.2 }
fn default_hysteresis_delay() -> f64 { 10.0 }
fn default_cooldown_period() -> f64 { 12.0 }
fn default_rate_hz() -> f32 { 50.0 }
fn default_switch_duration() -> f32 { 2.0 }
fn default_restore_duration() -> f32 { 1.0 }

impl AdaptiveConfig {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            analysis_window: self.analysis_window,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            error_backoff: Duration::from_millis(self.worker_backoff_ms),
        }
    }

    pub fn capture_backoff(&self) -> Duration {
        Duration::from_millis(self.capture_backoff_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.adaptive;
        positive("adaptive.analysis_window", a.analysis_window as f64)?;
        positive("adaptive.queue_max_seconds", a.queue_max_seconds as f64)?;
        positive("adaptive.poll_interval_ms", a.poll_interval_ms as f64)?;
        positive("adaptive.capture_frame_count", a.capture_frame_count as f64)?;

        let d = &self.decision;
        unit("decision.speech_threshold", d.speech_threshold)?;
        unit("decision.movie_threshold", d.movie_threshold)?;
        unit("decision.genre_threshold", d.genre_threshold)?;
        unit("decision.music_threshold", d.music_threshold)?;
        non_negative("decision.hysteresis_delay", d.hysteresis_delay)?;
        non_negative("decision.cooldown_period", d.cooldown_period)?;

        let t = &self.transition;
        positive("transition.rate_hz", t.rate_hz as f64)?;
        non_negative("transition.switch_duration", t.switch_duration as f64)?;
        non_negative("transition.restore_duration", t.restore_duration as f64)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [adaptive]
            analysis_window = 5.0

            [decision]
            cooldown_period = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.adaptive.analysis_window, 5.0);
        assert_eq!(config.adaptive.queue_max_seconds, 8.0);
        assert_eq!(config.decision.cooldown_period, 30.0);
        assert_eq!(config.decision.hysteresis_delay, 10.0);
        assert_eq!(config.decision.speech_threshold, 0.6);
        assert_eq!(config.transition.rate_hz, 50.0);
        assert!(config.engine.config_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        config.decision.genre_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfUnitRange { .. })));

        let mut config = Config::default();
        config.adaptive.analysis_window = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn scheduler_config_uses_millis() {
        let scheduler = AdaptiveConfig::default().scheduler();
        assert_eq!(scheduler.poll_interval, Duration::from_millis(100));
        assert_eq!(scheduler.error_backoff, Duration::from_millis(500));
        assert_eq!(scheduler.analysis_window, 4.0);
    }
}
