//! Detection events → profile switches, with hysteresis and cooldown.

use std::sync::Arc;

use crate::classify::DetectionEvent;
use crate::config::DecisionConfig;
use crate::eq::catalog::{ProfileCatalog, DEFAULT_PROFILE, MOVIE_PROFILE, MUSIC_PROFILE, SPEECH_PROFILE};

/// Outcome of feeding one detection event to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Engine disabled or the table was empty
    Ignored,
    /// Nothing cleared a threshold; any candidate was dropped
    Undecided,
    /// Chosen profile is already active
    Unchanged,
    /// A new candidate started its hysteresis timer
    CandidatePending { key: String },
    /// Candidate persists but hysteresis or cooldown has not elapsed
    Waiting { key: String },
    Switch { from: String, to: String },
}

#[derive(Debug, Clone)]
struct Candidate {
    key: String,
    since: f64,
}

#[derive(Debug, Clone)]
struct DecisionState {
    confirmed: String,
    last_switch: f64,
    candidate: Option<Candidate>,
}

impl Default for DecisionState {
    fn default() -> Self {
        Self {
            confirmed: DEFAULT_PROFILE.to_string(),
            last_switch: 0.0,
            candidate: None,
        }
    }
}

pub struct ProfileDecisionEngine {
    config: DecisionConfig,
    catalog: Arc<ProfileCatalog>,
    state: DecisionState,
    enabled: bool,
}

impl ProfileDecisionEngine {
    pub fn new(config: DecisionConfig, catalog: Arc<ProfileCatalog>) -> Self {
        Self {
            config,
            catalog,
            state: DecisionState::default(),
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Back to the default profile with no candidate and no switch history.
    pub fn reset(&mut self) {
        self.state = DecisionState::default();
    }

    pub fn current_profile(&self) -> &str {
        &self.state.confirmed
    }

    pub fn candidate(&self) -> Option<&str> {
        self.state.candidate.as_ref().map(|c| c.key.as_str())
    }

    pub fn on_detection(&mut self, event: &DetectionEvent) -> Decision {
        if !self.enabled || event.detections.is_empty() {
            return Decision::Ignored;
        }

        let Some(chosen) = self.choose(event) else {
            self.state.candidate = None;
            return Decision::Undecided;
        };

        if chosen == self.state.confirmed {
            self.state.candidate = None;
            return Decision::Unchanged;
        }

        let now = event.timestamp;
        match &self.state.candidate {
            Some(candidate) if candidate.key == chosen => {
                let held = now - candidate.since;
                let since_switch = now - self.state.last_switch;
                if held >= self.config.hysteresis_delay && since_switch >= self.config.cooldown_period {
                    let from = std::mem::replace(&mut self.state.confirmed, chosen.clone());
                    self.state.last_switch = now;
                    self.state.candidate = None;
                    log::info!("Switching profile: {} -> {}", from, chosen);
                    Decision::Switch { from, to: chosen }
                } else {
                    Decision::Waiting { key: chosen }
                }
            }
            _ => {
                log::debug!("New candidate profile: {}", chosen);
                self.state.candidate = Some(Candidate {
                    key: chosen.clone(),
                    since: now,
                });
                Decision::CandidatePending { key: chosen }
            }
        }
    }

    /// Priority: speech, movie, specific genre, generic music.
    fn choose(&self, event: &DetectionEvent) -> Option<String> {
        let detections = &event.detections;
        let groups = self.catalog.groups();
        let speech = detections.sum_of(&groups.speech);
        let movie = detections.sum_of(&groups.movie);
        let music = detections.sum_of(&groups.music);

        if speech >= self.config.speech_threshold {
            return Some(SPEECH_PROFILE.to_string());
        }
        if movie >= self.config.movie_threshold && speech < 0.8 * self.config.speech_threshold {
            return Some(MOVIE_PROFILE.to_string());
        }
        if let Some(genre) = self.best_genre(event) {
            return Some(genre.to_string());
        }
        if music >= self.config.music_threshold {
            return Some(MUSIC_PROFILE.to_string());
        }
        None
    }

    /// Highest-confidence genre profile. A tie between two different
    /// profiles picks neither.
    fn best_genre(&self, event: &DetectionEvent) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        let mut tied = false;
        for (label, confidence) in event.detections.iter() {
            if confidence < self.config.genre_threshold {
                continue;
            }
            let Some(profile) = self.catalog.profile_for_label(label) else {
                continue;
            };
            if ProfileCatalog::is_broad_category(profile) {
                continue;
            }
            match best {
                Some((_, top)) if confidence < top => {}
                Some((key, top)) if confidence == top => {
                    if key != profile {
                        tied = true;
                    }
                }
                _ => {
                    best = Some((profile, confidence));
                    tied = false;
                }
            }
        }
        if tied {
            None
        } else {
            best.map(|(key, _)| key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Detections;

    fn engine() -> ProfileDecisionEngine {
        let catalog = ProfileCatalog::builtin();
        let mut engine = ProfileDecisionEngine::new(DecisionConfig::default(), catalog);
        engine.set_enabled(true);
        engine
    }

    fn event(timestamp: f64, scores: &[(&str, f32)]) -> DetectionEvent {
        DetectionEvent {
            timestamp,
            detections: scores.iter().map(|&(l, c)| (l, c)).collect::<Detections>(),
        }
    }

    #[test]
    fn speech_switches_after_hysteresis_and_cooldown() {
        let mut engine = engine();
        let speech = [("Speech", 0.7)];

        assert_eq!(
            engine.on_detection(&event(100.0, &speech)),
            Decision::CandidatePending { key: "Speech".into() }
        );
        assert_eq!(
            engine.on_detection(&event(105.0, &speech)),
            Decision::Waiting { key: "Speech".into() }
        );
        assert_eq!(
            engine.on_detection(&event(110.0, &speech)),
            Decision::Switch { from: "default".into(), to: "Speech".into() }
        );
        assert_eq!(engine.current_profile(), "Speech");
        assert_eq!(engine.on_detection(&event(112.0, &speech)), Decision::Unchanged);
    }

    #[test]
    fn genre_label_maps_to_profile() {
        let mut engine = engine();
        let techno = [("Speech", 0.3), ("Techno", 0.5)];
        engine.on_detection(&event(100.0, &techno));
        assert_eq!(engine.candidate(), Some("Electronic"));
        assert_eq!(
            engine.on_detection(&event(110.0, &techno)),
            Decision::Switch { from: "default".into(), to: "Electronic".into() }
        );
    }

    #[test]
    fn cooldown_blocks_back_to_back_switches() {
        let mut engine = engine();
        let speech = [("Speech", 0.9)];
        let rock = [("Rock music", 0.6)];

        engine.on_detection(&event(100.0, &speech));
        assert!(matches!(engine.on_detection(&event(110.0, &speech)), Decision::Switch { .. }));

        engine.on_detection(&event(111.0, &rock));
        // hysteresis satisfied at 121, cooldown only at 122
        assert_eq!(
            engine.on_detection(&event(121.0, &rock)),
            Decision::Waiting { key: "Rock".into() }
        );
        assert_eq!(
            engine.on_detection(&event(122.0, &rock)),
            Decision::Switch { from: "Speech".into(), to: "Rock".into() }
        );
    }

    #[test]
    fn undecided_clears_candidate() {
        let mut engine = engine();
        engine.on_detection(&event(100.0, &[("Speech", 0.7)]));
        assert_eq!(engine.on_detection(&event(105.0, &[("Dog", 0.9)])), Decision::Undecided);
        assert_eq!(engine.candidate(), None);
        assert_eq!(
            engine.on_detection(&event(110.0, &[("Speech", 0.7)])),
            Decision::CandidatePending { key: "Speech".into() }
        );
    }

    #[test]
    fn empty_table_keeps_candidate() {
        let mut engine = engine();
        engine.on_detection(&event(100.0, &[("Speech", 0.7)]));
        assert_eq!(engine.on_detection(&event(105.0, &[])), Decision::Ignored);
        assert_eq!(engine.candidate(), Some("Speech"));
        assert!(matches!(
            engine.on_detection(&event(110.0, &[("Speech", 0.7)])),
            Decision::Switch { .. }
        ));
    }

    #[test]
    fn new_candidate_restarts_timer() {
        let mut engine = engine();
        engine.on_detection(&event(100.0, &[("Speech", 0.7)]));
        engine.on_detection(&event(108.0, &[("Jazz", 0.5)]));
        assert_eq!(
            engine.on_detection(&event(112.0, &[("Jazz", 0.5)])),
            Decision::Waiting { key: "Jazz".into() }
        );
        assert!(matches!(
            engine.on_detection(&event(118.0, &[("Jazz", 0.5)])),
            Decision::Switch { .. }
        ));
    }

    #[test]
    fn disabled_engine_ignores_events() {
        let mut engine = engine();
        engine.set_enabled(false);
        assert_eq!(engine.on_detection(&event(100.0, &[("Speech", 0.9)])), Decision::Ignored);
        assert_eq!(engine.candidate(), None);
    }

    #[test]
    fn movie_needs_quiet_speech() {
        let mut engine = engine();
        // 0.5 >= 0.8 * 0.6 suppresses the movie rule
        engine.on_detection(&event(100.0, &[("Film", 0.6), ("Speech", 0.5), ("Music", 0.3)]));
        assert_eq!(engine.candidate(), Some("Music"));

        engine.on_detection(&event(101.0, &[("Film", 0.6), ("Speech", 0.2)]));
        assert_eq!(engine.candidate(), Some("Movie"));
    }

    #[test]
    fn speech_wins_over_strong_competitors() {
        let mut loud = engine();
        loud.on_detection(&event(
            100.0,
            &[("Speech", 0.7), ("Film", 0.9), ("Techno", 0.9), ("Music", 0.9)],
        ));
        assert_eq!(loud.candidate(), Some("Speech"));

        // exactly at the threshold still wins
        let mut edge = engine();
        edge.on_detection(&event(
            100.0,
            &[("Speech", 0.6), ("Movie", 1.0), ("Rock music", 0.95), ("Jazz", 0.9)],
        ));
        assert_eq!(edge.candidate(), Some("Speech"));
    }

    #[test]
    fn speech_aggregate_sums_labels() {
        let mut engine = engine();
        engine.on_detection(&event(
            100.0,
            &[("Male speech, man speaking", 0.35), ("Female speech, woman speaking", 0.3)],
        ));
        assert_eq!(engine.candidate(), Some("Speech"));
    }

    #[test]
    fn genre_tie_falls_back_to_music() {
        let mut engine = engine();
        engine.on_detection(&event(100.0, &[("Jazz", 0.5), ("Techno", 0.5), ("Music", 0.4)]));
        assert_eq!(engine.candidate(), Some("Music"));

        // same profile on both sides is not a tie
        engine.on_detection(&event(101.0, &[("Techno", 0.5), ("Dubstep", 0.5)]));
        assert_eq!(engine.candidate(), Some("Electronic"));
    }

    #[test]
    fn reset_restores_default() {
        let mut engine = engine();
        engine.on_detection(&event(100.0, &[("Speech", 0.7)]));
        engine.on_detection(&event(110.0, &[("Speech", 0.7)]));
        assert_eq!(engine.current_profile(), "Speech");
        engine.reset();
        assert_eq!(engine.current_profile(), "default");
        assert_eq!(engine.candidate(), None);
    }
}
