//! Wires capture, classification, decisions and transitions into one session.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::decision::{Decision, ProfileDecisionEngine};
use crate::audio::{CaptureSource, CaptureWorker, StreamingAudioBuffer};
use crate::classify::{ClassificationScheduler, Classifier, DetectionEvent};
use crate::config::Config;
use crate::eq::{merge_profile, Equalizer, ParametricEqState, ProfileCatalog, TransitionScheduler};

struct Shared {
    config: Config,
    catalog: Arc<ProfileCatalog>,
    equalizer: Arc<Equalizer>,
    buffer: Arc<StreamingAudioBuffer>,
    decision: Mutex<ProfileDecisionEngine>,
    /// EQ state captured on enable, restored on disable
    baseline: Mutex<Option<ParametricEqState>>,
    transitions: Mutex<TransitionScheduler>,
    enabled: AtomicBool,
}

struct Session {
    scheduler: ClassificationScheduler,
    capture: CaptureWorker,
}

/// Adaptive EQ: follows the content being played and crossfades to matching profiles.
pub struct AdaptiveEq {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl AdaptiveEq {
    pub fn new(config: Config, catalog: Arc<ProfileCatalog>, equalizer: Arc<Equalizer>) -> Self {
        let buffer = Arc::new(StreamingAudioBuffer::new(config.adaptive.queue_max_seconds));
        let decision = ProfileDecisionEngine::new(config.decision.clone(), catalog.clone());
        let transitions = TransitionScheduler::new(equalizer.clone(), config.transition.rate_hz);
        Self {
            shared: Arc::new(Shared {
                config,
                catalog,
                equalizer,
                buffer,
                decision: Mutex::new(decision),
                baseline: Mutex::new(None),
                transitions: Mutex::new(transitions),
                enabled: AtomicBool::new(false),
            }),
            session: Mutex::new(None),
        }
    }

    /// Capture the baseline and start listening. No-op when already enabled.
    pub fn enable(&self, classifier: Box<dyn Classifier>, capture: Box<dyn CaptureSource>) -> Result<()> {
        let mut session = self.session.lock();
        if session.is_some() {
            log::debug!("Adaptive EQ already enabled");
            return Ok(());
        }

        let shared = &self.shared;
        *shared.baseline.lock() = Some(shared.equalizer.snapshot());
        {
            let mut decision = shared.decision.lock();
            decision.reset();
            decision.set_enabled(true);
        }
        shared.enabled.store(true, Ordering::SeqCst);

        let subscriber = shared.clone();
        let scheduler = ClassificationScheduler::start(
            shared.config.adaptive.scheduler(),
            shared.buffer.clone(),
            classifier,
            Box::new(move |event| subscriber.on_detection(&event)),
        );
        let scheduler = match scheduler {
            Ok(s) => s,
            Err(err) => {
                shared.deactivate();
                return Err(err.context("Failed to start classification"));
            }
        };

        let capture = match CaptureWorker::spawn(
            capture,
            shared.buffer.clone(),
            shared.config.adaptive.capture_frame_count,
            shared.config.adaptive.capture_backoff(),
        ) {
            Ok(c) => c,
            Err(err) => {
                shared.deactivate();
                scheduler.stop();
                return Err(err.context("Failed to start audio capture"));
            }
        };

        *session = Some(Session { scheduler, capture });
        log::info!("Adaptive EQ enabled");
        Ok(())
    }

    /// Stop listening and crossfade back to the baseline captured on enable.
    pub fn disable(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };
        let shared = &self.shared;
        shared.deactivate();

        session.scheduler.stop();
        session.capture.stop();

        let baseline = shared.baseline.lock().take();
        {
            let mut transitions = shared.transitions.lock();
            transitions.cancel();
            if let Some(baseline) = baseline {
                log::info!("Restoring baseline EQ");
                transitions.start(
                    shared.equalizer.snapshot(),
                    baseline,
                    shared.config.transition.restore_duration,
                );
            }
        }

        shared.decision.lock().reset();
        shared.buffer.clear();
        log::info!("Adaptive EQ disabled");
    }

    /// Crossfade to a manually chosen state, replacing any running transition.
    pub fn apply_manual(&self, target: ParametricEqState, duration: f32) {
        let shared = &self.shared;
        shared
            .transitions
            .lock()
            .start(shared.equalizer.snapshot(), target, duration);
    }

    /// Block until the current transition has finished.
    pub fn wait_for_transition(&self) {
        self.shared.transitions.lock().wait();
    }

    pub fn is_transitioning(&self) -> bool {
        self.shared.transitions.lock().is_running()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn current_profile(&self) -> String {
        self.shared.decision.lock().current_profile().to_string()
    }

    pub fn equalizer(&self) -> &Arc<Equalizer> {
        &self.shared.equalizer
    }

    pub fn buffer(&self) -> &Arc<StreamingAudioBuffer> {
        &self.shared.buffer
    }

    pub fn catalog(&self) -> &Arc<ProfileCatalog> {
        &self.shared.catalog
    }
}

impl Drop for AdaptiveEq {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            self.shared.deactivate();
            session.scheduler.stop();
            session.capture.stop();
        }
    }
}

impl Shared {
    fn deactivate(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.decision.lock().set_enabled(false);
    }

    /// Runs on the classification thread.
    fn on_detection(&self, event: &DetectionEvent) {
        let decision = self.decision.lock().on_detection(event);
        if let Decision::Switch { to, .. } = decision {
            self.apply_profile(&to);
        }
    }

    fn apply_profile(&self, key: &str) {
        let Some(baseline) = self.baseline.lock().clone() else {
            log::warn!("No baseline EQ captured, skipping profile {}", key);
            return;
        };
        let Some(profile) = self.catalog.get(key) else {
            log::warn!("Unknown profile {}, skipping", key);
            return;
        };

        let target = merge_profile(&baseline, profile);
        log::info!("Applying profile {} ({})", key, profile.name);
        self.transitions.lock().start(
            self.equalizer.snapshot(),
            target,
            self.config.transition.switch_duration,
        );
    }
}
