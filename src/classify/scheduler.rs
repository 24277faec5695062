//! Periodic analysis loop: buffer window → classifier → subscriber.

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::detections::{Classifier, DetectionEvent, Detections};
use crate::audio::StreamingAudioBuffer;

pub type DetectionCallback = Box<dyn FnMut(DetectionEvent) + Send>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Seconds of audio handed to the classifier
    pub analysis_window: f32,
    pub poll_interval: Duration,
    /// Pause after a panicking tick
    pub error_backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            analysis_window: 4.0,
            poll_interval: Duration::from_millis(100),
            error_backoff: Duration::from_millis(500),
        }
    }
}

/// Handle to the running analysis thread.
pub struct ClassificationScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ClassificationScheduler {
    /// Spawn the loop. `subscriber` receives every event, in order, on the worker thread.
    pub fn start(
        config: SchedulerConfig,
        buffer: Arc<StreamingAudioBuffer>,
        classifier: Box<dyn Classifier>,
        subscriber: DetectionCallback,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("tonesteer-classify".into())
            .spawn(move || {
                let mut worker = Worker {
                    config,
                    buffer,
                    classifier,
                    subscriber,
                    last_analysis: None,
                };
                worker.run(stop_rx);
            })?;

        log::info!("Classification scheduler started");
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the loop and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
        log::info!("Classification scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Classification thread panicked");
            }
        }
    }
}

impl Drop for ClassificationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    config: SchedulerConfig,
    buffer: Arc<StreamingAudioBuffer>,
    classifier: Box<dyn Classifier>,
    subscriber: DetectionCallback,
    last_analysis: Option<Instant>,
}

impl Worker {
    fn run(&mut self, stop: Receiver<()>) {
        if let Err(err) = self.classifier.warm_up() {
            log::warn!("Classifier warm-up failed: {:#}", err);
        }

        loop {
            if !wait(&stop, self.config.poll_interval) {
                break;
            }
            let tick = panic::catch_unwind(AssertUnwindSafe(|| self.tick()));
            if tick.is_err() {
                log::error!("Classification tick failed, backing off");
                if !wait(&stop, self.config.error_backoff) {
                    break;
                }
            }
        }
    }

    fn tick(&mut self) {
        let interval = Duration::from_secs_f32(self.config.analysis_window / 2.0);
        if self.last_analysis.is_some_and(|t| t.elapsed() < interval) {
            return;
        }

        let Some(snapshot) = self.buffer.snapshot() else {
            return;
        };
        let Some(window) = snapshot.latest(self.config.analysis_window) else {
            return;
        };

        self.last_analysis = Some(Instant::now());
        let detections = match self.classifier.classify(window, snapshot.sample_rate) {
            Ok(d) => d,
            Err(err) => {
                log::warn!("Classification failed: {:#}", err);
                Detections::new()
            }
        };

        log::debug!("Analysis results: {:?}", detections.top(5));
        (self.subscriber)(DetectionEvent {
            timestamp: unix_seconds(),
            detections,
        });
    }
}

/// Sleep on the stop channel. Returns false once stop was signalled.
fn wait(stop: &Receiver<()>, timeout: Duration) -> bool {
    matches!(stop.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
}

pub fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
