//! Time-bounded crossfades between two equalizer states.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::equalizer::Equalizer;
use super::types::{FilterBand, FilterType, ParametricEqState};

pub const DEFAULT_RATE_HZ: f32 = 50.0;

const NEUTRAL_GAIN: f32 = 0.0;
const NEUTRAL_Q: f32 = 1.0;

/// Precomputed endpoints of a crossfade on a common frequency grid.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    start_scalars: [f32; 3],
    end_scalars: [f32; 3],
    frequencies: Vec<f32>,
    start_gains: Vec<f32>,
    end_gains: Vec<f32>,
    start_qs: Vec<f32>,
    end_qs: Vec<f32>,
    filter_types: Vec<FilterType>,
}

impl TransitionPlan {
    pub fn new(start: &ParametricEqState, end: &ParametricEqState) -> Self {
        let mut frequencies: Vec<f32> = start
            .bands
            .iter()
            .chain(end.bands.iter())
            .map(|b| b.frequency)
            .collect();
        frequencies.sort_by(|a, b| a.total_cmp(b));
        frequencies.dedup();

        let (start_gains, start_qs) = sample_bands(&start.bands, &frequencies);
        let (end_gains, end_qs) = sample_bands(&end.bands, &frequencies);

        let filter_types = frequencies
            .iter()
            .map(|&f| {
                end.bands
                    .iter()
                    .find(|b| b.frequency == f)
                    .map(|b| b.filter_type)
                    .unwrap_or(FilterType::Peaking)
            })
            .collect();

        Self {
            start_scalars: [start.preamp, start.bass, start.treble],
            end_scalars: [end.preamp, end.bass, end.treble],
            frequencies,
            start_gains,
            end_gains,
            start_qs,
            end_qs,
            filter_types,
        }
    }

    /// Interpolated state at `progress` in [0, 1].
    pub fn at(&self, progress: f32) -> ParametricEqState {
        let p = progress.clamp(0.0, 1.0);
        let lerp = |a: f32, b: f32| a + (b - a) * p;

        let bands = self
            .frequencies
            .iter()
            .enumerate()
            .map(|(i, &frequency)| FilterBand {
                frequency,
                gain: lerp(self.start_gains[i], self.end_gains[i]),
                q: lerp(self.start_qs[i], self.end_qs[i]),
                filter_type: self.filter_types[i],
            })
            .collect();

        ParametricEqState {
            preamp: lerp(self.start_scalars[0], self.end_scalars[0]),
            bass: lerp(self.start_scalars[1], self.end_scalars[1]),
            treble: lerp(self.start_scalars[2], self.end_scalars[2]),
            bands,
        }
    }
}

/// Gain and Q of `bands` at each of `frequencies`; neutral where a snapshot has no band.
fn sample_bands(bands: &[FilterBand], frequencies: &[f32]) -> (Vec<f32>, Vec<f32>) {
    frequencies
        .iter()
        .map(|&f| match bands.iter().find(|b| b.frequency == f) {
            Some(band) => (band.gain, band.q),
            None => (NEUTRAL_GAIN, NEUTRAL_Q),
        })
        .unzip()
}

struct TransitionJob {
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    progress: Arc<AtomicU32>,
}

impl TransitionJob {
    fn stop(&mut self) {
        drop(self.cancel.take());
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Transition thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Runs at most one crossfade at a time; a new one replaces the old.
pub struct TransitionScheduler {
    equalizer: Arc<Equalizer>,
    rate_hz: f32,
    job: Option<TransitionJob>,
}

impl TransitionScheduler {
    pub fn new(equalizer: Arc<Equalizer>, rate_hz: f32) -> Self {
        Self {
            equalizer,
            rate_hz,
            job: None,
        }
    }

    /// Stop any running crossfade, then ramp from `start` to `end` over `duration` seconds.
    ///
    /// The previous job is joined before this returns, so its writes never
    /// interleave with the new ramp.
    pub fn start(&mut self, start: ParametricEqState, end: ParametricEqState, duration: f32) {
        self.cancel();

        let steps = if duration.is_finite() && duration > 0.0 {
            (self.rate_hz * duration).round() as u32
        } else {
            0
        };
        if steps == 0 {
            log::debug!("Transition of {:.2}s has no steps, skipping", duration);
            return;
        }

        let plan = TransitionPlan::new(&start, &end);
        let interval = Duration::from_secs_f32(duration / steps as f32);
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let progress = Arc::new(AtomicU32::new(0f32.to_bits()));
        let equalizer = self.equalizer.clone();
        let job_progress = progress.clone();

        log::debug!("Starting {:.2}s transition ({} steps)", duration, steps);
        let spawned = thread::Builder::new()
            .name("tonesteer-transition".into())
            .spawn(move || run_transition(plan, steps, interval, equalizer, cancel_rx, job_progress));

        match spawned {
            Ok(handle) => {
                self.job = Some(TransitionJob {
                    cancel: Some(cancel_tx),
                    handle: Some(handle),
                    progress,
                });
            }
            Err(err) => log::error!("Failed to spawn transition thread: {}", err),
        }
    }

    /// Stop the running crossfade where it is. No rollback.
    pub fn cancel(&mut self) {
        if let Some(mut job) = self.job.take() {
            job.stop();
        }
    }

    /// Block until the running crossfade finishes on its own.
    pub fn wait(&mut self) {
        if let Some(job) = self.job.as_mut() {
            job.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.as_ref().is_some_and(TransitionJob::is_running)
    }

    /// Progress of the current or last crossfade in [0, 1].
    pub fn progress(&self) -> f32 {
        self.job
            .as_ref()
            .map_or(0.0, |job| f32::from_bits(job.progress.load(Ordering::Acquire)))
    }
}

impl Drop for TransitionScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_transition(
    plan: TransitionPlan,
    steps: u32,
    interval: Duration,
    equalizer: Arc<Equalizer>,
    cancel: Receiver<()>,
    progress: Arc<AtomicU32>,
) {
    for i in 0..=steps {
        if !matches!(cancel.try_recv(), Err(TryRecvError::Empty)) {
            log::debug!("Transition cancelled at step {}/{}", i, steps);
            return;
        }

        let p = i as f32 / steps as f32;
        if let Err(err) = equalizer.write(plan.at(p)) {
            log::warn!("Transition step {}/{} failed: {}", i, steps, err);
        }
        progress.store(p.to_bits(), Ordering::Release);

        if i < steps {
            match cancel.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => {
                    log::debug!("Transition cancelled after step {}/{}", i, steps);
                    return;
                }
            }
        }
    }
    log::debug!("Transition complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::catalog::ProfileCatalog;
    use crate::eq::equalizer::testing::recording_equalizer;
    use crate::eq::merge::merge_profile;

    fn state(preamp: f32, bands: Vec<FilterBand>) -> ParametricEqState {
        ParametricEqState {
            preamp,
            bass: 0.0,
            treble: 0.0,
            bands,
        }
    }

    fn gain_at(state: &ParametricEqState, frequency: f32) -> f32 {
        state
            .bands
            .iter()
            .find(|b| b.frequency == frequency)
            .map(|b| b.gain)
            .unwrap()
    }

    #[test]
    fn plan_endpoints_match_inputs_on_shared_grid() {
        let a = state(0.0, vec![FilterBand::peaking(100.0, 2.0, 1.0), FilterBand::peaking(1000.0, 4.0, 2.0)]);
        let b = state(-4.0, vec![FilterBand::peaking(100.0, -2.0, 3.0), FilterBand::peaking(1000.0, 0.0, 1.0)]);
        let plan = TransitionPlan::new(&a, &b);
        assert_eq!(plan.at(0.0), a);
        assert_eq!(plan.at(1.0), b);

        let mid = plan.at(0.5);
        assert_eq!(mid.preamp, -2.0);
        assert_eq!(gain_at(&mid, 100.0), 0.0);
        assert_eq!(mid.bands[0].q, 2.0);
    }

    #[test]
    fn union_grid_uses_neutral_values_for_missing_frequencies() {
        let a = state(0.0, vec![FilterBand::peaking(100.0, 0.0, 1.0), FilterBand::peaking(300.0, 4.0, 2.0)]);
        let b = state(0.0, vec![FilterBand::new(200.0, 6.0, 2.0, FilterType::LowShelf)]);
        let plan = TransitionPlan::new(&a, &b);

        let start = plan.at(0.0);
        assert_eq!(start.frequencies(), vec![100.0, 200.0, 300.0]);
        assert_eq!(start.gains(), vec![0.0, 0.0, 4.0]);
        assert_eq!(start.q_values(), vec![1.0, 1.0, 2.0]);

        let end = plan.at(1.0);
        assert_eq!(end.gains(), vec![0.0, 6.0, 0.0]);
        assert_eq!(end.q_values(), vec![1.0, 2.0, 1.0]);
        assert_eq!(
            end.filter_types(),
            vec![FilterType::Peaking, FilterType::LowShelf, FilterType::Peaking]
        );

        let mid = plan.at(0.5);
        assert_eq!(mid.gains(), vec![0.0, 3.0, 2.0]);
    }

    #[test]
    fn empty_snapshot_contributes_neutral_values() {
        let a = state(0.0, Vec::new());
        let b = state(0.0, vec![FilterBand::peaking(1000.0, 6.0, 3.0)]);
        let start = TransitionPlan::new(&a, &b).at(0.0);
        assert_eq!(start.bands[0].gain, 0.0);
        assert_eq!(start.bands[0].q, 1.0);
    }

    #[test]
    fn ramp_back_from_profile_silences_appended_bands() {
        let baseline = state(0.0, vec![FilterBand::peaking(1000.0, 6.0, 1.41)]);
        let profile = ProfileCatalog::builtin().get("Electronic").cloned().unwrap();
        let merged = merge_profile(&baseline, &profile);
        assert_eq!(merged.frequencies(), vec![50.0, 1000.0, 10000.0]);

        let restored = TransitionPlan::new(&merged, &baseline).at(1.0);
        assert_eq!(restored.bass, baseline.bass);
        assert_eq!(restored.treble, baseline.treble);
        assert_eq!(restored.frequencies(), vec![50.0, 1000.0, 10000.0]);
        for band in &restored.bands {
            if band.frequency == 1000.0 {
                assert_eq!(band.gain, 6.0);
                assert_eq!(band.q, 1.41);
            } else {
                assert_eq!(band.gain, 0.0, "band at {} Hz kept gain", band.frequency);
                assert_eq!(band.filter_type, FilterType::Peaking);
            }
        }
    }

    #[test]
    fn runs_to_completion() {
        let (eq, applied) = recording_equalizer(ParametricEqState::empty());
        let mut scheduler = TransitionScheduler::new(eq.clone(), 50.0);
        let end = state(-6.0, vec![FilterBand::peaking(1000.0, 3.0, 1.0)]);
        scheduler.start(ParametricEqState::empty(), end.clone(), 0.1);
        scheduler.wait();

        // round(50 * 0.1) = 5 steps, applied at progress 0..=5
        assert_eq!(applied.lock().len(), 6);
        assert_eq!(eq.snapshot(), end);
        assert_eq!(scheduler.progress(), 1.0);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn zero_steps_applies_nothing() {
        let (eq, applied) = recording_equalizer(ParametricEqState::empty());
        let mut scheduler = TransitionScheduler::new(eq, 50.0);
        scheduler.start(ParametricEqState::empty(), state(3.0, Vec::new()), 0.005);
        scheduler.start(ParametricEqState::empty(), state(3.0, Vec::new()), 0.0);
        scheduler.wait();
        assert!(applied.lock().is_empty());
    }

    #[test]
    fn cancel_leaves_intermediate_state() {
        let (eq, applied) = recording_equalizer(ParametricEqState::empty());
        let mut scheduler = TransitionScheduler::new(eq.clone(), 50.0);
        scheduler.start(state(0.0, Vec::new()), state(-10.0, Vec::new()), 2.0);
        thread::sleep(Duration::from_millis(150));
        scheduler.cancel();

        let count = applied.lock().len();
        assert!(count >= 2 && count < 101, "applied {} steps", count);
        let preamp = eq.snapshot().preamp;
        assert!(preamp < 0.0 && preamp > -10.0);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(applied.lock().len(), count);
    }

    #[test]
    fn replacement_stops_previous_ramp() {
        let a = state(0.0, vec![FilterBand::peaking(1000.0, 0.0, 1.0)]);
        let b = state(0.0, vec![FilterBand::peaking(1000.0, 10.0, 1.0)]);
        let c = state(0.0, vec![FilterBand::peaking(1000.0, -10.0, 1.0)]);

        let (eq, applied) = recording_equalizer(ParametricEqState::empty());
        let mut scheduler = TransitionScheduler::new(eq, 50.0);
        scheduler.start(a.clone(), b, 2.0);
        thread::sleep(Duration::from_millis(100));
        scheduler.start(a, c, 2.0);
        let marker = applied.lock().len();
        thread::sleep(Duration::from_millis(200));
        scheduler.cancel();

        let applied = applied.lock();
        assert!(applied.len() > marker);
        assert!(applied[..marker].iter().any(|s| s.bands[0].gain > 0.0));
        for s in &applied[marker..] {
            assert!(s.bands[0].gain <= 0.0, "saw gain {} after replacement", s.bands[0].gain);
        }
    }
}
