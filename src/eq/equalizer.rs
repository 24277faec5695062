//! Single owner of the live equalizer state.
//!
//! Transition steps and manual edits both go through [`Equalizer`], so writes
//! are serialized and the backend always renders a complete state.

use parking_lot::Mutex;

use super::backend::EqualizerBackend;
use super::types::ParametricEqState;
use crate::error::EngineError;

pub struct Equalizer {
    state: Mutex<ParametricEqState>,
    backend: Box<dyn EqualizerBackend>,
}

impl Equalizer {
    pub fn new(initial: ParametricEqState, backend: Box<dyn EqualizerBackend>) -> Self {
        Self {
            state: Mutex::new(initial),
            backend,
        }
    }

    /// Copy of the currently active configuration.
    pub fn snapshot(&self) -> ParametricEqState {
        self.state.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.backend.is_active()
    }

    /// Replace the whole state.
    pub fn write(&self, state: ParametricEqState) -> Result<(), EngineError> {
        let mut current = self.state.lock();
        *current = state;
        self.render(&current)
    }

    /// Mutate the state in place under the write lock.
    pub fn edit<F>(&self, f: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut ParametricEqState),
    {
        let mut current = self.state.lock();
        f(&mut current);
        self.render(&current)
    }

    pub fn set_preamp(&self, gain_db: f32) -> Result<(), EngineError> {
        log::debug!("Setting preamp to {} dB", gain_db);
        self.edit(|s| s.preamp = gain_db)
    }

    pub fn set_bass(&self, gain_db: f32) -> Result<(), EngineError> {
        log::debug!("Setting bass gain to {} dB", gain_db);
        self.edit(|s| s.bass = gain_db)
    }

    pub fn set_treble(&self, gain_db: f32) -> Result<(), EngineError> {
        log::debug!("Setting treble gain to {} dB", gain_db);
        self.edit(|s| s.treble = gain_db)
    }

    /// Set gain and frequency of one band. Out-of-range indices are ignored.
    pub fn set_band(&self, index: usize, gain_db: f32, frequency: f32) -> Result<(), EngineError> {
        self.edit(|s| match s.bands.get_mut(index) {
            Some(band) => {
                band.gain = gain_db;
                band.frequency = frequency;
            }
            None => log::warn!("Invalid band index: {}", index),
        })
    }

    /// Back to the flat ten-band layout.
    pub fn reset(&self) -> Result<(), EngineError> {
        log::info!("Resetting equalizer");
        self.write(ParametricEqState::flat_ten_band())
    }

    fn render(&self, state: &ParametricEqState) -> Result<(), EngineError> {
        if self.backend.is_active() {
            self.backend.apply(state)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::recording_equalizer;
    use super::*;
    use crate::eq::backend::NullBackend;

    #[test]
    fn edits_render_through_active_backend() {
        let (eq, applied) = recording_equalizer(ParametricEqState::flat_ten_band());
        eq.set_band(5, 3.0, 1100.0).unwrap();
        eq.set_preamp(-2.0).unwrap();

        let applied = applied.lock();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[1].preamp, -2.0);
        assert_eq!(applied[1].bands[5].gain, 3.0);
        assert_eq!(applied[1].bands[5].frequency, 1100.0);
    }

    #[test]
    fn invalid_band_index_leaves_state() {
        let eq = Equalizer::new(ParametricEqState::flat_ten_band(), Box::new(NullBackend));
        eq.set_band(42, 6.0, 500.0).unwrap();
        assert_eq!(eq.snapshot(), ParametricEqState::flat_ten_band());
    }

    #[test]
    fn inactive_backend_still_tracks_state() {
        let eq = Equalizer::new(ParametricEqState::empty(), Box::new(NullBackend));
        eq.set_treble(2.0).unwrap();
        eq.set_bass(-1.0).unwrap();
        let snap = eq.snapshot();
        assert_eq!((snap.bass, snap.treble), (-1.0, 2.0));
        eq.reset().unwrap();
        assert_eq!(eq.snapshot().bands.len(), 10);
    }
}
