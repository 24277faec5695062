use std::path::{Path, PathBuf};

use super::types::ParametricEqState;
use crate::error::EngineError;

/// The engine that actually renders the equalizer.
pub trait EqualizerBackend: Send + Sync {
    /// Whether the live configuration is currently being rendered.
    fn is_active(&self) -> bool;

    /// Re-apply the live configuration.
    fn apply(&self, state: &ParametricEqState) -> Result<(), EngineError>;
}

/// Backend that renders nothing.
#[derive(Debug, Default)]
pub struct NullBackend;

impl EqualizerBackend for NullBackend {
    fn is_active(&self) -> bool {
        false
    }

    fn apply(&self, _state: &ParametricEqState) -> Result<(), EngineError> {
        Ok(())
    }
}

const BASS_SHELF_HZ: u32 = 100;
const TREBLE_SHELF_HZ: u32 = 8000;
const SHELF_Q: f32 = 0.71;

/// Writes the live state as an EqualizerAPO configuration file.
///
/// EqualizerAPO reloads the file itself, so every change is rendered.
pub struct ApoConfigBackend {
    path: PathBuf,
}

impl ApoConfigBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EqualizerBackend for ApoConfigBackend {
    fn is_active(&self) -> bool {
        true
    }

    fn apply(&self, state: &ParametricEqState) -> Result<(), EngineError> {
        std::fs::write(&self.path, render_apo_config(state)).map_err(|source| EngineError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        log::trace!("Wrote equalizer config to {}", self.path.display());
        Ok(())
    }
}

/// Render a state in EqualizerAPO text form. Bass and treble become shelves
/// appended after the parametric bands, only when non-zero.
pub fn render_apo_config(state: &ParametricEqState) -> String {
    let mut lines = vec![format!("Preamp: {:.1} dB", state.preamp)];

    for (i, band) in state.bands.iter().enumerate() {
        lines.push(format!(
            "Filter {}: ON {} Fc {} Hz Gain {:.1} dB Q {:.2}",
            i + 1,
            band.filter_type.code(),
            band.frequency.round() as i64,
            band.gain,
            band.q
        ));
    }

    let mut index = state.bands.len() + 1;
    if state.bass != 0.0 {
        lines.push(format!(
            "Filter {}: ON LS Fc {} Hz Gain {:.1} dB Q {:.2}",
            index, BASS_SHELF_HZ, state.bass, SHELF_Q
        ));
        index += 1;
    }
    if state.treble != 0.0 {
        lines.push(format!(
            "Filter {}: ON HS Fc {} Hz Gain {:.1} dB Q {:.2}",
            index, TREBLE_SHELF_HZ, state.treble, SHELF_Q
        ));
    }

    lines.join("\n")
}
