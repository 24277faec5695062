use serde::{Deserialize, Serialize};

/// Filter types understood by the equalizer backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Bell filter around the center frequency
    #[default]
    #[serde(rename = "PK")]
    Peaking,
    #[serde(rename = "LS")]
    LowShelf,
    #[serde(rename = "HS")]
    HighShelf,
    /// Low shelf with Q-controlled slope
    #[serde(rename = "LSQ")]
    LowShelfQ,
    /// High shelf with Q-controlled slope
    #[serde(rename = "HSQ")]
    HighShelfQ,
}

impl FilterType {
    pub fn code(&self) -> &'static str {
        match self {
            FilterType::Peaking => "PK",
            FilterType::LowShelf => "LS",
            FilterType::HighShelf => "HS",
            FilterType::LowShelfQ => "LSQ",
            FilterType::HighShelfQ => "HSQ",
        }
    }
}

/// One parametric filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterBand {
    #[serde(alias = "freq")]
    pub frequency: f32,
    pub gain: f32,
    #[serde(default = "default_q")]
    pub q: f32,
    #[serde(rename = "type", default)]
    pub filter_type: FilterType,
}

fn default_q() -> f32 {
    1.0
}

impl FilterBand {
    pub fn new(frequency: f32, gain: f32, q: f32, filter_type: FilterType) -> Self {
        Self {
            frequency,
            gain,
            q,
            filter_type,
        }
    }

    pub fn peaking(frequency: f32, gain: f32, q: f32) -> Self {
        Self::new(frequency, gain, q, FilterType::Peaking)
    }
}

/// Full equalizer snapshot exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametricEqState {
    #[serde(default)]
    pub preamp: f32,
    #[serde(default)]
    pub bass: f32,
    #[serde(default)]
    pub treble: f32,
    #[serde(default)]
    pub bands: Vec<FilterBand>,
}

pub const DEFAULT_BAND_FREQUENCIES: [f32; 10] =
    [32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0];
pub const DEFAULT_BAND_Q: f32 = 1.41;

impl Default for ParametricEqState {
    fn default() -> Self {
        Self::flat_ten_band()
    }
}

impl ParametricEqState {
    /// Ten peaking bands at 0 dB, the reset state of the equalizer.
    pub fn flat_ten_band() -> Self {
        Self {
            preamp: 0.0,
            bass: 0.0,
            treble: 0.0,
            bands: DEFAULT_BAND_FREQUENCIES
                .iter()
                .map(|&f| FilterBand::peaking(f, 0.0, DEFAULT_BAND_Q))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            preamp: 0.0,
            bass: 0.0,
            treble: 0.0,
            bands: Vec::new(),
        }
    }

    pub fn frequencies(&self) -> Vec<f32> {
        self.bands.iter().map(|b| b.frequency).collect()
    }

    pub fn gains(&self) -> Vec<f32> {
        self.bands.iter().map(|b| b.gain).collect()
    }

    pub fn q_values(&self) -> Vec<f32> {
        self.bands.iter().map(|b| b.q).collect()
    }

    pub fn filter_types(&self) -> Vec<FilterType> {
        self.bands.iter().map(|b| b.filter_type).collect()
    }
}

/// A named content profile: delta bands plus bass/treble offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqProfile {
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub bands: Vec<FilterBand>,
    #[serde(default)]
    pub bass: f32,
    #[serde(default)]
    pub treble: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_band_accepts_short_keys() {
        let band: FilterBand =
            serde_json::from_str(r#"{"freq": 250, "gain": -1.0, "q": 1.0, "type": "LS"}"#).unwrap();
        assert_eq!(band, FilterBand::new(250.0, -1.0, 1.0, FilterType::LowShelf));
    }

    #[test]
    fn filter_type_defaults_to_peaking() {
        let band: FilterBand = serde_json::from_str(r#"{"frequency": 1000, "gain": 2.0}"#).unwrap();
        assert_eq!(band.filter_type, FilterType::Peaking);
        assert_eq!(band.q, 1.0);
    }

    #[test]
    fn flat_state_has_ten_bands() {
        let state = ParametricEqState::flat_ten_band();
        assert_eq!(state.bands.len(), 10);
        assert!(state.gains().iter().all(|&g| g == 0.0));
        assert_eq!(state.frequencies()[5], 1000.0);
    }
}
