use thiserror::Error;

/// Failure while converting a frame to the buffer's working rate.
#[derive(Error, Debug)]
pub enum ResampleError {
    #[error("Failed to create resampler ({from} Hz -> {to} Hz): {reason}")]
    Setup { from: u32, to: u32, reason: String },

    #[error("Resampling failed: {0}")]
    Process(String),

    #[error("Invalid sample rate: {0}")]
    InvalidRate(u32),
}

/// Failure while rendering equalizer state through a backend.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to write equalizer config {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Rejected configuration or catalog data.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },

    #[error("Label '{label}' maps to unknown profile '{profile}'")]
    UnknownProfile { label: String, profile: String },

    #[error("Profile catalog has no '{0}' profile")]
    MissingProfile(String),

    #[error("Failed to parse profile catalog: {0}")]
    Catalog(#[from] toml::de::Error),
}
