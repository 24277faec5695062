//! Adaptive equalizer: classifies what is playing and crossfades the system
//! EQ to a matching profile.

pub mod adaptive;
pub mod audio;
pub mod classify;
pub mod config;
pub mod eq;
pub mod error;

pub use adaptive::AdaptiveEq;
pub use config::Config;
