pub mod backend;
pub mod catalog;
pub mod equalizer;
pub mod merge;
pub mod transition;
pub mod types;

pub use backend::{ApoConfigBackend, EqualizerBackend, NullBackend};
pub use catalog::ProfileCatalog;
pub use equalizer::Equalizer;
pub use merge::merge_profile;
pub use transition::{TransitionPlan, TransitionScheduler};
pub use types::{EqProfile, FilterBand, FilterType, ParametricEqState};
