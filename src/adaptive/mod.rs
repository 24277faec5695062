pub mod controller;
pub mod decision;

pub use controller::AdaptiveEq;
pub use decision::{Decision, ProfileDecisionEngine};
