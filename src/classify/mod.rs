pub mod detections;
pub mod replay;
pub mod scheduler;

pub use detections::{Classifier, DetectionEvent, Detections};
pub use replay::ScriptedClassifier;
pub use scheduler::{ClassificationScheduler, SchedulerConfig};
