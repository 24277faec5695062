use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label → confidence table produced by one analysis cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Detections {
    scores: BTreeMap<String, f32>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, confidence: f32) {
        self.scores.insert(label.into(), confidence);
    }

    /// Confidence of a label, 0 when absent.
    pub fn get(&self, label: &str) -> f32 {
        self.scores.get(label).copied().unwrap_or(0.0)
    }

    /// Sum of confidences over a label group.
    pub fn sum_of<S: AsRef<str>>(&self, labels: &[S]) -> f32 {
        labels.iter().map(|l| self.get(l.as_ref())).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.scores.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// The `n` highest-confidence labels, best first.
    pub fn top(&self, n: usize) -> Vec<(&str, f32)> {
        let mut all: Vec<(&str, f32)> = self.iter().collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1));
        all.truncate(n);
        all
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for Detections {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut detections = Detections::new();
        for (label, confidence) in iter {
            detections.insert(label, confidence);
        }
        detections
    }
}

/// One classification result, stamped with wall-clock seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub timestamp: f64,
    pub detections: Detections,
}

/// Content classifier run on the most recent analysis window.
///
/// Confidences are independent and need not sum to 1. An empty table means
/// "not ready"; errors are reported by the scheduler and treated the same way.
pub trait Classifier: Send {
    /// Called once on the worker thread before the first analysis.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn classify(&mut self, samples: &[f32], sample_rate: u32) -> Result<Detections>;
}
