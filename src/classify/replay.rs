use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::detections::{Classifier, Detections};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Cycles(Vec<Detections>),
    Wrapped { cycles: Vec<Detections>, #[serde(default)] repeat: bool },
}

/// Plays back pre-recorded detection tables, one per analysis cycle.
///
/// Stands in for a real model when driving the loop from the command line.
/// Once the script is exhausted it either starts over or keeps returning the
/// last table.
pub struct ScriptedClassifier {
    cycles: Vec<Detections>,
    repeat: bool,
    next: usize,
}

impl ScriptedClassifier {
    pub fn new(cycles: Vec<Detections>, repeat: bool) -> Self {
        Self {
            cycles,
            repeat,
            next: 0,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read detection script: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse detection script: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let (cycles, repeat) = match serde_json::from_str::<ScriptFile>(content)? {
            ScriptFile::Cycles(cycles) => (cycles, false),
            ScriptFile::Wrapped { cycles, repeat } => (cycles, repeat),
        };
        log::info!("Loaded detection script with {} cycles", cycles.len());
        Ok(Self::new(cycles, repeat))
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<Detections> {
        if self.cycles.is_empty() {
            return Ok(Detections::new());
        }
        let idx = if self.next < self.cycles.len() {
            self.next
        } else if self.repeat {
            self.next % self.cycles.len()
        } else {
            self.cycles.len() - 1
        };
        self.next += 1;
        Ok(self.cycles[idx].clone())
    }
}
