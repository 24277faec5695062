//! Named profile catalog and classifier label mapping.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::types::EqProfile;
use crate::error::ConfigError;

pub const DEFAULT_PROFILE: &str = "default";
pub const SPEECH_PROFILE: &str = "Speech";
pub const MOVIE_PROFILE: &str = "Movie";
pub const MUSIC_PROFILE: &str = "Music";

const BUILTIN_CATALOG: &str = include_str!("../../profiles/catalog.toml");

/// Labels whose confidences are summed into the broad categories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelGroups {
    #[serde(default)]
    pub speech: Vec<String>,
    #[serde(default)]
    pub movie: Vec<String>,
    #[serde(default)]
    pub music: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    aggregates: LabelGroups,
    profiles: BTreeMap<String, EqProfile>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

/// Immutable profile catalog, shared by reference once loaded.
#[derive(Debug)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, EqProfile>,
    labels: HashMap<String, String>,
    groups: LabelGroups,
}

impl ProfileCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Arc<ProfileCatalog> {
        static CATALOG: OnceLock<Arc<ProfileCatalog>> = OnceLock::new();
        CATALOG
            .get_or_init(|| match Self::from_toml(BUILTIN_CATALOG) {
                Ok(catalog) => Arc::new(catalog),
                Err(err) => panic!("built-in profile catalog is invalid: {}", err),
            })
            .clone()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile catalog: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid profile catalog: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(content)?;
        let profiles = file
            .profiles
            .into_iter()
            .map(|(key, mut profile)| {
                profile.key = key.clone();
                (key, profile)
            })
            .collect();
        let catalog = Self {
            profiles,
            labels: file.labels,
            groups: file.aggregates,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.profiles.contains_key(DEFAULT_PROFILE) {
            return Err(ConfigError::MissingProfile(DEFAULT_PROFILE.into()));
        }
        for (label, profile) in &self.labels {
            if !self.profiles.contains_key(profile) {
                return Err(ConfigError::UnknownProfile {
                    label: label.clone(),
                    profile: profile.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&EqProfile> {
        self.profiles.get(key)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &EqProfile> {
        self.profiles.values()
    }

    /// Profile a classifier label maps to, if any.
    pub fn profile_for_label(&self, label: &str) -> Option<&str> {
        self.labels.get(label).map(String::as_str)
    }

    pub fn groups(&self) -> &LabelGroups {
        &self.groups
    }

    /// Whether a profile key is one of the broad categories rather than a genre.
    pub fn is_broad_category(key: &str) -> bool {
        matches!(key, SPEECH_PROFILE | MOVIE_PROFILE | MUSIC_PROFILE | DEFAULT_PROFILE)
    }
}
