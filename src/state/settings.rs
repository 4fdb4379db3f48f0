use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::processing::edna::{default_parameters, EdnaGrouper, ParameterSpec};
use crate::processing::outliers::{DetectionMethod, HandlingStrategy};

/// Defaults for outlier detection and cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierSettings {
    pub method: DetectionMethod,
    /// `None` means the method's own default.
    pub sensitivity: Option<f64>,
    pub strategy: HandlingStrategy,
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            method: DetectionMethod::Iqr,
            sensitivity: None,
            strategy: HandlingStrategy::Flag,
        }
    }
}

/// Column layout of eDNA metadata sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdnaSettings {
    pub sample_id_column: String,
    pub time_column: String,
    pub parameters: Vec<ParameterSpec>,
}

impl Default for EdnaSettings {
    fn default() -> Self {
        Self {
            sample_id_column: "sample_id".to_string(),
            time_column: "time".to_string(),
            parameters: default_parameters(),
        }
    }
}

impl EdnaSettings {
    pub fn grouper(&self) -> EdnaGrouper {
        EdnaGrouper::new(&self.time_column, self.parameters.clone())
    }
}

/// Bounds of the transform cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub max_age_days: u32,
    /// Writes between saves; 0 disables periodic saving.
    pub persist_every: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            max_age_days: 7,
            persist_every: 10,
        }
    }
}

/// Everything configurable, stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub outliers: OutlierSettings,
    pub edna: EdnaSettings,
    pub cache: CacheSettings,
}

impl Settings {
    /// Read settings from a JSON file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings: Settings = serde_json::from_str(&json)?;
        tracing::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Settings::default()), Settings::load)
    }
}
