use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::infrastructure::capture_encoder::CaptureConfig;
use crate::detection::domain::detection_smoother::SmootherConfig;
use crate::pipeline::detection_loop::LoopConfig;
use crate::shared::constants::{
    ANALYZE_PATH, DEFAULT_ENDPOINT_BASE, DEFAULT_REQUEST_TIMEOUT_SECS, FEEDBACK_PATH,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub analyze_url: String,
    pub feedback_url: String,
    pub timeout_secs: u64,
    /// Most recent corrections sent with each request; unlimited if unset.
    pub max_corrections: Option<usize>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            analyze_url: format!("{DEFAULT_ENDPOINT_BASE}{ANALYZE_PATH}"),
            feedback_url: format!("{DEFAULT_ENDPOINT_BASE}{FEEDBACK_PATH}"),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_corrections: None,
        }
    }
}

impl ClassifierSettings {
    /// Points both URLs at a different server root.
    pub fn with_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.analyze_url = format!("{base}{ANALYZE_PATH}");
        self.feedback_url = format!("{base}{FEEDBACK_PATH}");
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub smoother: SmootherConfig,
    pub detection: LoopConfig,
    pub capture: CaptureConfig,
    pub classifier: ClassifierSettings,
}

impl Settings {
    /// `<config dir>/MoodCam/settings.json`.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("MoodCam").join("settings.json"))
    }

    /// User settings, or defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring settings: {e}");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
