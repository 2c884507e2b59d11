use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::delay::DelayRange;
use crate::engine::SequenceTiming;
use crate::feedback::{FeedbackMode, DEFAULT_GEMINI_MODEL};

pub const MAX_LIGHTS: u8 = 10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("light count must be between 1 and {max}, got {0}", max = MAX_LIGHTS)]
    LightCount(u8),
    #[error("{name} range is inverted: {min_ms}..={max_ms}")]
    InvertedRange {
        name: &'static str,
        min_ms: u64,
        max_ms: u64,
    },
    #[error("frame interval must be at least 1ms")]
    FrameInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub light_count: u8,
    pub pre_sequence_delay_ms: u64,
    pub light_interval_ms: DelayRange,
    pub lights_out_wait_ms: DelayRange,
    pub frame_interval_ms: u64,
    pub feedback: FeedbackMode,
    pub gemini_model: String,
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        let timing = SequenceTiming::default();
        Self {
            light_count: timing.light_count,
            pre_sequence_delay_ms: timing.pre_sequence_delay_ms,
            light_interval_ms: timing.light_interval,
            lights_out_wait_ms: timing.lights_out_wait,
            frame_interval_ms: 16,
            feedback: FeedbackMode::Engineer,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            history: true,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LIGHTS).contains(&self.light_count) {
            return Err(ConfigError::LightCount(self.light_count));
        }
        for (name, range) in [
            ("light interval", self.light_interval_ms),
            ("lights-out wait", self.lights_out_wait_ms),
        ] {
            if !range.is_valid() {
                return Err(ConfigError::InvertedRange {
                    name,
                    min_ms: range.min_ms,
                    max_ms: range.max_ms,
                });
            }
        }
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::FrameInterval);
        }
        Ok(())
    }

    pub fn timing(&self) -> SequenceTiming {
        SequenceTiming {
            light_count: self.light_count,
            pre_sequence_delay_ms: self.pre_sequence_delay_ms,
            light_interval: self.light_interval_ms,
            lights_out_wait: self.lights_out_wait_ms,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("reflx_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };

        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(%e, path = %self.path.display(), "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
