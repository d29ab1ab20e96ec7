use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::Strategy;
use crate::recognizer::VisionConfig;

pub const CONFIG_FILE: &str = "cookbook_indexer";
pub const ENV_PREFIX: &str = "COOKBOOK";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no API key: pass --api-key or set OPENAI_API_KEY or COOKBOOK_API_KEY")]
    MissingApiKey,
    #[error("output path {} exists and is not a directory", .0.display())]
    OutputNotDirectory(PathBuf),
    #[error("could not load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub output_dir: PathBuf,
    pub source: String,
    pub status: String,
    pub strategy: Strategy,
    /// Pause between consecutive recognition calls.
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: None,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 1000,
            output_dir: PathBuf::from("recipes"),
            source: "Unknown Cookbook".to_string(),
            status: "to-try".to_string(),
            strategy: Strategy::default(),
            request_delay_ms: 2000,
            request_timeout_secs: 120,
        }
    }
}

impl Settings {
    /// Defaults, then `cookbook_indexer.toml` if present, then `COOKBOOK_*` env vars.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(CONFIG_FILE, ENV_PREFIX)
    }

    fn load_from(file: &str, env_prefix: &str) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Checks that must pass before anything is fetched. The API key is
    /// checked separately by `vision_config`, page capture does not need it.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(SettingsError::OutputNotDirectory(self.output_dir.clone()));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn vision_config(&self) -> Result<VisionConfig, SettingsError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(SettingsError::MissingApiKey)?;
        Ok(VisionConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

// ── Tests ──
