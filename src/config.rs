use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::{properties::Timestamp, thoughtbase::MatchMode, ThoughtError};

/// Runtime behavior of a [crate::session::Session] and its driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Context matching used by sortToFront.
    pub match_mode: MatchMode,
    /// Quiet period before queued records are written to the persistence adapter.
    pub sync_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            match_mode: MatchMode::Exact,
            sync_debounce_ms: 500,
        }
    }
}

/// Progress through one onboarding helper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperState {
    pub complete: bool,
    pub snoozed_until: Option<Timestamp>,
}

/// User-facing preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dark_mode: bool,
    pub helpers: BTreeMap<String, HelperState>,
}

impl Settings {
    /// Flip dark mode, returning the new value.
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }

    pub fn complete_helper(&mut self, id: &str) {
        self.helpers.entry(id.to_string()).or_default().complete = true;
    }

    pub fn snooze_helper(&mut self, id: &str, until: Timestamp) {
        self.helpers.entry(id.to_string()).or_default().snoozed_until = Some(until);
    }

    /// A helper shows until it is completed, and not while it is snoozed.
    pub fn is_helper_visible(&self, id: &str, now: Timestamp) -> bool {
        match self.helpers.get(id) {
            None => true,
            Some(state) => !state.complete && state.snoozed_until.map_or(true, |until| now >= until),
        }
    }
}

pub trait SettingsProvider: Send + Sync {
    fn get_config(&self) -> Result<Config, ThoughtError>;
    fn set_config(&self, config: &Config) -> Result<(), ThoughtError>;
    fn get_settings(&self) -> Result<Settings, ThoughtError>;
    fn set_settings(&self, settings: &Settings) -> Result<(), ThoughtError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    config: Config,
    settings: Settings,
}

/// Stores [Config] under `[config]` and [Settings] under `[settings]` of one TOML file.
#[derive(Debug, Serialize, Deserialize)]
pub struct TomlSettingsProvider {
    path: PathBuf,
}

impl TomlSettingsProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlSettingsProvider { path }
    }

    fn read(&self) -> Result<SettingsFile, ThoughtError> {
        tracing::debug!("Attempting to read settings from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Settings file not found, using defaults.");
            return Ok(SettingsFile::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write(&self, file: &SettingsFile) -> Result<(), ThoughtError> {
        tracing::debug!("Attempting to write settings to: {:?}", &self.path);
        let toml_string = toml::to_string(file)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

impl SettingsProvider for TomlSettingsProvider {
    fn get_config(&self) -> Result<Config, ThoughtError> {
        Ok(self.read()?.config)
    }

    fn set_config(&self, config: &Config) -> Result<(), ThoughtError> {
        let mut file = self.read()?;
        file.config = config.clone();
        self.write(&file)
    }

    fn get_settings(&self) -> Result<Settings, ThoughtError> {
        Ok(self.read()?.settings)
    }

    fn set_settings(&self, settings: &Settings) -> Result<(), ThoughtError> {
        let mut file = self.read()?;
        file.settings = settings.clone();
        self.write(&file)
    }
}
