use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::SEED_GREETING;

pub const SETTINGS_DIRECTORY_NAME: &str = "banter";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SNAPSHOT_FILE_NAME: &str = "conversations.json";

/// Tunable store behavior persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding the conversation snapshot; defaults to the platform
    /// config directory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_responder_delay_ms")]
    pub responder_delay_ms: u64,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            responder_delay_ms: default_responder_delay_ms(),
            greeting: default_greeting(),
        }
    }
}

impl StoreSettings {
    pub fn responder_delay(&self) -> Duration {
        Duration::from_millis(self.responder_delay_ms)
    }

    /// Resolves the conversation snapshot path.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(SettingsStore::default_config_dir)
            .join(SNAPSHOT_FILE_NAME)
    }

    pub fn normalized(mut self) -> Self {
        self.greeting = self.greeting.trim().to_string();
        if self.greeting.is_empty() {
            self.greeting = default_greeting();
        }
        self
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<StoreSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".banter"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<StoreSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: StoreSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &PathBuf) -> StoreSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
            return StoreSettings::default();
        }

        let figment =
            Figment::from(Serialized::defaults(StoreSettings::default())).merge(Json::file(path));

        match figment.extract::<StoreSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                StoreSettings::default()
            }
        }
    }

    fn persist(&self, settings: &StoreSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_responder_delay_ms() -> u64 {
    banter_responder::DEFAULT_REPLY_DELAY.as_millis() as u64
}

fn default_greeting() -> String {
    SEED_GREETING.to_string()
}
