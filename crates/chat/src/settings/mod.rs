mod state;

pub use state::{
    SETTINGS_DIRECTORY_NAME, SETTINGS_FILE_NAME, SNAPSHOT_FILE_NAME, SettingsError, SettingsStore,
    StoreSettings,
};
