use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::SnapshotStore;
use crate::error::{
    CreateSnapshotDirectorySnafu, ParseSnapshotSnafu, ReadSnapshotSnafu, ReplaceSnapshotSnafu,
    SerializeSnapshotSnafu, StorageResult, WriteSnapshotSnafu,
};
use crate::types::ConversationRecord;

/// File-backed snapshot store writing pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> StorageResult<Option<Vec<ConversationRecord>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path).context(ReadSnapshotSnafu {
            stage: "read-snapshot",
            path: self.path.clone(),
        })?;
        let records = serde_json::from_str(&raw).context(ParseSnapshotSnafu {
            stage: "parse-snapshot",
            path: self.path.clone(),
        })?;
        Ok(Some(records))
    }

    fn save(&self, conversations: &[ConversationRecord]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateSnapshotDirectorySnafu {
                stage: "create-snapshot-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let serialized =
            serde_json::to_string_pretty(conversations).context(SerializeSnapshotSnafu {
                stage: "serialize-snapshot",
            })?;

        // Write a sibling temp file first so a crash can never truncate the live snapshot.
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, serialized).context(WriteSnapshotSnafu {
            stage: "write-temporary-snapshot",
            path: temp_path.clone(),
        })?;
        std::fs::rename(&temp_path, &self.path).context(ReplaceSnapshotSnafu {
            stage: "replace-snapshot",
            from: temp_path,
            to: self.path.clone(),
        })?;
        Ok(())
    }
}
