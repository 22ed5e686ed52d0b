use std::sync::{Mutex, PoisonError};

use crate::SnapshotStore;
use crate::error::StorageResult;
use crate::types::ConversationRecord;

/// Snapshot store that keeps the latest snapshot in process memory.
///
/// Used for ephemeral sessions that should not touch disk, and as a cheap
/// stand-in for the file store in tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<Vec<ConversationRecord>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> StorageResult<Option<Vec<ConversationRecord>>> {
        Ok(self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, conversations: &[ConversationRecord]) -> StorageResult<()> {
        *self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(conversations.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ConversationId;

    #[test]
    fn starts_empty_and_keeps_the_last_write() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.load().expect("load never fails"), None);

        let first = vec![ConversationRecord {
            id: ConversationId::new_v7(),
            title: "First".to_string(),
            created_at_unix_seconds: 1,
            updated_at_unix_seconds: 1,
            messages: Vec::new(),
        }];
        let second = vec![ConversationRecord {
            id: ConversationId::new_v7(),
            title: "Second".to_string(),
            created_at_unix_seconds: 2,
            updated_at_unix_seconds: 2,
            messages: Vec::new(),
        }];

        store.save(&first).expect("save never fails");
        store.save(&second).expect("save never fails");
        assert_eq!(store.load().expect("load never fails"), Some(second));
    }
}
