pub mod error;
pub mod ids;
pub mod json;
pub mod memory;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use ids::ConversationId;
pub use json::JsonSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use types::{ConversationRecord, DEFAULT_CONVERSATION_TITLE, MessageRecord, MessageRole};

/// Best-effort whole-state snapshot persistence.
///
/// `load` returns `None` when no snapshot exists yet. `save` replaces any
/// previous snapshot wholesale; writes are unordered beyond last-write-wins
/// and callers treat failures as non-fatal.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> StorageResult<Option<Vec<ConversationRecord>>>;

    fn save(&self, conversations: &[ConversationRecord]) -> StorageResult<()>;
}
