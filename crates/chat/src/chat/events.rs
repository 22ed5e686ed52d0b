use tokio::sync::mpsc;

use crate::chat::message::{ConversationId, ReplyTarget};

/// Notification published after a mutation changes observable state.
///
/// The store has no rendering concern; view layers subscribe and re-read
/// whatever slice of the snapshot they care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DraftChanged,
    MessageAppended { conversation_id: ConversationId },
    TurnStarted { target: ReplyTarget },
    TurnSettled { target: ReplyTarget },
    ConversationCreated { conversation_id: ConversationId },
    ConversationSelected { conversation_id: ConversationId },
    ConversationRenamed { conversation_id: ConversationId },
    ConversationDeleted { conversation_id: ConversationId },
}

/// Subscription handle draining store notifications in publish order.
pub struct StoreEvents {
    events: mpsc::UnboundedReceiver<StoreEvent>,
}

impl StoreEvents {
    pub(crate) fn new(events: mpsc::UnboundedReceiver<StoreEvent>) -> Self {
        Self { events }
    }

    /// Waits for the next notification; `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Drains one already-queued notification without waiting.
    pub fn try_recv(&mut self) -> Option<StoreEvent> {
        self.events.try_recv().ok()
    }
}
