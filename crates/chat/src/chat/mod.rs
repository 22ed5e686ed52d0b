/// Notification contracts for store subscribers.
pub mod events;
/// Domain entities and the deterministic turn state boundary.
pub mod message;
mod snapshot;
mod state;
mod store;

pub use events::{StoreEvent, StoreEvents};
pub use message::{
    Conversation, ConversationId, DEFAULT_CONVERSATION_TITLE, FALLBACK_REPLY_TEXT, Message,
    MessageId, ReplyTarget, SEED_GREETING, Sender, TITLE_MAX_CHARS, TurnId, TurnState,
    TurnTransition, TurnTransitionRejection, TurnTransitionResult, derive_title,
};
pub use state::{Applied, ReplyDispatch, ReplyOutcome, StoreIntent, StoreState};
pub use store::{ChatStore, ConversationSummary, StoreSnapshot};
