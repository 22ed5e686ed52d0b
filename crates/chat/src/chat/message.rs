pub use banter_storage::ConversationId;
pub use banter_storage::DEFAULT_CONVERSATION_TITLE;

/// Assistant greeting seeded into every new conversation.
pub const SEED_GREETING: &str = "Hello! How can I help you today?";

/// Appended in place of a reply when the responder fails.
pub const FALLBACK_REPLY_TEXT: &str = "Sorry, something went wrong. Please try again.";

/// Derived titles are clipped to this many characters.
pub const TITLE_MAX_CHARS: usize = 50;

/// Stable identifier for one message; allocated in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one user-prompt/assistant-reply exchange.
///
/// This must change on every submit so a stale settle can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl TurnId {
    /// Creates a typed turn identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Reply routing key used to file a settled reply under the conversation
/// captured at submit time, never under whatever is current on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTarget {
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
}

impl ReplyTarget {
    /// Builds a full reply target from conversation and turn ids.
    pub const fn new(conversation_id: ConversationId, turn_id: TurnId) -> Self {
        Self {
            conversation_id,
            turn_id,
        }
    }
}

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Assistant,
}

/// Core immutable message model; append-only once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    pub created_at_unix_seconds: u64,
}

impl Message {
    pub fn new(
        id: MessageId,
        sender: Sender,
        text: impl Into<String>,
        created_at_unix_seconds: u64,
    ) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            created_at_unix_seconds,
        }
    }
}

/// Conversation aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at_unix_seconds: u64,
    pub updated_at_unix_seconds: u64,
    pub turn_state: TurnState,
}

impl Conversation {
    /// Creates an empty conversation in idle state.
    pub fn new(id: ConversationId, title: impl Into<String>, created_at_unix_seconds: u64) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at_unix_seconds,
            updated_at_unix_seconds: created_at_unix_seconds,
            turn_state: TurnState::Idle,
        }
    }

    /// Appends a message and refreshes the activity timestamp.
    pub fn push_message(&mut self, message: Message, now_unix_seconds: u64) {
        self.messages.push(message);
        self.updated_at_unix_seconds = now_unix_seconds;
    }

    /// Returns true while the title has not yet been derived or renamed.
    pub fn has_placeholder_title(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }

    /// Applies a deterministic turn transition.
    pub fn apply_turn_transition(&mut self, transition: TurnTransition) -> TurnTransitionResult {
        let next_state = self.turn_state.apply(transition)?;
        self.turn_state = next_state;
        Ok(next_state)
    }
}

/// Derives a conversation title from the first user message.
pub fn derive_title(text: &str) -> String {
    let trimmed = text.trim();
    let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

/// Turn lifecycle boundary for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    AwaitingReply(ReplyTarget),
}

/// State transition input for the turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransition {
    Begin(ReplyTarget),
    Settle(ReplyTarget),
}

/// Rejection reason for illegal turn transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTransitionRejection {
    AlreadyAwaiting {
        active: ReplyTarget,
        attempted: ReplyTarget,
    },
    NoPendingTurn,
    TurnMismatch {
        active: ReplyTarget,
        attempted: ReplyTarget,
    },
}

/// Result type for turn transition application.
pub type TurnTransitionResult = Result<TurnState, TurnTransitionRejection>;

impl TurnState {
    /// Returns the outstanding target if and only if a reply is pending.
    pub fn pending_target(&self) -> Option<ReplyTarget> {
        match self {
            Self::AwaitingReply(target) => Some(*target),
            Self::Idle => None,
        }
    }

    /// Returns true when a settling reply matches the outstanding turn.
    pub fn accepts_settle(&self, target: ReplyTarget) -> bool {
        matches!(self, Self::AwaitingReply(active) if *active == target)
    }

    /// Applies one transition deterministically.
    ///
    /// `Begin` is legal only from idle; `Settle` must match the outstanding
    /// turn exactly.
    pub fn apply(&self, transition: TurnTransition) -> TurnTransitionResult {
        match transition {
            TurnTransition::Begin(target) => self.apply_begin(target),
            TurnTransition::Settle(target) => self.apply_settle(target),
        }
    }

    fn apply_begin(&self, target: ReplyTarget) -> TurnTransitionResult {
        match self {
            Self::AwaitingReply(active) => Err(TurnTransitionRejection::AlreadyAwaiting {
                active: *active,
                attempted: target,
            }),
            Self::Idle => Ok(Self::AwaitingReply(target)),
        }
    }

    fn apply_settle(&self, target: ReplyTarget) -> TurnTransitionResult {
        match self {
            Self::AwaitingReply(active) if *active == target => Ok(Self::Idle),
            Self::AwaitingReply(active) => Err(TurnTransitionRejection::TurnMismatch {
                active: *active,
                attempted: target,
            }),
            Self::Idle => Err(TurnTransitionRejection::NoPendingTurn),
        }
    }
}
