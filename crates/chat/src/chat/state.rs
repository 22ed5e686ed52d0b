use crate::chat::events::StoreEvent;
use crate::chat::message::{
    Conversation, ConversationId, DEFAULT_CONVERSATION_TITLE, FALLBACK_REPLY_TEXT, Message,
    MessageId, ReplyTarget, Sender, TurnId, TurnTransition, derive_title,
};

/// Tagged mutation intents.
///
/// All clocks and generated ids enter through the intent so that
/// [`StoreState::apply`] stays a pure transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreIntent {
    SetDraft {
        text: String,
    },
    SubmitDraft {
        now_unix_seconds: u64,
    },
    SettleReply {
        target: ReplyTarget,
        outcome: ReplyOutcome,
        now_unix_seconds: u64,
    },
    CreateConversation {
        id: ConversationId,
        now_unix_seconds: u64,
    },
    SwitchConversation {
        id: ConversationId,
    },
    RenameConversation {
        id: ConversationId,
        title: String,
        now_unix_seconds: u64,
    },
    DeleteConversation {
        id: ConversationId,
        /// Pre-minted id for the reseeded conversation if the list empties.
        replacement_id: ConversationId,
        now_unix_seconds: u64,
    },
}

/// How one outstanding turn resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Reply { text: String },
    Failed { details: String },
}

/// Reply request the shell must hand to the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDispatch {
    pub target: ReplyTarget,
    pub text: String,
}

/// Observable consequences of applying one intent.
///
/// Invalid intents apply to the default value: no events, nothing to
/// dispatch, no snapshot due.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    pub events: Vec<StoreEvent>,
    pub reply_request: Option<ReplyDispatch>,
    pub snapshot_due: bool,
}

/// Pure store state; every mutation flows through [`StoreState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub conversations: Vec<Conversation>,
    pub current_conversation_id: ConversationId,
    pub draft_text: String,
    pub pending_turn: Option<ReplyTarget>,
    greeting: String,
    next_message_id: u64,
    next_turn_id: u64,
}

impl StoreState {
    /// Seeds a fresh state with one greeted conversation.
    pub fn seeded(id: ConversationId, greeting: impl Into<String>, now_unix_seconds: u64) -> Self {
        let mut state = Self {
            conversations: Vec::new(),
            current_conversation_id: id,
            draft_text: String::new(),
            pending_turn: None,
            greeting: greeting.into(),
            next_message_id: 1,
            next_turn_id: 1,
        };
        state.insert_seeded_conversation(id, now_unix_seconds);
        state
    }

    /// Rebuilds state from restored conversations; the first restored
    /// conversation becomes current. Falls back to [`StoreState::seeded`]
    /// when the restored list is empty.
    pub fn restored(
        conversations: Vec<Conversation>,
        fallback_id: ConversationId,
        greeting: impl Into<String>,
        now_unix_seconds: u64,
    ) -> Self {
        let Some(first) = conversations.first() else {
            return Self::seeded(fallback_id, greeting, now_unix_seconds);
        };
        let current_conversation_id = first.id;

        let next_message_id = conversations
            .iter()
            .flat_map(|conversation| conversation.messages.iter())
            .map(|message| message.id.0)
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        Self {
            current_conversation_id,
            conversations,
            draft_text: String::new(),
            pending_turn: None,
            greeting: greeting.into(),
            next_message_id,
            next_turn_id: 1,
        }
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.pending_turn.is_some()
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == id)
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.conversation(self.current_conversation_id)
    }

    /// Applies one intent; invalid intents are no-ops, not errors.
    pub fn apply(&mut self, intent: StoreIntent) -> Applied {
        match intent {
            StoreIntent::SetDraft { text } => self.apply_set_draft(text),
            StoreIntent::SubmitDraft { now_unix_seconds } => {
                self.apply_submit_draft(now_unix_seconds)
            }
            StoreIntent::SettleReply {
                target,
                outcome,
                now_unix_seconds,
            } => self.apply_settle_reply(target, outcome, now_unix_seconds),
            StoreIntent::CreateConversation {
                id,
                now_unix_seconds,
            } => self.apply_create_conversation(id, now_unix_seconds),
            StoreIntent::SwitchConversation { id } => self.apply_switch_conversation(id),
            StoreIntent::RenameConversation {
                id,
                title,
                now_unix_seconds,
            } => self.apply_rename_conversation(id, title, now_unix_seconds),
            StoreIntent::DeleteConversation {
                id,
                replacement_id,
                now_unix_seconds,
            } => self.apply_delete_conversation(id, replacement_id, now_unix_seconds),
        }
    }

    fn apply_set_draft(&mut self, text: String) -> Applied {
        self.draft_text = text;
        Applied {
            events: vec![StoreEvent::DraftChanged],
            ..Applied::default()
        }
    }

    fn apply_submit_draft(&mut self, now_unix_seconds: u64) -> Applied {
        let text = self.draft_text.trim().to_string();
        if text.is_empty() || self.pending_turn.is_some() {
            return Applied::default();
        }

        let conversation_id = self.current_conversation_id;
        let target = ReplyTarget::new(conversation_id, self.alloc_turn_id());
        let message_id = self.alloc_message_id();

        let Some(conversation) = self.conversation_mut(conversation_id) else {
            return Applied::default();
        };
        if conversation
            .apply_turn_transition(TurnTransition::Begin(target))
            .is_err()
        {
            return Applied::default();
        }

        conversation.push_message(
            Message::new(message_id, Sender::User, text.clone(), now_unix_seconds),
            now_unix_seconds,
        );
        if conversation.has_placeholder_title() {
            conversation.title = derive_title(&text);
        }

        self.draft_text.clear();
        self.pending_turn = Some(target);

        Applied {
            events: vec![
                StoreEvent::DraftChanged,
                StoreEvent::MessageAppended { conversation_id },
                StoreEvent::TurnStarted { target },
            ],
            reply_request: Some(ReplyDispatch { target, text }),
            snapshot_due: true,
        }
    }

    fn apply_settle_reply(
        &mut self,
        target: ReplyTarget,
        outcome: ReplyOutcome,
        now_unix_seconds: u64,
    ) -> Applied {
        if self.pending_turn != Some(target) {
            return Applied::default();
        }
        self.pending_turn = None;

        let message_id = self.alloc_message_id();
        let conversation_id = target.conversation_id;
        let Some(conversation) = self.conversation_mut(conversation_id) else {
            return Applied {
                events: vec![StoreEvent::TurnSettled { target }],
                ..Applied::default()
            };
        };
        if conversation
            .apply_turn_transition(TurnTransition::Settle(target))
            .is_err()
        {
            return Applied {
                events: vec![StoreEvent::TurnSettled { target }],
                ..Applied::default()
            };
        }

        let text = match outcome {
            ReplyOutcome::Reply { text } => text,
            ReplyOutcome::Failed { .. } => FALLBACK_REPLY_TEXT.to_string(),
        };
        conversation.push_message(
            Message::new(message_id, Sender::Assistant, text, now_unix_seconds),
            now_unix_seconds,
        );

        Applied {
            events: vec![
                StoreEvent::MessageAppended { conversation_id },
                StoreEvent::TurnSettled { target },
            ],
            snapshot_due: true,
            ..Applied::default()
        }
    }

    fn apply_create_conversation(&mut self, id: ConversationId, now_unix_seconds: u64) -> Applied {
        if self.conversation(id).is_some() {
            return Applied::default();
        }

        self.insert_seeded_conversation(id, now_unix_seconds);

        Applied {
            events: vec![
                StoreEvent::ConversationCreated {
                    conversation_id: id,
                },
                StoreEvent::ConversationSelected {
                    conversation_id: id,
                },
            ],
            snapshot_due: true,
            ..Applied::default()
        }
    }

    fn apply_switch_conversation(&mut self, id: ConversationId) -> Applied {
        if id == self.current_conversation_id || self.conversation(id).is_none() {
            return Applied::default();
        }

        self.current_conversation_id = id;
        Applied {
            events: vec![StoreEvent::ConversationSelected {
                conversation_id: id,
            }],
            ..Applied::default()
        }
    }

    fn apply_rename_conversation(
        &mut self,
        id: ConversationId,
        title: String,
        now_unix_seconds: u64,
    ) -> Applied {
        let Some(conversation) = self.conversation_mut(id) else {
            return Applied::default();
        };

        let trimmed = title.trim();
        let title = if trimmed.is_empty() {
            DEFAULT_CONVERSATION_TITLE.to_string()
        } else {
            trimmed.to_string()
        };
        if conversation.title == title {
            return Applied::default();
        }

        conversation.title = title;
        conversation.updated_at_unix_seconds = now_unix_seconds;
        Applied {
            events: vec![StoreEvent::ConversationRenamed {
                conversation_id: id,
            }],
            snapshot_due: true,
            ..Applied::default()
        }
    }

    fn apply_delete_conversation(
        &mut self,
        id: ConversationId,
        replacement_id: ConversationId,
        now_unix_seconds: u64,
    ) -> Applied {
        let Some(index) = self
            .conversations
            .iter()
            .position(|conversation| conversation.id == id)
        else {
            return Applied::default();
        };
        self.conversations.remove(index);

        // An in-flight reply for the deleted conversation now has nowhere to
        // land; its late settle is rejected by the target check.
        if self
            .pending_turn
            .is_some_and(|target| target.conversation_id == id)
        {
            self.pending_turn = None;
        }

        let mut events = vec![StoreEvent::ConversationDeleted {
            conversation_id: id,
        }];

        if self.current_conversation_id == id {
            match self.conversations.first() {
                Some(first) => {
                    self.current_conversation_id = first.id;
                    events.push(StoreEvent::ConversationSelected {
                        conversation_id: first.id,
                    });
                }
                None => {
                    self.insert_seeded_conversation(replacement_id, now_unix_seconds);
                    events.push(StoreEvent::ConversationCreated {
                        conversation_id: replacement_id,
                    });
                    events.push(StoreEvent::ConversationSelected {
                        conversation_id: replacement_id,
                    });
                }
            }
        }

        Applied {
            events,
            snapshot_due: true,
            ..Applied::default()
        }
    }

    fn insert_seeded_conversation(&mut self, id: ConversationId, now_unix_seconds: u64) {
        let greeting = self.greeting.clone();
        let message_id = self.alloc_message_id();

        let mut conversation =
            Conversation::new(id, DEFAULT_CONVERSATION_TITLE, now_unix_seconds);
        conversation.push_message(
            Message::new(message_id, Sender::Assistant, greeting, now_unix_seconds),
            now_unix_seconds,
        );

        // Newest-created first; insertion order is otherwise stable.
        self.conversations.insert(0, conversation);
        self.current_conversation_id = id;
    }

    fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| conversation.id == id)
    }

    fn alloc_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id = self.next_message_id.saturating_add(1);
        id
    }

    fn alloc_turn_id(&mut self) -> TurnId {
        let id = TurnId::new(self.next_turn_id);
        self.next_turn_id = self.next_turn_id.saturating_add(1);
        id
    }
}
