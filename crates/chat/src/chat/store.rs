use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use banter_responder::{ReplyRequest, Responder};
use banter_storage::{ConversationRecord, SnapshotStore};

use crate::chat::events::{StoreEvent, StoreEvents};
use crate::chat::message::{Conversation, ConversationId, Message};
use crate::chat::snapshot;
use crate::chat::state::{ReplyDispatch, ReplyOutcome, StoreIntent, StoreState};
use crate::settings::StoreSettings;

/// Read-only view of the store at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub conversations: Vec<ConversationSummary>,
    pub current_conversation_id: ConversationId,
    /// Messages of the current conversation, in append order.
    pub messages: Vec<Message>,
    pub draft_text: String,
    pub is_waiting_for_reply: bool,
}

/// Sidebar-level digest of one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub created_at_unix_seconds: u64,
    pub updated_at_unix_seconds: u64,
    pub message_count: usize,
    pub last_message: Option<String>,
    pub last_message_at_unix_seconds: Option<u64>,
}

struct StoreShared {
    state: Mutex<StoreState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<StoreEvent>>>,
    responder: Arc<dyn Responder>,
    snapshot_queue: mpsc::UnboundedSender<Vec<ConversationRecord>>,
    runtime: Handle,
}

/// Handle to the conversation store.
///
/// Cheap to clone; every clone addresses the same state. Constructed once per
/// application instance and passed to consumers explicitly rather than held
/// in any ambient global.
#[derive(Clone)]
pub struct ChatStore {
    shared: Arc<StoreShared>,
}

impl ChatStore {
    /// Opens the store, seeding state from the snapshot sink.
    ///
    /// An absent, unreadable, or invalid snapshot falls back to one greeted
    /// conversation. Must be called from within a Tokio runtime: reply tasks
    /// and snapshot writes are spawned onto the runtime captured here.
    pub fn open(
        settings: &StoreSettings,
        responder: Arc<dyn Responder>,
        sink: Arc<dyn SnapshotStore>,
    ) -> Self {
        let now = unix_now_seconds();
        let greeting = settings.greeting.clone();

        let state = match sink.load() {
            Ok(Some(records)) => match snapshot::conversations_from_records(records) {
                Ok(conversations) => {
                    StoreState::restored(conversations, ConversationId::new_v7(), greeting, now)
                }
                Err(error) => {
                    tracing::warn!("snapshot violates store invariants, starting fresh: {error}");
                    StoreState::seeded(ConversationId::new_v7(), greeting, now)
                }
            },
            Ok(None) => StoreState::seeded(ConversationId::new_v7(), greeting, now),
            Err(error) => {
                tracing::warn!("failed to load snapshot, starting fresh: {error}");
                StoreState::seeded(ConversationId::new_v7(), greeting, now)
            }
        };

        let runtime = Handle::current();
        let (snapshot_queue, queue) = mpsc::unbounded_channel();
        spawn_snapshot_writer(&runtime, sink, queue);

        Self {
            shared: Arc::new(StoreShared {
                state: Mutex::new(state),
                subscribers: Mutex::new(Vec::new()),
                responder,
                snapshot_queue,
                runtime,
            }),
        }
    }

    /// Replaces the draft text verbatim; allowed in any state.
    pub fn set_draft_text(&self, text: impl Into<String>) {
        self.dispatch(StoreIntent::SetDraft { text: text.into() });
    }

    /// Submits the current draft as a user message and requests a reply.
    ///
    /// A blank draft, or a submit while a reply is outstanding, is a no-op.
    pub fn send_message(&self) {
        self.dispatch(StoreIntent::SubmitDraft {
            now_unix_seconds: unix_now_seconds(),
        });
    }

    /// Starts a new greeted conversation and makes it current.
    ///
    /// A reply pending in another conversation keeps running; it settles into
    /// the conversation captured when it was requested.
    pub fn create_conversation(&self) -> ConversationId {
        let id = ConversationId::new_v7();
        self.dispatch(StoreIntent::CreateConversation {
            id,
            now_unix_seconds: unix_now_seconds(),
        });
        id
    }

    /// Makes `id` current if it names an existing conversation; no-op otherwise.
    pub fn switch_conversation(&self, id: ConversationId) {
        self.dispatch(StoreIntent::SwitchConversation { id });
    }

    /// Renames a conversation; a blank title resets it to the placeholder.
    pub fn rename_conversation(&self, id: ConversationId, title: impl Into<String>) {
        self.dispatch(StoreIntent::RenameConversation {
            id,
            title: title.into(),
            now_unix_seconds: unix_now_seconds(),
        });
    }

    /// Deletes a conversation and its messages; unknown ids are a no-op.
    pub fn delete_conversation(&self, id: ConversationId) {
        self.dispatch(StoreIntent::DeleteConversation {
            id,
            replacement_id: ConversationId::new_v7(),
            now_unix_seconds: unix_now_seconds(),
        });
    }

    /// Captures the full read model in one consistent view.
    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock_state();
        StoreSnapshot {
            conversations: state.conversations.iter().map(summarize).collect(),
            current_conversation_id: state.current_conversation_id,
            messages: state
                .current_conversation()
                .map(|conversation| conversation.messages.clone())
                .unwrap_or_default(),
            draft_text: state.draft_text.clone(),
            is_waiting_for_reply: state.is_waiting_for_reply(),
        }
    }

    pub fn conversation_summaries(&self) -> Vec<ConversationSummary> {
        self.lock_state()
            .conversations
            .iter()
            .map(summarize)
            .collect()
    }

    pub fn current_conversation_id(&self) -> ConversationId {
        self.lock_state().current_conversation_id
    }

    /// Messages of the current conversation, in append order.
    pub fn current_messages(&self) -> Vec<Message> {
        self.lock_state()
            .current_conversation()
            .map(|conversation| conversation.messages.clone())
            .unwrap_or_default()
    }

    pub fn draft_text(&self) -> String {
        self.lock_state().draft_text.clone()
    }

    pub fn is_waiting_for_reply(&self) -> bool {
        self.lock_state().is_waiting_for_reply()
    }

    /// Subscribes to change notifications, delivered in mutation order.
    pub fn subscribe(&self) -> StoreEvents {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        StoreEvents::new(receiver)
    }

    fn dispatch(&self, intent: StoreIntent) {
        let reply_request = {
            let mut state = self.lock_state();
            let applied = state.apply(intent);

            // Snapshots are queued and events published under the state lock
            // so both observe mutations in application order.
            if applied.snapshot_due {
                let records = snapshot::records_from_conversations(&state.conversations);
                if self.shared.snapshot_queue.send(records).is_err() {
                    tracing::error!("snapshot writer is gone; dropping snapshot write");
                }
            }
            self.publish(&applied.events);
            applied.reply_request
        };

        if let Some(dispatch) = reply_request {
            self.spawn_reply_task(dispatch);
        }
    }

    fn publish(&self, events: &[StoreEvent]) {
        if events.is_empty() {
            return;
        }

        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| {
            events
                .iter()
                .all(|event| subscriber.send(event.clone()).is_ok())
        });
    }

    fn spawn_reply_task(&self, dispatch: ReplyDispatch) {
        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            let outcome = match shared
                .responder
                .respond(ReplyRequest::new(dispatch.text))
                .await
            {
                Ok(reply) => ReplyOutcome::Reply { text: reply.text },
                Err(error) => {
                    tracing::warn!("responder failed, substituting the fallback reply: {error}");
                    ReplyOutcome::Failed {
                        details: error.to_string(),
                    }
                }
            };

            ChatStore { shared }.dispatch(StoreIntent::SettleReply {
                target: dispatch.target,
                outcome,
                now_unix_seconds: unix_now_seconds(),
            });
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drains queued snapshots one at a time so writes land in mutation order.
fn spawn_snapshot_writer(
    runtime: &Handle,
    sink: Arc<dyn SnapshotStore>,
    mut queue: mpsc::UnboundedReceiver<Vec<ConversationRecord>>,
) {
    runtime.spawn(async move {
        while let Some(mut records) = queue.recv().await {
            // Coalesce bursts so only the newest snapshot hits disk.
            while let Ok(newer) = queue.try_recv() {
                records = newer;
            }

            let sink = Arc::clone(&sink);
            match tokio::task::spawn_blocking(move || sink.save(&records)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!("failed to write conversation snapshot: {error}");
                }
                Err(error) => {
                    tracing::error!("snapshot write task failed: {error}");
                }
            }
        }
    });
}

fn summarize(conversation: &Conversation) -> ConversationSummary {
    let last = conversation.messages.last();
    ConversationSummary {
        id: conversation.id,
        title: conversation.title.clone(),
        created_at_unix_seconds: conversation.created_at_unix_seconds,
        updated_at_unix_seconds: conversation.updated_at_unix_seconds,
        message_count: conversation.messages.len(),
        last_message: last.map(|message| message.text.clone()),
        last_message_at_unix_seconds: last.map(|message| message.created_at_unix_seconds),
    }
}

fn unix_now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{FALLBACK_REPLY_TEXT, SEED_GREETING, Sender};
    use banter_responder::{
        BoxFuture, EchoResponder, Reply, ReplyRequest, ResponderError, ResponderResult,
    };
    use banter_storage::MemorySnapshotStore;
    use tokio::sync::oneshot;

    const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Responder that refuses every request.
    struct FailingResponder;

    impl Responder for FailingResponder {
        fn respond<'a>(&'a self, _request: ReplyRequest) -> BoxFuture<'a, ResponderResult<Reply>> {
            Box::pin(async {
                Err(ResponderError::Unavailable {
                    stage: "respond",
                    details: "backend is down".to_string(),
                })
            })
        }
    }

    /// Responder that holds its reply until the test releases it.
    struct GatedResponder {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl GatedResponder {
        fn new() -> (Arc<Self>, oneshot::Sender<()>) {
            let (release, gate) = oneshot::channel();
            (
                Arc::new(Self {
                    gate: Mutex::new(Some(gate)),
                }),
                release,
            )
        }
    }

    impl Responder for GatedResponder {
        fn respond<'a>(&'a self, request: ReplyRequest) -> BoxFuture<'a, ResponderResult<Reply>> {
            let gate = self
                .gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok(Reply::new(format!(
                    "I received your message: \"{}\"",
                    request.text
                )))
            })
        }
    }

    fn open_with(responder: Arc<dyn Responder>) -> (ChatStore, Arc<MemorySnapshotStore>) {
        let sink = Arc::new(MemorySnapshotStore::new());
        let store = ChatStore::open(&StoreSettings::default(), responder, sink.clone());
        (store, sink)
    }

    async fn wait_for_settle(events: &mut StoreEvents) {
        tokio::time::timeout(SETTLE_TIMEOUT, async {
            while let Some(event) = events.recv().await {
                if matches!(event, StoreEvent::TurnSettled { .. }) {
                    return;
                }
            }
            panic!("store dropped before the turn settled");
        })
        .await
        .expect("turn settles within the timeout");
    }

    async fn wait_for_snapshot_messages(sink: &MemorySnapshotStore, count: usize) {
        tokio::time::timeout(SETTLE_TIMEOUT, async {
            loop {
                let total = sink
                    .load()
                    .expect("memory sink never fails")
                    .map(|records| {
                        records
                            .iter()
                            .map(|record| record.messages.len())
                            .sum::<usize>()
                    })
                    .unwrap_or(0);
                if total >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("snapshot write lands within the timeout");
    }

    #[tokio::test]
    async fn greeting_scenario_runs_one_full_turn() {
        let (responder, release) = GatedResponder::new();
        let (store, _sink) = open_with(responder);
        let mut events = store.subscribe();

        let before = store.snapshot();
        assert_eq!(before.messages.len(), 1);
        assert_eq!(before.messages[0].text, SEED_GREETING);

        store.set_draft_text("Hi");
        store.send_message();

        let during = store.snapshot();
        assert_eq!(during.messages.len(), 2);
        assert!(during.is_waiting_for_reply);
        assert_eq!(during.draft_text, "");
        // The title derives immediately on send, before the reply lands.
        assert_eq!(during.conversations[0].title, "Hi");

        release.send(()).expect("responder is waiting on the gate");
        wait_for_settle(&mut events).await;

        let after = store.snapshot();
        assert_eq!(after.messages.len(), 3);
        assert_eq!(after.messages[2].sender, Sender::Assistant);
        assert_eq!(after.messages[2].text, "I received your message: \"Hi\"");
        assert!(!after.is_waiting_for_reply);
    }

    #[tokio::test]
    async fn responder_failure_substitutes_the_fallback_reply() {
        let (store, _sink) = open_with(Arc::new(FailingResponder));
        let mut events = store.subscribe();

        store.set_draft_text("Hi");
        store.send_message();
        wait_for_settle(&mut events).await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.messages[2].text, FALLBACK_REPLY_TEXT);
        assert!(!snapshot.is_waiting_for_reply);
    }

    #[tokio::test]
    async fn switching_mid_wait_files_the_reply_under_the_original_conversation() {
        let (responder, release) = GatedResponder::new();
        let (store, _sink) = open_with(responder);
        let mut events = store.subscribe();

        let original = store.current_conversation_id();
        store.set_draft_text("question");
        store.send_message();

        let other = store.create_conversation();
        assert_eq!(store.current_conversation_id(), other);
        assert!(store.is_waiting_for_reply());

        release.send(()).expect("responder is waiting on the gate");
        wait_for_settle(&mut events).await;

        store.switch_conversation(original);
        let messages = store.current_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].text, "I received your message: \"question\"");

        store.switch_conversation(other);
        assert_eq!(store.current_messages().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_sends_while_waiting_are_no_ops() {
        let (responder, release) = GatedResponder::new();
        let (store, _sink) = open_with(responder);
        let mut events = store.subscribe();

        store.set_draft_text("first");
        store.send_message();
        store.set_draft_text("second");
        store.send_message();

        assert_eq!(store.current_messages().len(), 2);
        assert_eq!(store.draft_text(), "second");

        release.send(()).expect("responder is waiting on the gate");
        wait_for_settle(&mut events).await;

        assert_eq!(store.current_messages().len(), 3);
    }

    #[tokio::test]
    async fn state_survives_a_reopen_through_the_sink() {
        let responder = Arc::new(EchoResponder::new(Duration::from_millis(5)));
        let sink = Arc::new(MemorySnapshotStore::new());

        let store = ChatStore::open(&StoreSettings::default(), responder.clone(), sink.clone());
        let mut events = store.subscribe();
        store.set_draft_text("remember me");
        store.send_message();
        wait_for_settle(&mut events).await;
        wait_for_snapshot_messages(&sink, 3).await;
        let before = store.snapshot();
        drop(store);

        let reopened = ChatStore::open(&StoreSettings::default(), responder, sink);
        let after = reopened.snapshot();

        assert_eq!(after.conversations.len(), before.conversations.len());
        assert_eq!(after.current_conversation_id, before.current_conversation_id);
        assert_eq!(after.messages, before.messages);
        assert!(!after.is_waiting_for_reply);
    }

    #[tokio::test]
    async fn corrupt_sink_data_falls_back_to_the_default_seed() {
        use banter_storage::{ConversationRecord, MessageRecord, MessageRole};

        let sink = Arc::new(MemorySnapshotStore::new());
        // Duplicate message ids violate the append-order invariant.
        sink.save(&[ConversationRecord {
            id: banter_storage::ConversationId::new_v7(),
            title: "broken".to_string(),
            created_at_unix_seconds: 1,
            updated_at_unix_seconds: 1,
            messages: vec![
                MessageRecord {
                    seq: 1,
                    role: MessageRole::User,
                    content: "a".to_string(),
                    created_at_unix_seconds: 1,
                },
                MessageRecord {
                    seq: 1,
                    role: MessageRole::Assistant,
                    content: "b".to_string(),
                    created_at_unix_seconds: 1,
                },
            ],
        }])
        .expect("memory sink never fails");

        let store = ChatStore::open(
            &StoreSettings::default(),
            Arc::new(EchoResponder::default()),
            sink,
        );

        let snapshot = store.snapshot();
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].text, SEED_GREETING);
    }

    #[tokio::test]
    async fn summaries_expose_the_last_message_preview() {
        let responder = Arc::new(EchoResponder::new(Duration::from_millis(5)));
        let (store, _sink) = open_with(responder);
        let mut events = store.subscribe();

        store.set_draft_text("ping");
        store.send_message();
        wait_for_settle(&mut events).await;

        let summaries = store.conversation_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 3);
        assert_eq!(
            summaries[0].last_message.as_deref(),
            Some("I received your message: \"ping\"")
        );
    }

    #[tokio::test]
    async fn events_arrive_in_mutation_order() {
        let (responder, _release) = GatedResponder::new();
        let (store, _sink) = open_with(responder);
        let mut events = store.subscribe();

        store.set_draft_text("Hi");
        store.send_message();

        assert_eq!(events.recv().await, Some(StoreEvent::DraftChanged));
        assert_eq!(events.recv().await, Some(StoreEvent::DraftChanged));
        assert!(matches!(
            events.recv().await,
            Some(StoreEvent::MessageAppended { .. })
        ));
        assert!(matches!(
            events.recv().await,
            Some(StoreEvent::TurnStarted { .. })
        ));
    }
}
