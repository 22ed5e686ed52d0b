use std::io::{self, BufRead, Write};
use std::sync::Arc;

use banter::chat::{ChatStore, Sender, StoreEvent, StoreEvents};
use banter::settings::SettingsStore;
use banter_responder::EchoResponder;
use banter_storage::JsonSnapshotStore;

/// Line-oriented driver for the conversation store.
///
/// Each stdin line is sent as a user message and the loop blocks until the
/// echoed reply settles. Slash commands manage conversations:
/// `/new`, `/list`, `/switch <n>`, `/rename <title>`, `/delete`, `/quit`.
fn main() {
    tracing_subscriber::fmt::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start tokio runtime");

    let settings_store = SettingsStore::load();
    let settings = settings_store.settings();

    let responder = Arc::new(EchoResponder::new(settings.responder_delay()));
    let sink = Arc::new(JsonSnapshotStore::new(settings.snapshot_path()));

    // The store captures the runtime it is opened on for its background tasks.
    let (store, mut events) = runtime.block_on(async {
        let store = ChatStore::open(&settings, responder, sink);
        let events = store.subscribe();
        (store, events)
    });

    print_thread(&store);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim();

        match line {
            "" => {}
            "/quit" => break,
            "/new" => {
                store.create_conversation();
                print_thread(&store);
            }
            "/list" => print_conversations(&store),
            "/delete" => {
                store.delete_conversation(store.current_conversation_id());
                print_thread(&store);
            }
            _ if line.starts_with("/switch ") => {
                switch_by_index(&store, line.trim_start_matches("/switch ").trim());
                print_thread(&store);
            }
            _ if line.starts_with("/rename ") => {
                store.rename_conversation(
                    store.current_conversation_id(),
                    line.trim_start_matches("/rename ").trim(),
                );
            }
            _ if line.starts_with('/') => {
                println!("unknown command: {line}");
            }
            message => {
                store.set_draft_text(message);
                store.send_message();
                if store.is_waiting_for_reply() {
                    runtime.block_on(wait_for_settle(&mut events));
                }
                print_thread(&store);
            }
        }
    }
}

async fn wait_for_settle(events: &mut StoreEvents) {
    while let Some(event) = events.recv().await {
        if matches!(event, StoreEvent::TurnSettled { .. }) {
            return;
        }
    }
}

fn switch_by_index(store: &ChatStore, raw: &str) {
    let summaries = store.conversation_summaries();
    match raw.parse::<usize>() {
        Ok(index) if (1..=summaries.len()).contains(&index) => {
            store.switch_conversation(summaries[index - 1].id);
        }
        _ => println!("expected a conversation number between 1 and {}", summaries.len()),
    }
}

fn print_thread(store: &ChatStore) {
    let snapshot = store.snapshot();
    let title = snapshot
        .conversations
        .iter()
        .find(|summary| summary.id == snapshot.current_conversation_id)
        .map(|summary| summary.title.clone())
        .unwrap_or_default();

    println!("--- {title} ---");
    for message in &snapshot.messages {
        let speaker = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "assistant",
        };
        println!("[{speaker}] {}", message.text);
    }
}

fn print_conversations(store: &ChatStore) {
    let current = store.current_conversation_id();
    for (index, summary) in store.conversation_summaries().iter().enumerate() {
        let marker = if summary.id == current { "*" } else { " " };
        let preview = summary.last_message.as_deref().unwrap_or("");
        println!(
            "{marker} {}. {} ({} messages) {}",
            index + 1,
            summary.title,
            summary.message_count,
            preview
        );
    }
}
