use banter_storage::{ConversationRecord, MessageRecord, MessageRole};
use snafu::Snafu;

use crate::chat::message::{Conversation, ConversationId, Message, MessageId, Sender};

/// Rejection reason for snapshots that parse but violate store invariants.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum SnapshotIntegrityError {
    #[snafu(display("conversation {id} has out-of-order message ids"))]
    OutOfOrderMessages {
        stage: &'static str,
        id: ConversationId,
    },
}

pub(crate) fn records_from_conversations(conversations: &[Conversation]) -> Vec<ConversationRecord> {
    conversations.iter().map(record_from_conversation).collect()
}

pub(crate) fn conversations_from_records(
    records: Vec<ConversationRecord>,
) -> Result<Vec<Conversation>, SnapshotIntegrityError> {
    records.into_iter().map(conversation_from_record).collect()
}

fn record_from_conversation(conversation: &Conversation) -> ConversationRecord {
    ConversationRecord {
        id: conversation.id,
        title: conversation.title.clone(),
        created_at_unix_seconds: conversation.created_at_unix_seconds,
        updated_at_unix_seconds: conversation.updated_at_unix_seconds,
        messages: conversation
            .messages
            .iter()
            .map(|message| MessageRecord {
                seq: message.id.0,
                role: role_from_sender(message.sender),
                content: message.text.clone(),
                created_at_unix_seconds: message.created_at_unix_seconds,
            })
            .collect(),
    }
}

fn conversation_from_record(
    record: ConversationRecord,
) -> Result<Conversation, SnapshotIntegrityError> {
    let mut conversation = Conversation::new(
        record.id,
        record.display_title(),
        record.created_at_unix_seconds,
    );
    conversation.updated_at_unix_seconds = record.updated_at_unix_seconds;

    let mut previous_seq = None;
    for message in record.messages {
        // Restored ids must keep the append-order invariant the allocator
        // would have produced.
        if previous_seq.is_some_and(|previous| message.seq <= previous) {
            return OutOfOrderMessagesSnafu {
                stage: "restore-conversation",
                id: record.id,
            }
            .fail();
        }
        previous_seq = Some(message.seq);

        conversation.messages.push(Message::new(
            MessageId::new(message.seq),
            sender_from_role(message.role),
            message.content,
            message.created_at_unix_seconds,
        ));
    }

    Ok(conversation)
}

fn role_from_sender(sender: Sender) -> MessageRole {
    match sender {
        Sender::User => MessageRole::User,
        Sender::Assistant => MessageRole::Assistant,
    }
}

fn sender_from_role(role: MessageRole) -> Sender {
    match role {
        MessageRole::User => Sender::User,
        MessageRole::Assistant => Sender::Assistant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::{DEFAULT_CONVERSATION_TITLE, TurnState};

    fn conversation_with_turn() -> Conversation {
        let mut conversation = Conversation::new(ConversationId::new_v7(), "Trail food", 100);
        conversation.push_message(
            Message::new(MessageId::new(1), Sender::Assistant, "Hello! How can I help you today?", 100),
            100,
        );
        conversation.push_message(
            Message::new(MessageId::new(2), Sender::User, "What should I pack?", 160),
            160,
        );
        conversation
    }

    #[test]
    fn conversations_round_trip_through_records() {
        let conversations = vec![conversation_with_turn()];

        let records = records_from_conversations(&conversations);
        let restored = conversations_from_records(records).expect("well-formed records restore");

        assert_eq!(restored, conversations);
    }

    #[test]
    fn blank_record_titles_restore_as_the_placeholder() {
        let mut record = record_from_conversation(&conversation_with_turn());
        record.title = "   ".to_string();

        let restored = conversations_from_records(vec![record]).expect("restores");
        assert_eq!(restored[0].title, DEFAULT_CONVERSATION_TITLE);
    }

    #[test]
    fn restored_conversations_are_idle() {
        let records = records_from_conversations(&[conversation_with_turn()]);

        let restored = conversations_from_records(records).expect("restores");
        assert_eq!(restored[0].turn_state, TurnState::Idle);
    }

    #[test]
    fn out_of_order_message_ids_are_rejected() {
        let mut record = record_from_conversation(&conversation_with_turn());
        record.messages[1].seq = record.messages[0].seq;

        let error = conversations_from_records(vec![record]).expect_err("duplicate ids rejected");
        assert!(matches!(
            error,
            SnapshotIntegrityError::OutOfOrderMessages { .. }
        ));
    }
}
