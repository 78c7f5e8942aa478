use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One transcript entry in the assistant conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
}

/// The sender of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Immutable view of the transcript at one point in time.
///
/// Appending never mutates an existing snapshot, so a renderer can keep the
/// last snapshot it drew and compare with `Arc::ptr_eq` to skip redraws.
pub type Snapshot = Arc<Vec<Message>>;

/// Append-only message log for a single widget instance.
///
/// Ids are assigned here and increase monotonically, so insertion order,
/// id order, and chronological order are the same thing. There is no way
/// to edit, remove, or reorder entries.
pub struct Conversation {
    messages: Snapshot,
    next_id: u64,
    watchers: Vec<mpsc::UnboundedSender<Snapshot>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Vec::new()),
            next_id: 0,
            watchers: Vec::new(),
        }
    }

    /// Append a message and return the new snapshot.
    ///
    /// Every subscribed watcher receives the same snapshot; watchers whose
    /// receiver is gone are dropped here.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Snapshot {
        let mut next: Vec<Message> = self.messages.as_ref().clone();
        next.push(Message {
            id: self.next_id,
            role,
            content: content.into(),
        });
        self.next_id += 1;
        self.messages = Arc::new(next);

        let snapshot = self.messages.clone();
        self.watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        snapshot
    }

    pub fn snapshot(&self) -> Snapshot {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Register an observer notified with a fresh snapshot after each append.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Snapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.push(tx);
        rx
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let mut conversation = Conversation::new();
        conversation.append(Role::User, "first");
        conversation.append(Role::Assistant, "second");
        conversation.append(Role::User, "third");

        let messages = conversation.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].id < messages[1].id);
        assert!(messages[1].id < messages[2].id);
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut conversation = Conversation::new();
        conversation.append(Role::User, "question");
        conversation.append(Role::Assistant, "answer");

        let messages = conversation.messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "question");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "answer");
    }

    #[test]
    fn test_earlier_snapshot_unaffected_by_append() {
        let mut conversation = Conversation::new();
        conversation.append(Role::User, "one");
        let before = conversation.snapshot();

        conversation.append(Role::Assistant, "two");

        assert_eq!(before.len(), 1);
        assert_eq!(conversation.len(), 2);
        assert!(!Arc::ptr_eq(&before, &conversation.snapshot()));
    }

    #[test]
    fn test_is_empty() {
        let mut conversation = Conversation::new();
        assert!(conversation.is_empty());
        conversation.append(Role::User, "hello");
        assert!(!conversation.is_empty());
    }

    #[tokio::test]
    async fn test_watcher_notified_once_per_append() {
        let mut conversation = Conversation::new();
        let mut rx = conversation.subscribe();

        conversation.append(Role::User, "one");
        conversation.append(Role::Assistant, "two");

        let first = rx.try_recv().expect("first notification");
        assert_eq!(first.len(), 1);
        let second = rx.try_recv().expect("second notification");
        assert_eq!(second.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_watcher_is_pruned() {
        let mut conversation = Conversation::new();
        let rx = conversation.subscribe();
        drop(rx);

        // Must not fail or accumulate dead senders
        conversation.append(Role::User, "still fine");
        assert_eq!(conversation.len(), 1);
        assert!(conversation.watchers.is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
