use std::sync::Arc;

use super::collection::SyncState;
use super::remote::RemoteCollection;
use crate::client::Transport;
use crate::types::{EntityId, Message, MessageDraft, is_blank};

/// The shared chat log. Messages are appended once the server has assigned
/// them an id and removed once the server confirms a delete.
pub struct MessageLog {
    inner: RemoteCollection<Message>,
}

impl MessageLog {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: RemoteCollection::new(transport),
        }
    }

    pub fn load(&mut self) {
        self.inner.load();
    }

    /// Post `input` as `user`. Blank input is rejected and left untouched,
    /// anything else clears the buffer immediately.
    pub fn send(&mut self, user: &str, input: &mut String) -> bool {
        if is_blank(input) {
            return false;
        }
        let draft = MessageDraft {
            user: user.to_string(),
            content: std::mem::take(input),
        };
        self.inner.create(draft);
        true
    }

    pub fn delete(&mut self, id: EntityId) {
        tracing::debug!(id, "Deleting message");
        self.inner.delete_remote(id);
    }

    pub fn messages(&self) -> &[Message] {
        self.inner.items()
    }

    pub fn state(&self) -> SyncState {
        self.inner.state()
    }

    pub fn apply_pending(&mut self) {
        self.inner.apply_pending();
    }

    pub async fn settle(&mut self) {
        self.inner.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::sync::mock::MockTransport;
    use serde_json::json;

    async fn loaded(mock: &Arc<MockTransport>) -> MessageLog {
        mock.push(Ok(json!([
            {"id": 1, "user": "ana", "content": "hi"},
            {"id": 2, "user": "bo", "content": "hey"},
        ])));
        let mut log = MessageLog::new(mock.clone());
        log.load();
        log.settle().await;
        log
    }

    #[tokio::test]
    async fn send_stamps_username() {
        let mock = MockTransport::new();
        mock.push(Ok(json!({"id": 4, "user": "ana", "content": "hello"})));
        let mut log = MessageLog::new(mock.clone());

        let mut input = "hello".to_string();
        assert!(log.send("ana", &mut input));
        assert!(input.is_empty());
        log.settle().await;

        assert_eq!(mock.bodies(), vec![json!({"user": "ana", "content": "hello"})]);
        assert_eq!(
            log.messages(),
            &[Message {
                id: 4,
                user: "ana".into(),
                content: "hello".into()
            }]
        );
    }

    #[tokio::test]
    async fn blank_send_is_rejected() {
        let mock = MockTransport::new();
        let mut log = MessageLog::new(mock.clone());
        assert!(!log.send("ana", &mut "\n ".to_string()));
        log.settle().await;
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_waits_for_server() {
        let mock = MockTransport::new();
        let mut log = loaded(&mock).await;
        mock.push_delete(Ok(()));

        log.delete(1);
        assert_eq!(log.messages().len(), 2);
        log.settle().await;

        assert_eq!(log.messages().len(), 1);
        assert_eq!(log.messages()[0].id, 2);
        assert!(mock.calls().contains(&"DELETE /messages?id=1".to_string()));
    }

    #[tokio::test]
    async fn rejected_delete_keeps_message() {
        let mock = MockTransport::new();
        let mut log = loaded(&mock).await;
        mock.push_delete(Err(ClientError::Status(404)));
        mock.push_delete(Err(ClientError::Network("timed out".into())));

        log.delete(1);
        log.delete(2);
        log.settle().await;

        assert_eq!(log.messages().len(), 2);
    }
}
