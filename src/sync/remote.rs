use std::sync::Arc;

use serde_json::Value;
use tokio::task::{JoinError, JoinSet};

use super::collection::{Collection, SyncState, decode_created, decode_snapshot};
use crate::client::Transport;
use crate::error::ClientResult;
use crate::types::{Entity, EntityId};

/// Result of one background call, applied later on the owning thread.
enum Outcome {
    Loaded(ClientResult<Value>),
    Created(ClientResult<Value>),
    Deleted(EntityId, ClientResult<()>),
}

/// A collection mirrored from `/{T::COLLECTION}`.
///
/// Calls are fire-and-forget: each one runs as a blocking job and nothing is
/// cancelled, retried or de-duplicated. Outcomes take effect only through
/// [`apply_pending`](Self::apply_pending) or [`settle`](Self::settle), in
/// completion order. Must be driven from inside a Tokio runtime.
pub struct RemoteCollection<T: Entity> {
    transport: Arc<dyn Transport>,
    collection: Collection<T>,
    jobs: JoinSet<Outcome>,
}

impl<T: Entity> RemoteCollection<T> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            collection: Collection::new(),
            jobs: JoinSet::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        self.collection.items()
    }

    pub fn state(&self) -> SyncState {
        self.collection.state()
    }

    /// Number of calls whose outcome has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    fn spawn(&mut self, job: impl FnOnce(&dyn Transport) -> Outcome + Send + 'static) {
        let transport = Arc::clone(&self.transport);
        self.jobs.spawn_blocking(move || job(transport.as_ref()));
    }

    pub fn load(&mut self) {
        self.collection.begin_load();
        let path = T::path();
        self.spawn(move |t| Outcome::Loaded(t.get(&path)));
    }

    pub fn create(&mut self, draft: T::Draft) {
        let body = match serde_json::to_value(draft) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(collection = T::COLLECTION, "Failed to encode draft: {e}");
                return;
            }
        };
        let path = T::path();
        self.spawn(move |t| Outcome::Created(t.post(&path, body)));
    }

    /// Ask the server to delete `id`; the local copy goes only once it agrees.
    pub fn delete_remote(&mut self, id: EntityId) {
        let path = T::path();
        self.spawn(move |t| Outcome::Deleted(id, t.delete(&path, id)));
    }

    pub fn delete_local(&mut self, id: EntityId) -> bool {
        self.collection.remove(id)
    }

    pub fn update_local(&mut self, id: EntityId, f: impl FnMut(&T) -> T) -> bool {
        self.collection.update(id, f)
    }

    pub fn clear(&mut self) {
        self.collection.clear();
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.jobs.try_join_next() {
            self.apply(result);
            applied += 1;
        }
        applied
    }

    /// Wait for all outstanding calls and apply their outcomes.
    pub async fn settle(&mut self) {
        while let Some(result) = self.jobs.join_next().await {
            self.apply(result);
        }
    }

    fn apply(&mut self, result: Result<Outcome, JoinError>) {
        let collection = T::COLLECTION;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(collection, "Background call did not finish: {e}");
                return;
            }
        };

        match outcome {
            Outcome::Loaded(Ok(value)) => {
                let items = decode_snapshot(value);
                tracing::debug!(collection, count = items.len(), "Loaded snapshot");
                self.collection.replace(items);
            }
            Outcome::Loaded(Err(e)) => {
                tracing::error!(collection, "Failed to load: {e}");
                self.collection.replace(Vec::new());
            }
            Outcome::Created(Ok(value)) => match decode_created::<T>(value) {
                Ok(Some(item)) => {
                    tracing::debug!(collection, id = item.id(), "Created");
                    self.collection.append(item);
                }
                Ok(None) => {
                    tracing::warn!(collection, "Create response carried no id; not added");
                }
                Err(e) => tracing::error!(collection, "Failed to create: {e}"),
            },
            Outcome::Created(Err(e)) => tracing::error!(collection, "Failed to create: {e}"),
            Outcome::Deleted(id, Ok(())) => {
                self.collection.remove(id);
                tracing::info!(collection, id, "Deleted");
            }
            Outcome::Deleted(id, Err(e)) => {
                tracing::error!(collection, id, "Failed to delete: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::sync::mock::MockTransport;
    use crate::types::{Task, TaskDraft};
    use serde_json::json;

    fn remote(mock: &Arc<MockTransport>) -> RemoteCollection<Task> {
        RemoteCollection::new(mock.clone())
    }

    #[tokio::test]
    async fn load_replaces_snapshot() {
        let mock = MockTransport::new();
        mock.push(Ok(json!([{"id": 1, "text": "buy milk", "done": false}])));
        let mut tasks = remote(&mock);

        tasks.load();
        assert_eq!(tasks.state(), SyncState::Loading);
        tasks.settle().await;

        assert_eq!(tasks.state(), SyncState::Populated);
        assert_eq!(
            tasks.items(),
            &[Task {
                id: 1,
                text: "buy milk".into(),
                done: false
            }]
        );
        assert_eq!(mock.calls(), vec!["GET /tasks".to_string()]);
    }

    #[tokio::test]
    async fn load_failures_fall_back_to_empty() {
        let mock = MockTransport::new();
        mock.push(Ok(json!([{"id": 1, "text": "a", "done": false}])));
        mock.push(Ok(json!({})));
        mock.push(Ok(json!(null)));
        mock.push(Err(ClientError::Network("connection refused".into())));
        let mut tasks = remote(&mock);

        tasks.load();
        tasks.settle().await;
        assert_eq!(tasks.items().len(), 1);

        for _ in 0..3 {
            tasks.load();
            tasks.settle().await;
            assert!(tasks.items().is_empty());
            assert_eq!(tasks.state(), SyncState::Populated);
        }
    }

    #[tokio::test]
    async fn duplicate_creates_are_not_deduplicated() {
        let mock = MockTransport::new();
        mock.push(Ok(json!({"id": 1, "text": "x", "done": false})));
        mock.push(Ok(json!({"id": 2, "text": "x", "done": false})));
        let mut tasks = remote(&mock);

        tasks.create(TaskDraft::new("x"));
        tasks.create(TaskDraft::new("x"));
        assert_eq!(tasks.in_flight(), 2);
        tasks.settle().await;

        assert_eq!(tasks.items().len(), 2);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn outcomes_wait_for_apply() {
        let mock = MockTransport::new();
        mock.push(Ok(json!({"id": 3, "text": "x", "done": false})));
        let mut tasks = remote(&mock);

        tasks.create(TaskDraft::new("x"));
        assert!(tasks.items().is_empty());
        while tasks.in_flight() > 0 {
            tasks.apply_pending();
            tokio::task::yield_now().await;
        }
        assert_eq!(tasks.items().len(), 1);
    }
}
