//! The to-do list, in two deployments.
//!
//! [`RemoteTasks`] reads and creates through the API while toggles and
//! deletes stay in memory (the API has no endpoints for them).
//! [`LocalTasks`] keeps everything in the durable store instead.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::collection::{Collection, SyncState, decode_snapshot};
use super::remote::RemoteCollection;
use crate::client::Transport;
use crate::store::StoreHandle;
use crate::types::{EntityId, Task, TaskDraft, is_blank};

/// Durable-store key holding the JSON task list of the local deployment.
pub const TASKS_KEY: &str = "tasks";

pub trait TaskSynchronizer {
    /// Start fetching the full list; it replaces whatever is held.
    fn load(&mut self);

    /// Submit `input` as a new task. Blank input is rejected and left as is;
    /// otherwise the buffer is cleared whatever the outcome.
    fn add(&mut self, input: &mut String) -> bool;

    /// Flip `done` on the task with `id`.
    fn toggle(&mut self, id: EntityId) -> bool;

    fn remove(&mut self, id: EntityId) -> bool;

    /// Forget the list at the end of a session.
    fn reset(&mut self);

    fn tasks(&self) -> &[Task];

    fn state(&self) -> SyncState;

    fn apply_pending(&mut self);

    fn settle(&mut self) -> impl Future<Output = ()> + Send;
}

fn toggled(task: &Task) -> Task {
    Task {
        done: !task.done,
        ..task.clone()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskMode {
    /// Tasks live on the server (toggles and deletes are not sent)
    #[default]
    Remote,
    /// Tasks live only in the local durable store
    Local,
}

pub struct RemoteTasks {
    inner: RemoteCollection<Task>,
}

impl RemoteTasks {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: RemoteCollection::new(transport),
        }
    }
}

impl TaskSynchronizer for RemoteTasks {
    fn load(&mut self) {
        self.inner.load();
    }

    fn add(&mut self, input: &mut String) -> bool {
        if is_blank(input) {
            return false;
        }
        let text = std::mem::take(input);
        self.inner.create(TaskDraft::new(text));
        true
    }

    fn toggle(&mut self, id: EntityId) -> bool {
        self.inner.update_local(id, toggled)
    }

    fn remove(&mut self, id: EntityId) -> bool {
        self.inner.delete_local(id)
    }

    fn reset(&mut self) {
        self.inner.clear();
    }

    fn tasks(&self) -> &[Task] {
        self.inner.items()
    }

    fn state(&self) -> SyncState {
        self.inner.state()
    }

    fn apply_pending(&mut self) {
        self.inner.apply_pending();
    }

    async fn settle(&mut self) {
        self.inner.settle().await;
    }
}

/// Task list persisted as JSON under [`TASKS_KEY`] after every change.
pub struct LocalTasks {
    store: StoreHandle,
    collection: Collection<Task>,
    last_id: EntityId,
}

impl LocalTasks {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            collection: Collection::new(),
            last_id: 0,
        }
    }

    /// Millisecond timestamp, bumped past the last id when the clock has
    /// not moved on. `None` once no larger id is left.
    fn next_id(&mut self) -> Option<EntityId> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = if now > self.last_id {
            now
        } else {
            self.last_id.checked_add(1)?
        };
        self.last_id = id;
        Some(id)
    }

    fn persist(&self) {
        let result = serde_json::to_string(self.collection.items())
            .map_err(crate::store::StoreError::from)
            .and_then(|json| self.store.set(TASKS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist tasks: {e}");
        }
    }
}

impl TaskSynchronizer for LocalTasks {
    fn load(&mut self) {
        self.collection.begin_load();
        let items = match self.store.get(TASKS_KEY) {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => decode_snapshot::<Task>(value),
                Err(e) => {
                    tracing::error!("Stored task list is not JSON: {e}");
                    Vec::new()
                }
            },
        };
        if let Some(max) = items.iter().map(|t| t.id).max() {
            self.last_id = self.last_id.max(max);
        }
        self.collection.replace(items);
    }

    fn add(&mut self, input: &mut String) -> bool {
        if is_blank(input) {
            return false;
        }
        let Some(id) = self.next_id() else {
            tracing::warn!("No task id left above {}", self.last_id);
            return false;
        };
        let task = Task {
            id,
            text: std::mem::take(input),
            done: false,
        };
        self.collection.append(task);
        self.persist();
        true
    }

    fn toggle(&mut self, id: EntityId) -> bool {
        let hit = self.collection.update(id, toggled);
        if hit {
            self.persist();
        }
        hit
    }

    fn remove(&mut self, id: EntityId) -> bool {
        let hit = self.collection.remove(id);
        if hit {
            self.persist();
        }
        hit
    }

    fn reset(&mut self) {
        self.collection.clear();
        if let Err(e) = self.store.remove(TASKS_KEY) {
            tracing::warn!("Failed to clear stored tasks: {e}");
        }
    }

    fn tasks(&self) -> &[Task] {
        self.collection.items()
    }

    fn state(&self) -> SyncState {
        self.collection.state()
    }

    fn apply_pending(&mut self) {}

    async fn settle(&mut self) {}
}

/// The task synchronizer chosen for this deployment.
pub enum TaskBackend {
    Remote(RemoteTasks),
    Local(LocalTasks),
}

impl TaskBackend {
    pub fn new(mode: TaskMode, transport: Arc<dyn Transport>, store: StoreHandle) -> Self {
        match mode {
            TaskMode::Remote => TaskBackend::Remote(RemoteTasks::new(transport)),
            TaskMode::Local => TaskBackend::Local(LocalTasks::new(store)),
        }
    }

    pub fn mode(&self) -> TaskMode {
        match self {
            TaskBackend::Remote(_) => TaskMode::Remote,
            TaskBackend::Local(_) => TaskMode::Local,
        }
    }
}

macro_rules! delegate {
    ($self:ident, $t:ident => $body:expr) => {
        match $self {
            TaskBackend::Remote($t) => $body,
            TaskBackend::Local($t) => $body,
        }
    };
}

impl TaskSynchronizer for TaskBackend {
    fn load(&mut self) {
        delegate!(self, t => t.load())
    }

    fn add(&mut self, input: &mut String) -> bool {
        delegate!(self, t => t.add(input))
    }

    fn toggle(&mut self, id: EntityId) -> bool {
        delegate!(self, t => t.toggle(id))
    }

    fn remove(&mut self, id: EntityId) -> bool {
        delegate!(self, t => t.remove(id))
    }

    fn reset(&mut self) {
        delegate!(self, t => t.reset())
    }

    fn tasks(&self) -> &[Task] {
        delegate!(self, t => t.tasks())
    }

    fn state(&self) -> SyncState {
        delegate!(self, t => t.state())
    }

    fn apply_pending(&mut self) {
        delegate!(self, t => t.apply_pending())
    }

    async fn settle(&mut self) {
        delegate!(self, t => t.settle().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::sync::mock::MockTransport;
    use serde_json::json;

    fn task(id: EntityId, text: &str, done: bool) -> Task {
        Task {
            id,
            text: text.to_string(),
            done,
        }
    }

    #[tokio::test]
    async fn blank_add_issues_no_call() {
        let mock = MockTransport::new();
        let mut tasks = RemoteTasks::new(mock.clone());
        let mut input = "   ".to_string();

        assert!(!tasks.add(&mut input));
        tasks.settle().await;

        assert!(mock.calls().is_empty());
        assert!(tasks.tasks().is_empty());
        assert_eq!(input, "   ");
    }

    #[tokio::test]
    async fn add_appends_server_canonical_task() {
        let mock = MockTransport::new();
        mock.push(Ok(json!({"id": 99, "text": "write report", "done": false})));
        let mut tasks = RemoteTasks::new(mock.clone());
        let mut input = "write report".to_string();

        assert!(tasks.add(&mut input));
        assert!(input.is_empty());
        tasks.settle().await;

        assert_eq!(tasks.tasks(), &[task(99, "write report", false)]);
        assert_eq!(mock.bodies(), vec![json!({"text": "write report", "done": false})]);
    }

    #[tokio::test]
    async fn add_with_id_seven_lands_last() {
        let mock = MockTransport::new();
        mock.push(Ok(json!([{"id": 1, "text": "buy milk", "done": false}])));
        mock.push(Ok(json!({"id": 7, "text": "call bob", "done": false})));
        let mut tasks = RemoteTasks::new(mock.clone());

        tasks.load();
        tasks.settle().await;
        tasks.add(&mut "call bob".to_string());
        tasks.settle().await;

        assert_eq!(tasks.tasks().len(), 2);
        assert_eq!(tasks.tasks().last(), Some(&task(7, "call bob", false)));
    }

    #[tokio::test]
    async fn add_without_id_or_with_failure_leaves_list() {
        let mock = MockTransport::new();
        mock.push(Ok(json!({"text": "lost", "done": false})));
        mock.push(Err(ClientError::Network("connection reset".into())));
        let mut tasks = RemoteTasks::new(mock.clone());

        let mut input = "lost".to_string();
        tasks.add(&mut input);
        tasks.settle().await;
        assert!(tasks.tasks().is_empty());
        assert!(input.is_empty());

        let mut input = "also lost".to_string();
        tasks.add(&mut input);
        tasks.settle().await;
        assert!(tasks.tasks().is_empty());
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn remote_toggle_and_remove_stay_local() {
        let mock = MockTransport::new();
        mock.push(Ok(json!([
            {"id": 1, "text": "a", "done": false},
            {"id": 2, "text": "b", "done": false},
            {"id": 3, "text": "c", "done": true},
        ])));
        let mut tasks = RemoteTasks::new(mock.clone());
        tasks.load();
        tasks.settle().await;

        assert!(tasks.toggle(2));
        assert_eq!(
            tasks.tasks(),
            &[task(1, "a", false), task(2, "b", true), task(3, "c", true)]
        );
        assert!(tasks.remove(1));
        assert_eq!(tasks.tasks().len(), 2);
        tasks.settle().await;
        assert_eq!(mock.calls(), vec!["GET /tasks".to_string()]);
    }

    #[tokio::test]
    async fn local_tasks_persist_every_change() {
        let store = StoreHandle::in_memory();
        let mut tasks = LocalTasks::new(store.clone());
        tasks.load();
        assert_eq!(tasks.state(), SyncState::Populated);

        tasks.add(&mut "buy milk".to_string());
        tasks.add(&mut "walk dog".to_string());
        let first = tasks.tasks()[0].id;
        let second = tasks.tasks()[1].id;
        assert!(second > first);
        tasks.toggle(first);

        let mut reloaded = LocalTasks::new(store.clone());
        reloaded.load();
        assert_eq!(
            reloaded.tasks(),
            &[task(first, "buy milk", true), task(second, "walk dog", false)]
        );

        reloaded.remove(first);
        let mut again = LocalTasks::new(store);
        again.load();
        assert_eq!(again.tasks(), &[task(second, "walk dog", false)]);
    }

    #[test]
    fn local_ids_increase_past_loaded_ones() {
        let store = StoreHandle::in_memory();
        let far_future = u64::MAX / 2;
        store
            .set(TASKS_KEY, &json!([{"id": far_future, "text": "x", "done": false}]).to_string())
            .unwrap();
        let mut tasks = LocalTasks::new(store);
        tasks.load();
        tasks.add(&mut "y".to_string());
        assert_eq!(tasks.tasks()[1].id, far_future + 1);
    }

    #[test]
    fn no_local_id_left_above_max() {
        let store = StoreHandle::in_memory();
        store
            .set(TASKS_KEY, &json!([{"id": u64::MAX, "text": "x", "done": false}]).to_string())
            .unwrap();
        let mut tasks = LocalTasks::new(store);
        tasks.load();
        let mut input = "y".to_string();
        assert!(!tasks.add(&mut input));
        assert_eq!(input, "y");
        assert_eq!(tasks.tasks().len(), 1);
    }

    #[test]
    fn local_reset_drops_stored_list() {
        let store = StoreHandle::in_memory();
        let mut tasks = LocalTasks::new(store.clone());
        tasks.load();
        tasks.add(&mut "x".to_string());
        assert!(store.get(TASKS_KEY).is_some());

        tasks.reset();
        assert!(tasks.tasks().is_empty());
        assert_eq!(tasks.state(), SyncState::Empty);
        assert_eq!(store.get(TASKS_KEY), None);
    }

    #[test]
    fn corrupt_local_list_loads_empty() {
        let store = StoreHandle::in_memory();
        store.set(TASKS_KEY, "{not json").unwrap();
        let mut tasks = LocalTasks::new(store);
        tasks.load();
        assert!(tasks.tasks().is_empty());
    }

    #[test]
    fn backend_follows_mode() {
        let store = StoreHandle::in_memory();
        let backend = TaskBackend::new(TaskMode::Local, MockTransport::new(), store);
        assert_eq!(backend.mode(), TaskMode::Local);
    }
}
