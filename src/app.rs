//! The client context: one session plus the two synchronized lists.

use std::sync::Arc;

use crate::client::Transport;
use crate::session::{Session, SessionStore};
use crate::store::StoreHandle;
use crate::sync::{MessageLog, SyncState, TaskBackend, TaskMode, TaskSynchronizer};
use crate::types::{EntityId, Message, Task};

pub struct Client {
    session: Session,
    tasks: TaskBackend,
    messages: MessageLog,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, store: StoreHandle, mode: TaskMode) -> Self {
        Self {
            session: Session::new(SessionStore::new(store.clone())),
            tasks: TaskBackend::new(mode, Arc::clone(&transport), store),
            messages: MessageLog::new(transport),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.session.username()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.messages()
    }

    pub fn task_mode(&self) -> TaskMode {
        self.tasks.mode()
    }

    /// True while either list is still waiting for its snapshot.
    pub fn is_loading(&self) -> bool {
        self.tasks.state() == SyncState::Loading || self.messages.state() == SyncState::Loading
    }

    /// Log in and start loading both lists. Blank names are ignored.
    pub fn login(&mut self, name: &str) -> bool {
        if !self.session.login(name) {
            return false;
        }
        self.load();
        true
    }

    /// Pick up a persisted session at startup, loading both lists if found.
    pub fn restore(&mut self) -> bool {
        if !self.session.restore() {
            return false;
        }
        self.load();
        true
    }

    /// Ends the session and drops the task list. The chat log is kept.
    pub fn logout(&mut self) {
        self.session.logout();
        self.tasks.reset();
    }

    fn load(&mut self) {
        self.tasks.load();
        self.messages.load();
    }

    pub fn reload(&mut self) {
        if self.is_authenticated() {
            self.load();
        }
    }

    pub fn add_task(&mut self, input: &mut String) -> bool {
        self.is_authenticated() && self.tasks.add(input)
    }

    pub fn toggle_task(&mut self, id: EntityId) -> bool {
        self.tasks.toggle(id)
    }

    pub fn remove_task(&mut self, id: EntityId) -> bool {
        self.tasks.remove(id)
    }

    pub fn send_message(&mut self, input: &mut String) -> bool {
        let Some(user) = self.session.username() else {
            return false;
        };
        self.messages.send(user, input)
    }

    pub fn delete_message(&mut self, id: EntityId) {
        self.messages.delete(id);
    }

    /// Apply whatever calls have finished so far without waiting on the rest.
    pub fn apply_pending(&mut self) {
        self.tasks.apply_pending();
        self.messages.apply_pending();
    }

    /// Wait for every outstanding call and apply its outcome.
    pub async fn settle(&mut self) {
        self.tasks.settle().await;
        self.messages.settle().await;
    }
}
