use serde_json::Value;

use crate::error::ClientResult;
use crate::types::{Entity, EntityId, has_identifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Empty,
    Loading,
    Populated,
}

/// Ordered in-memory mirror of a list resource.
#[derive(Debug)]
pub struct Collection<T> {
    items: Vec<T>,
    state: SyncState,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            state: SyncState::Empty,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn begin_load(&mut self) {
        self.state = SyncState::Loading;
    }

    /// Full replace with a fresh snapshot; nothing is merged.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.state = SyncState::Populated;
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
        if self.state == SyncState::Empty {
            self.state = SyncState::Populated;
        }
    }

    /// Rebuilds the sequence with every element matching `id` passed through
    /// `f`. Returns whether anything matched.
    pub fn update(&mut self, id: EntityId, mut f: impl FnMut(&T) -> T) -> bool {
        let mut hit = false;
        let next = self
            .items
            .iter()
            .map(|item| {
                if item.id() == id {
                    hit = true;
                    f(item)
                } else {
                    item.clone()
                }
            })
            .collect();
        self.items = next;
        hit
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.items.len();
        let next: Vec<T> = self
            .items
            .iter()
            .filter(|item| item.id() != id)
            .cloned()
            .collect();
        self.items = next;
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items = Vec::new();
        self.state = SyncState::Empty;
    }
}

/// Interpret a list response. Anything but an array of well-formed entities
/// yields an empty list.
pub fn decode_snapshot<T: Entity>(value: Value) -> Vec<T> {
    match value {
        Value::Array(_) => match serde_json::from_value(value) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(collection = T::COLLECTION, "Discarding malformed list: {e}");
                Vec::new()
            }
        },
        other => {
            tracing::warn!(
                collection = T::COLLECTION,
                "Expected a JSON array, got {}",
                kind(&other)
            );
            Vec::new()
        }
    }
}

/// Interpret a create response: `Ok(None)` when no identifier came back.
pub fn decode_created<T: Entity>(value: Value) -> ClientResult<Option<T>> {
    if !has_identifier(&value) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Task;
    use serde_json::json;

    fn task(id: EntityId, text: &str, done: bool) -> Task {
        Task {
            id,
            text: text.to_string(),
            done,
        }
    }

    #[test]
    fn non_sequence_snapshots_are_empty() {
        for value in [json!({}), json!(null), json!("tasks"), json!(3)] {
            assert!(decode_snapshot::<Task>(value).is_empty());
        }
        assert!(decode_snapshot::<Task>(json!([{"nope": true}])).is_empty());
    }

    #[test]
    fn snapshot_keeps_order() {
        let items: Vec<Task> = decode_snapshot(json!([
            {"id": 2, "text": "b", "done": true},
            {"id": 1, "text": "a", "done": false},
        ]));
        assert_eq!(items, vec![task(2, "b", true), task(1, "a", false)]);
    }

    #[test]
    fn created_without_id() {
        let created: Option<Task> = decode_created(json!({"text": "x", "done": false})).unwrap();
        assert!(created.is_none());
        assert!(decode_created::<Task>(json!({"id": 5, "text": 1})).is_err());
    }

    #[test]
    fn update_touches_only_the_match() {
        let mut c = Collection::new();
        c.replace(vec![task(1, "a", false), task(2, "b", false), task(3, "c", true)]);
        assert!(c.update(2, |t| Task { done: !t.done, ..t.clone() }));
        assert_eq!(
            c.items(),
            &[task(1, "a", false), task(2, "b", true), task(3, "c", true)]
        );
        assert!(!c.update(42, |t| t.clone()));
    }

    #[test]
    fn state_transitions() {
        let mut c: Collection<Task> = Collection::new();
        assert_eq!(c.state(), SyncState::Empty);
        c.begin_load();
        assert_eq!(c.state(), SyncState::Loading);
        c.replace(vec![task(1, "a", false)]);
        assert_eq!(c.state(), SyncState::Populated);
        assert!(c.remove(1));
        assert!(!c.remove(1));
        assert_eq!(c.state(), SyncState::Populated);
        c.clear();
        assert_eq!(c.state(), SyncState::Empty);
    }
}
