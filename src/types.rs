use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a task or message within its collection.
pub type EntityId = u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub text: String,
    pub done: bool,
}

/// Body of `POST /tasks`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDraft {
    pub text: String,
    pub done: bool,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    pub user: String,
    pub content: String,
}

/// Body of `POST /messages`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDraft {
    pub user: String,
    pub content: String,
}

/// An element of a list resource exposed at `/{COLLECTION}`.
pub trait Entity: Clone + Send + DeserializeOwned + 'static {
    type Draft: Serialize + Send + 'static;

    const COLLECTION: &'static str;

    fn id(&self) -> EntityId;

    fn path() -> String {
        format!("/{}", Self::COLLECTION)
    }
}

impl Entity for Task {
    type Draft = TaskDraft;

    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> EntityId {
        self.id
    }
}

impl Entity for Message {
    type Draft = MessageDraft;

    const COLLECTION: &'static str = "messages";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// True when a create response carries a usable identifier.
///
/// Missing, null and zero-like ids all count as absent; the backend never
/// hands out id 0.
pub fn has_identifier(value: &Value) -> bool {
    match value.get("id") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Input is accepted only when it has something besides whitespace.
pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}
