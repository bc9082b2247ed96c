use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::client::Transport;
use crate::error::{ClientError, ClientResult};
use crate::types::EntityId;

/// Scripted transport: answers GET/POST from one queue and DELETE from
/// another, recording every call as `"METHOD path"`.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ClientResult<Value>>>,
    deletes: Mutex<VecDeque<ClientResult<()>>>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: ClientResult<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_delete(&self, response: ClientResult<()>) {
        self.deletes.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    fn next(&self) -> ClientResult<Value> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("no scripted response".into())))
    }
}

impl Transport for MockTransport {
    fn get(&self, path: &str) -> ClientResult<Value> {
        self.calls.lock().unwrap().push(format!("GET {path}"));
        self.next()
    }

    fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        self.calls.lock().unwrap().push(format!("POST {path}"));
        self.bodies.lock().unwrap().push(body);
        self.next()
    }

    fn delete(&self, path: &str, id: EntityId) -> ClientResult<()> {
        self.calls.lock().unwrap().push(format!("DELETE {path}?id={id}"));
        self.deletes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("no scripted response".into())))
    }
}
