//! HTTP access to the task/message API.
//!
//! Responses are handed back as raw JSON so the synchronizers can decide
//! what counts as a well-formed snapshot or a created entity.

use crate::error::{ClientError, ClientResult};
use crate::types::EntityId;
use serde_json::Value;

/// The three verbs the collection resources understand.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, path: &str) -> ClientResult<Value>;

    fn post(&self, path: &str, body: Value) -> ClientResult<Value>;

    /// `DELETE {path}?id={id}`; any non-2xx answer is an error.
    fn delete(&self, path: &str, id: EntityId) -> ClientResult<()>;
}

/// Blocking `ureq` transport rooted at a fixed base URL.
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn read_json(response: ureq::Response) -> ClientResult<Value> {
    let text = response
        .into_string()
        .map_err(|e| ClientError::Network(format!("Failed to read response: {e}")))?;
    serde_json::from_str(&text).map_err(|e| ClientError::Malformed(e.to_string()))
}

fn ensure_success(response: &ureq::Response) -> ClientResult<()> {
    if response.status() < 200 || response.status() >= 300 {
        return Err(ClientError::Status(response.status()));
    }
    Ok(())
}

impl Transport for HttpTransport {
    fn get(&self, path: &str) -> ClientResult<Value> {
        let response = self.agent.get(&self.url(path)).call()?;
        ensure_success(&response)?;
        read_json(response)
    }

    fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        let response = self.agent.post(&self.url(path)).send_json(body)?;
        ensure_success(&response)?;
        read_json(response)
    }

    fn delete(&self, path: &str, id: EntityId) -> ClientResult<()> {
        let response = self
            .agent
            .delete(&self.url(path))
            .query("id", &id.to_string())
            .call()?;
        ensure_success(&response)
    }
}

/// Build a transport from `localhost:8080` or a full `http(s)://` URL.
pub fn create_transport(connection_string: &str) -> HttpTransport {
    let base_url = if connection_string.starts_with("http") {
        connection_string.to_string()
    } else {
        format!("http://{}", connection_string)
    };
    HttpTransport::new(&base_url)
}
