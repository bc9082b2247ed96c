//! In-memory HTTP backend for the task list and the chat.
//!
//! Nothing is persisted: ids count up from 1 per collection for the
//! lifetime of the process.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use hyper::body::{Body, Incoming};
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, HeaderValue,
};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::{ServiceError, ServiceResult};
use crate::types::{EntityId, Message, MessageDraft, Task, TaskDraft};

#[derive(Default)]
struct BackendState {
    tasks: Vec<Task>,
    next_task_id: EntityId,
    messages: Vec<Message>,
    next_message_id: EntityId,
}

#[derive(Default)]
pub struct Backend {
    state: Mutex<BackendState>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Dispatch one request. Every response carries the CORS headers.
    pub fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        body: &[u8],
    ) -> Response<String> {
        let response = match (method, path) {
            (&Method::OPTIONS, "/tasks" | "/messages") => plain(StatusCode::OK, ""),
            (&Method::GET, "/tasks") => self.list_tasks(),
            (&Method::POST, "/tasks") => self.create_task(body),
            (&Method::GET, "/messages") => self.list_messages(),
            (&Method::POST, "/messages") => self.create_message(body),
            (&Method::DELETE, "/messages") => self.delete_message(query),
            (_, "/tasks" | "/messages") => plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
            _ => plain(StatusCode::NOT_FOUND, "Not found"),
        };
        with_cors(response)
    }

    fn list_tasks(&self) -> Response<String> {
        tracing::info!("Listing tasks");
        json(&self.lock().tasks)
    }

    fn create_task(&self, body: &[u8]) -> Response<String> {
        let Ok(draft) = serde_json::from_slice::<TaskDraft>(body) else {
            return plain(StatusCode::BAD_REQUEST, "Invalid request body");
        };
        let task = {
            let mut state = self.lock();
            state.next_task_id += 1;
            let task = Task {
                id: state.next_task_id,
                text: draft.text,
                done: draft.done,
            };
            state.tasks.push(task.clone());
            task
        };
        tracing::info!(id = task.id, text = %task.text, "Created task");
        json(&task)
    }

    fn list_messages(&self) -> Response<String> {
        tracing::info!("Listing messages");
        json(&self.lock().messages)
    }

    fn create_message(&self, body: &[u8]) -> Response<String> {
        let Ok(draft) = serde_json::from_slice::<MessageDraft>(body) else {
            return plain(StatusCode::BAD_REQUEST, "Invalid request body");
        };
        let message = {
            let mut state = self.lock();
            state.next_message_id += 1;
            let message = Message {
                id: state.next_message_id,
                user: draft.user,
                content: draft.content,
            };
            state.messages.push(message.clone());
            message
        };
        tracing::info!(id = message.id, user = %message.user, "Created message");
        json(&message)
    }

    fn delete_message(&self, query: Option<&str>) -> Response<String> {
        let Some(raw) = query_param(query, "id").filter(|v| !v.is_empty()) else {
            return plain(StatusCode::BAD_REQUEST, "Missing id");
        };
        let Ok(id) = raw.parse::<EntityId>() else {
            return plain(StatusCode::BAD_REQUEST, "Invalid id");
        };

        let mut state = self.lock();
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        if state.messages.len() == before {
            return plain(StatusCode::NOT_FOUND, "Message not found");
        }
        tracing::info!(id, "Deleted message");
        plain(StatusCode::OK, "")
    }
}

fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn plain(status: StatusCode, text: &str) -> Response<String> {
    let mut response = Response::new(text.to_string());
    *response.status_mut() = status;
    if !text.is_empty() {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    }
    response
}

fn json<T: Serialize + ?Sized>(value: &T) -> Response<String> {
    match serde_json::to_string(value) {
        Ok(body) => {
            let mut response = Response::new(body);
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!("Failed to encode response: {e}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Encoding error")
        }
    }
}

fn with_cors(mut response: Response<String>) -> Response<String> {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
    response
}

async fn read_body(mut body: Incoming) -> Result<Vec<u8>, hyper::Error> {
    let mut buf = Vec::new();
    while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        if let Ok(data) = frame?.into_data() {
            buf.extend_from_slice(&data);
        }
    }
    Ok(buf)
}

async fn handle(backend: Arc<Backend>, req: Request<Incoming>) -> Result<Response<String>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match read_body(body).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to read request body: {e}");
            return Ok(with_cors(plain(StatusCode::BAD_REQUEST, "Unreadable body")));
        }
    };
    Ok(backend.route(&parts.method, parts.uri.path(), parts.uri.query(), &body))
}

/// Accept connections on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    backend: Arc<Backend>,
    shutdown: CancellationToken,
) -> ServiceResult<()> {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Accept error: {e}");
                    continue;
                }
            },
        };
        tracing::debug!(%peer, "Connection accepted");

        let io = TokioIo::new(stream);
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(Arc::clone(&backend), req));
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(%peer, "Connection error: {e}");
            }
        });
    }
    tracing::info!("Server stopped");
    Ok(())
}

/// Bind `addr` and serve a fresh backend until `shutdown` fires.
pub async fn run(addr: SocketAddr, shutdown: CancellationToken) -> ServiceResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::FromString(format!("Failed to bind {addr}: {e}")))?;
    let local = listener.local_addr()?;
    tracing::info!("Server listening on http://{local}");
    serve(listener, Arc::new(Backend::new()), shutdown).await
}
