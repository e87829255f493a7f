//! Recording stand-in for the REST backend.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::{json, Value};

use crate::api::{Backend, Method};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Answers from per-route replies first, then from the FIFO queue, then with
/// an empty object.
#[derive(Default)]
pub struct MockBackend {
    queue: RefCell<VecDeque<Result<Value, ApiError>>>,
    routes: RefCell<HashMap<(Method, String), Result<Value, ApiError>>>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, body: Value) {
        self.queue.borrow_mut().push_back(Ok(body));
    }

    pub fn fail(&self, err: ApiError) {
        self.queue.borrow_mut().push_back(Err(err));
    }

    pub fn route(&self, method: Method, path: &str, reply: Result<Value, ApiError>) {
        self.routes
            .borrow_mut()
            .insert((method, path.to_string()), reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn answer(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        self.calls.borrow_mut().push(RecordedCall {
            method: method.clone(),
            path: path.to_string(),
            body,
        });
        if let Some(reply) = self.routes.borrow().get(&(method, path.to_string())) {
            return reply.clone();
        }
        self.queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }
}

impl Backend for MockBackend {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        tokio::task::yield_now().await;
        self.answer(method, path, body.cloned())
    }

    async fn upload(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let body = json!({"field": field, "fileName": file_name, "size": bytes.len()});
        self.answer(Method::POST, path, Some(body))
    }
}
