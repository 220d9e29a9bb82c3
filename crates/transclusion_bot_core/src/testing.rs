use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;

use crate::api::{ApiParams, WikiSession};
use crate::batch::Pacer;

type Request = Vec<(String, String)>;

/// Scripted session: answers come off per-action queues, requests are recorded.
#[derive(Default)]
pub(crate) struct MockSession {
    query_responses: RefCell<VecDeque<Result<Value, String>>>,
    edit_responses: RefCell<VecDeque<Result<Value, String>>>,
    queries: RefCell<Vec<Request>>,
    edits: RefCell<Vec<Request>>,
}

impl MockSession {
    pub(crate) fn with_query_response(self, payload: Value) -> Self {
        self.query_responses.borrow_mut().push_back(Ok(payload));
        self
    }

    pub(crate) fn with_query_error(self, message: &str) -> Self {
        self.query_responses
            .borrow_mut()
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn with_edit_response(self, payload: Value) -> Self {
        self.edit_responses.borrow_mut().push_back(Ok(payload));
        self
    }

    pub(crate) fn with_edit_error(self, message: &str) -> Self {
        self.edit_responses
            .borrow_mut()
            .push_back(Err(message.to_string()));
        self
    }

    pub(crate) fn last_query(&self) -> Option<Request> {
        self.queries.borrow().last().cloned()
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.borrow().len()
    }

    pub(crate) fn edits(&self) -> Vec<Request> {
        self.edits.borrow().clone()
    }

    fn record(log: &RefCell<Vec<Request>>, params: &ApiParams<'_>) {
        log.borrow_mut().push(
            params
                .iter()
                .map(|(key, value)| ((*key).to_string(), value.clone()))
                .collect(),
        );
    }

    fn next(queue: &RefCell<VecDeque<Result<Value, String>>>) -> anyhow::Result<Value> {
        match queue.borrow_mut().pop_front() {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("mock session has no scripted response")),
        }
    }
}

impl WikiSession for MockSession {
    fn query(&self, params: &ApiParams<'_>) -> anyhow::Result<Value> {
        Self::record(&self.queries, params);
        Self::next(&self.query_responses)
    }

    fn edit(&self, params: &ApiParams<'_>) -> anyhow::Result<Value> {
        Self::record(&self.edits, params);
        Self::next(&self.edit_responses)
    }

    fn request_count(&self) -> usize {
        self.queries.borrow().len() + self.edits.borrow().len()
    }
}

pub(crate) fn param<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
    request
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Pacer that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub(crate) struct RecordingPacer {
    pub(crate) pauses: Vec<Duration>,
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, delay: Duration) {
        self.pauses.push(delay);
    }
}
