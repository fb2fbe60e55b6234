#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use t2i_engine::{HttpRequest, HttpResponse, HttpTransport, ManualClock, TransportError};

/// Replays canned responses in order and records every request it sees.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Option<HttpResponse>,
    latency: Option<(Arc<ManualClock>, Duration)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            queue: Mutex::new(results.into()),
            fallback: None,
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Served once the queue is exhausted.
    pub fn repeat_after(mut self, response: HttpResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Every request advances `clock` by `latency` before answering.
    pub fn with_latency(mut self, clock: Arc<ManualClock>, latency: Duration) -> Self {
        self.latency = Some((clock, latency));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.url)
            .collect()
    }

    pub fn count_to(&self, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url == url)
            .count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some((clock, latency)) = &self.latency {
            clock.advance(*latency);
        }
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| TransportError::new(format!("unexpected request to {}", request.url)))
    }
}

pub fn json_response(payload: Value) -> HttpResponse {
    HttpResponse::json(200, &payload)
}
