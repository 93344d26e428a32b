//! Recording transport for unit tests.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, status: u16, body: Value) -> &Self {
        self.respond_raw(status, &body.to_string())
    }

    pub(crate) fn respond_raw(&self, status: u16, body: &str) -> &Self {
        self.responses.lock().push_back(Ok(ApiResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub(crate) fn fail(&self, message: &str) -> &Self {
        self.responses
            .lock()
            .push_back(Err(Error::Network(message.to_string())));
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// `METHOD path` for every recorded request.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Network("no response queued".to_string())))
    }
}
