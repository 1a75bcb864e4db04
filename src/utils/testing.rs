//! Scripted transport for offline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::utils::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// One canned reply.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Response(HttpResponse),
    Error(TransportError),
    Delayed(Duration, HttpResponse),
}

impl Reply {
    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Reply::Response(HttpResponse::new(200, body))
    }

    pub(crate) fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Response(HttpResponse::new(status, body))
    }

    pub(crate) fn network(message: &str) -> Self {
        Reply::Error(TransportError::Network {
            url: String::new(),
            message: message.to_string(),
        })
    }

    pub(crate) fn timeout() -> Self {
        Reply::Error(TransportError::Timeout {
            url: String::new(),
            after: Duration::ZERO,
        })
    }

    pub(crate) fn delayed(delay: Duration, response: HttpResponse) -> Self {
        Reply::Delayed(delay, response)
    }
}

/// Replies per URL, in order. The last reply for a URL repeats forever.
/// Unknown URLs fail with a network error.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, url: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        match self.next_reply(&request.url) {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(error)) => Err(with_url(error, &request.url)),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Err(TransportError::Network {
                url: request.url.clone(),
                message: "no scripted route".to_string(),
            }),
        }
    }
}

fn with_url(error: TransportError, url: &str) -> TransportError {
    let url = url.to_string();
    match error {
        TransportError::Timeout { after, .. } => TransportError::Timeout { url, after },
        TransportError::Network { message, .. } => TransportError::Network { url, message },
        TransportError::Status { status, .. } => TransportError::Status { url, status },
        TransportError::Invalid { message, .. } => TransportError::Invalid { url, message },
    }
}
