//! Delivery of events to the remote collector
//!
//! Each event is posted once as a JSON document. There is no retry and no
//! queue: a failed delivery drops the event.

use super::event::Event;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;
use ureq::{Agent, AgentBuilder};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why an event was not delivered
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// No response within the client timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// DNS, connect, TLS or other transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Collector answered with a non-2xx status
    #[error("collector returned HTTP {status}")]
    BadStatus {
        /// HTTP status code
        status: u16,
        /// Response body, if readable
        body: String,
    },

    /// Event could not be encoded
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How the collector answered a 2xx response
///
/// Every variant means the event was delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorReply {
    /// JSON body with `"status": "success"`
    Success,
    /// JSON body without the success marker
    Unexpected(serde_json::Value),
    /// Body that is not JSON
    NotJson(String),
}

/// Destination for parsed events
pub trait EventSink {
    /// Deliver one event, blocking until it is accepted or has failed
    fn deliver(&mut self, event: &Event) -> Result<CollectorReply, DeliveryError>;
}

/// Posts events to an HTTP(S) collector endpoint
pub struct HttpCollector {
    url: String,
    timeout: Duration,
    agent: Agent,
}

impl HttpCollector {
    /// Create a collector client for `url`
    pub fn new(url: &str, timeout: Duration) -> Self {
        let agent = AgentBuilder::new().timeout(timeout).build();
        Self {
            url: url.to_string(),
            timeout,
            agent,
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl EventSink for HttpCollector {
    fn deliver(&mut self, event: &Event) -> Result<CollectorReply, DeliveryError> {
        let body = event.to_json()?;

        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(&body);

        match result {
            Ok(response) => {
                let status = response.status();
                let text = response.into_string().unwrap_or_default();
                if (200..300).contains(&status) {
                    Ok(interpret_reply(&text))
                } else {
                    Err(DeliveryError::BadStatus { status, body: text })
                }
            }
            Err(ureq::Error::Status(status, response)) => Err(DeliveryError::BadStatus {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    Err(DeliveryError::Timeout(self.timeout))
                } else {
                    Err(DeliveryError::Network(transport.to_string()))
                }
            }
        }
    }
}

/// Classify a 2xx response body
pub fn interpret_reply(body: &str) -> CollectorReply {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if value.get("status").and_then(|s| s.as_str()) == Some("success") => {
            CollectorReply::Success
        }
        Ok(value) => CollectorReply::Unexpected(value),
        Err(_) => CollectorReply::NotJson(body.to_string()),
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    if transport.kind() == ureq::ErrorKind::Io && transport.to_string().contains("timed out") {
        return true;
    }

    let mut source: Option<&(dyn StdError + 'static)> = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
