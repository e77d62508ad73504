// File: src/queue/http.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{OpQueue, QueueMessage};
use crate::constants::http::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::errors::{ConfigError, QueueError};

/// Queue client for the main and dead-letter channels.
///
/// The queue service owns visibility timeouts, retention, and redrive; this
/// client only sends, long-polls, acknowledges, and releases.
pub struct HttpQueue {
    client: Client,
    queue_url: String,
    failed_queue_url: String,
    token: String,
}

impl HttpQueue {
    pub fn new(queue_url: &str, failed_queue_url: &str, token: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Constraint {
                reason: format!("HTTP client failed to build: {}", e),
            })?;
        Ok(Self {
            client,
            queue_url: queue_url.trim_end_matches('/').to_string(),
            failed_queue_url: failed_queue_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, String> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status, text));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("unreadable response body: {}", e))
    }
}

#[async_trait]
impl OpQueue for HttpQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let url = format!("{}/messages", self.queue_url);
        self.post(&url, &json!({"Body": body}))
            .await
            .map(|_| ())
            .map_err(|reason| QueueError::Send { reason })
    }

    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, QueueError> {
        let url = format!("{}/receive", self.queue_url);
        let body = json!({"MaxMessages": max, "WaitSecs": wait.as_secs()});
        let resp = self
            .post(&url, &body)
            .await
            .map_err(|reason| QueueError::Receive { reason })?;

        let messages = resp
            .get("Messages")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(messages
            .iter()
            .filter_map(|m| {
                Some(QueueMessage {
                    id: m.get("MessageId")?.as_str()?.to_string(),
                    receipt: m.get("Receipt")?.as_str()?.to_string(),
                    body: m.get("Body")?.as_str()?.to_string(),
                    receive_count: m
                        .get("ReceiveCount")
                        .and_then(Value::as_u64)
                        .unwrap_or(1) as u32,
                })
            })
            .collect())
    }

    async fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        let url = format!("{}/ack", self.queue_url);
        self.post(&url, &json!({"Receipt": receipt}))
            .await
            .map(|_| ())
            .map_err(|reason| QueueError::Delete { reason })
    }

    async fn release(&self, receipt: &str) -> Result<(), QueueError> {
        let url = format!("{}/release", self.queue_url);
        self.post(&url, &json!({"Receipt": receipt, "VisibilitySecs": 0}))
            .await
            .map(|_| ())
            .map_err(|reason| QueueError::Release { reason })
    }

    async fn dead_letter(&self, msg: &QueueMessage) -> Result<(), QueueError> {
        let url = format!("{}/messages", self.failed_queue_url);
        self.post(&url, &json!({"Body": msg.body}))
            .await
            .map(|_| ())
            .map_err(|reason| QueueError::DeadLetter { reason })
    }
}
