//! In-memory queue fake
//!
//! Tracks availability, in-flight receipts, receive counts, and the
//! dead-letter channel, so dispositions can be asserted end to end.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use offhours::errors::QueueError;
use offhours::queue::{OpQueue, QueueMessage};

#[derive(Clone)]
struct Stored {
    id: String,
    body: String,
    receive_count: u32,
}

#[derive(Default)]
struct Inner {
    available: VecDeque<Stored>,
    in_flight: HashMap<String, Stored>,
    dead: Vec<QueueMessage>,
    sends_to_fail: u32,
}

#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail, to exercise retry and give-up paths
    pub fn fail_next_sends(&self, n: u32) {
        self.inner.lock().unwrap().sends_to_fail = n;
    }

    /// Bodies currently waiting in the main queue, in order
    pub fn available_bodies(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .available
            .iter()
            .map(|s| s.body.clone())
            .collect()
    }

    pub fn available_len(&self) -> usize {
        self.inner.lock().unwrap().available.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.lock().unwrap().in_flight.len()
    }

    pub fn dead_letters(&self) -> Vec<QueueMessage> {
        self.inner.lock().unwrap().dead.clone()
    }
}

#[async_trait]
impl OpQueue for MemoryQueue {
    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.sends_to_fail > 0 {
            inner.sends_to_fail -= 1;
            return Err(QueueError::Send {
                reason: "send disabled by test".to_string(),
            });
        }
        inner.available.push_back(Stored {
            id: Uuid::new_v4().to_string(),
            body: body.to_string(),
            receive_count: 0,
        });
        Ok(())
    }

    async fn receive(&self, max: usize, _wait: Duration) -> Result<Vec<QueueMessage>, QueueError> {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        while out.len() < max {
            let Some(mut stored) = inner.available.pop_front() else {
                break;
            };
            stored.receive_count += 1;
            let receipt = Uuid::new_v4().to_string();
            out.push(QueueMessage {
                id: stored.id.clone(),
                receipt: receipt.clone(),
                body: stored.body.clone(),
                receive_count: stored.receive_count,
            });
            inner.in_flight.insert(receipt, stored);
        }
        Ok(out)
    }

    async fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        self.inner.lock().unwrap().in_flight.remove(receipt);
        Ok(())
    }

    async fn release(&self, receipt: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stored) = inner.in_flight.remove(receipt) {
            inner.available.push_back(stored);
        }
        Ok(())
    }

    async fn dead_letter(&self, msg: &QueueMessage) -> Result<(), QueueError> {
        self.inner.lock().unwrap().dead.push(msg.clone());
        Ok(())
    }
}
