// File: src/doer.rs
//
// The do stage: a pool of workers consuming one operation request at a
// time. Each message is validated, checked against the cycle-expiration
// bound, executed through the catalog, and then acknowledged, released for
// one redelivery, or dead-lettered. The acknowledge decision is a pure
// function of the execution outcome and the delivery count, so at-least-
// once delivery degrades to at-most-one successful invocation per cycle.

use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::catalog;
use crate::config::Config;
use crate::constants::queue::{LONG_POLL_SECS, MAX_RECEIVES};
use crate::errors::ErrorClass;
use crate::provider::{ApiCall, ProviderApi};
use crate::queue::{OpQueue, OpRequest, QueueMessage};

/// Result of executing one operation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The provider accepted the operation
    Ok,
    /// The resource was already in the desired state
    Benign(String),
    /// Throttling, server error, or timeout; worth one redelivery
    Transient(String),
    /// Validation or authorization failure; retrying cannot help
    Permanent(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Benign(m) => write!(f, "benign: {}", m),
            Outcome::Transient(m) => write!(f, "transient: {}", m),
            Outcome::Permanent(m) => write!(f, "permanent: {}", m),
        }
    }
}

/// What happens to the queue message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Delete; the request is finished
    Ack,
    /// Return to the queue for redelivery
    Release,
    /// Move to the dead-letter channel for human inspection
    DeadLetter,
}

/// The acknowledge decision. Transient failures get exactly one redelivery
/// before joining the permanent failures in the dead-letter channel.
pub fn disposition(outcome: &Outcome, receive_count: u32) -> Disposition {
    match outcome {
        Outcome::Ok | Outcome::Benign(_) => Disposition::Ack,
        Outcome::Transient(_) if receive_count < MAX_RECEIVES => Disposition::Release,
        Outcome::Transient(_) | Outcome::Permanent(_) => Disposition::DeadLetter,
    }
}

#[derive(Clone)]
pub struct Doer {
    config: Arc<Config>,
    provider: Arc<dyn ProviderApi>,
    queue: Arc<dyn OpQueue>,
}

impl Doer {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn ProviderApi>,
        queue: Arc<dyn OpQueue>,
    ) -> Self {
        Self {
            config,
            provider,
            queue,
        }
    }

    /// Run the worker pool; pends until the caller drops or aborts it
    pub async fn run(&self) {
        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.do_workers {
            let worker = self.clone();
            workers.spawn(async move { worker.worker_loop(worker_id).await });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(kind = "worker_exit", error = %e, "worker terminated");
            }
        }
    }

    async fn worker_loop(&self, worker_id: usize) {
        let wait = Duration::from_secs(LONG_POLL_SECS);
        loop {
            match self.queue.receive(1, wait).await {
                Ok(messages) => {
                    for msg in &messages {
                        self.handle(msg).await;
                    }
                }
                Err(e) => {
                    warn!(kind = "queue_receive", worker_id, error = %e, "receive failed");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Process one delivery end to end; returns the disposition applied
    pub async fn handle(&self, msg: &QueueMessage) -> Disposition {
        let req = match OpRequest::decode(&msg.body) {
            Ok(req) => req,
            Err(e) => {
                error!(
                    kind = "bad_message",
                    msg_id = %msg.id,
                    error = %e,
                    "undecodable request; dead-lettered"
                );
                self.dispose(msg, Disposition::DeadLetter).await;
                return Disposition::DeadLetter;
            }
        };

        // Deadline discipline: a request that outlived its cycle is dropped,
        // never executed late
        if req.cycle_start.is_expired(Utc::now()) {
            info!(
                kind = "expired",
                rsrc_id = %req.rsrc_id,
                op = %req.op,
                cycle = %req.cycle_start,
                "request outlived its cycle; discarded"
            );
            self.dispose(msg, Disposition::Ack).await;
            return Disposition::Ack;
        }

        let outcome = self.execute(&req).await;
        match &outcome {
            Outcome::Ok => info!(
                kind = "api_response",
                rsrc_id = %req.rsrc_id,
                op = %req.op,
                cycle = %req.cycle_start,
                "operation accepted"
            ),
            Outcome::Benign(detail) => info!(
                kind = "benign",
                rsrc_id = %req.rsrc_id,
                op = %req.op,
                detail = detail.as_str(),
                "already in the desired state"
            ),
            Outcome::Transient(detail) => warn!(
                kind = "transient",
                rsrc_id = %req.rsrc_id,
                op = %req.op,
                receive_count = msg.receive_count,
                detail = detail.as_str(),
                "operation failed transiently"
            ),
            Outcome::Permanent(detail) => error!(
                kind = "permanent",
                rsrc_id = %req.rsrc_id,
                op = %req.op,
                cycle = %req.cycle_start,
                detail = detail.as_str(),
                "operation failed permanently"
            ),
        }

        let disp = disposition(&outcome, msg.receive_count);
        self.dispose(msg, disp).await;
        disp
    }

    /// Resolve, build, and invoke; never touches the queue
    async fn execute(&self, req: &OpRequest) -> Outcome {
        let Some(entry) = catalog::entry(req.service, &req.rsrc_type) else {
            return Outcome::Permanent(format!(
                "unsupported resource type {} {}",
                req.service, req.rsrc_type
            ));
        };
        let Some(op) = entry.op(req.op) else {
            return Outcome::Permanent(format!(
                "operation {} is not applicable to {} {}",
                req.op, req.service, req.rsrc_type
            ));
        };

        let params = match op.build_args(
            entry,
            &req.rsrc_id,
            &req.tags,
            req.cycle_start,
            req.op_kwargs.as_ref(),
            self.config.copy_tags,
        ) {
            Ok(params) => params,
            Err(reason) => return Outcome::Permanent(reason),
        };

        let call = ApiCall {
            service: req.service,
            action: op.action.to_string(),
            params,
        };
        let budget = Duration::from_secs(self.config.do_timeout_secs);
        match timeout(budget, self.provider.invoke(&call)).await {
            Err(_) => Outcome::Transient(format!(
                "operation exceeded its {}s budget",
                self.config.do_timeout_secs
            )),
            Ok(Ok(_resp)) => Outcome::Ok,
            Ok(Err(api)) => match api.class() {
                ErrorClass::Benign => Outcome::Benign(api.to_string()),
                ErrorClass::Transient => Outcome::Transient(api.to_string()),
                ErrorClass::Permanent => Outcome::Permanent(api.to_string()),
            },
        }
    }

    async fn dispose(&self, msg: &QueueMessage, disp: Disposition) {
        match disp {
            Disposition::Ack => {
                if let Err(e) = self.queue.delete(&msg.receipt).await {
                    error!(kind = "queue_delete", msg_id = %msg.id, error = %e, "acknowledge failed");
                }
            }
            Disposition::Release => {
                if let Err(e) = self.queue.release(&msg.receipt).await {
                    error!(kind = "queue_release", msg_id = %msg.id, error = %e, "release failed");
                }
            }
            Disposition::DeadLetter => {
                if let Err(e) = self.queue.dead_letter(msg).await {
                    // keep the message; visibility expiry will redeliver it
                    error!(kind = "dead_letter", msg_id = %msg.id, error = %e, "transfer failed");
                    return;
                }
                if let Err(e) = self.queue.delete(&msg.receipt).await {
                    error!(kind = "queue_delete", msg_id = %msg.id, error = %e, "acknowledge failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_benign_acknowledge() {
        assert_eq!(disposition(&Outcome::Ok, 1), Disposition::Ack);
        assert_eq!(
            disposition(&Outcome::Benign("already stopped".to_string()), 2),
            Disposition::Ack
        );
    }

    #[test]
    fn transient_gets_exactly_one_redelivery() {
        let outcome = Outcome::Transient("throttled".to_string());
        assert_eq!(disposition(&outcome, 1), Disposition::Release);
        assert_eq!(disposition(&outcome, 2), Disposition::DeadLetter);
        assert_eq!(disposition(&outcome, 3), Disposition::DeadLetter);
    }

    #[test]
    fn permanent_dead_letters_immediately() {
        let outcome = Outcome::Permanent("access denied".to_string());
        assert_eq!(disposition(&outcome, 1), Disposition::DeadLetter);
    }
}
