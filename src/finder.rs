// File: src/finder.rs
//
// The find stage: one scan per cycle. Enumerates every catalog entry,
// evaluates schedule tags against the cycle instant computed at startup,
// and queues exactly one operation request per matching resource. The scan
// is stateless; whatever it misses, the next cycle re-evaluates from
// scratch.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::catalog::{self, OpSpec, RsrcTypeSpec};
use crate::clock::CycleInstant;
use crate::config::Config;
use crate::constants::queue::{SEND_ATTEMPTS, SEND_RETRY_BASE_MS};
use crate::errors::ApiError;
use crate::provider::ProviderApi;
use crate::queue::{OpQueue, OpRequest};
use crate::sched::Schedule;

/// Counters for one scan, logged when the scan completes
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FindSummary {
    pub resources: usize,
    pub queued: usize,
    pub parse_errors: usize,
    pub conflicts: usize,
    pub entry_errors: usize,
    pub send_failures: usize,
}

pub struct Finder {
    config: Arc<Config>,
    provider: Arc<dyn ProviderApi>,
    queue: Arc<dyn OpQueue>,
}

impl Finder {
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

    /// Run one scan anchored to `cycle`. Per-entry enumeration failures are
    /// logged and the scan moves on; only the caller's wall-clock budget
    /// cuts a scan short.
    pub async fn run(&self, cycle: CycleInstant) -> FindSummary {
        let mut summary = FindSummary::default();

        if !self.config.enable {
            info!(kind = "disabled", cycle = %cycle, "scheduler is disabled; nothing queued this cycle");
            return summary;
        }

        info!(kind = "start", cycle = %cycle, "scan starting");
        for entry in catalog::catalog() {
            if let Err(e) = self.scan_entry(entry, cycle, &mut summary).await {
                summary.entry_errors += 1;
                error!(
                    kind = "list_error",
                    service = %entry.service,
                    rsrc_type = entry.rsrc_type,
                    error = %e,
                    "enumeration failed; continuing with the next entry"
                );
            }
        }
        info!(
            kind = "scan_complete",
            cycle = %cycle,
            resources = summary.resources,
            queued = summary.queued,
            parse_errors = summary.parse_errors,
            conflicts = summary.conflicts,
            entry_errors = summary.entry_errors,
            send_failures = summary.send_failures,
            "scan complete"
        );
        summary
    }

    async fn scan_entry(
        &self,
        entry: &'static RsrcTypeSpec,
        cycle: CycleInstant,
        summary: &mut FindSummary,
    ) -> Result<(), ApiError> {
        let filters = entry.describe_filters();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .provider
                .list_page(
                    entry.service,
                    entry.list_action,
                    filters.as_ref(),
                    next_token.as_deref(),
                )
                .await?;
            for rsrc in entry.flatten(&page.body) {
                summary.resources += 1;
                self.evaluate(entry, &rsrc, cycle, summary).await;
            }
            next_token = page.next_token;
            if next_token.is_none() {
                return Ok(());
            }
        }
    }

    /// Evaluate one resource's operation tags against the cycle and queue
    /// the single matching operation, if any
    async fn evaluate(
        &self,
        entry: &'static RsrcTypeSpec,
        rsrc: &Value,
        cycle: CycleInstant,
        summary: &mut FindSummary,
    ) {
        let Some(rsrc_id) = entry.rsrc_id(rsrc) else {
            warn!(
                kind = "bad_record",
                service = %entry.service,
                rsrc_type = entry.rsrc_type,
                "listed record has no identifier; skipped"
            );
            return;
        };

        let tags = entry.tags_of(rsrc);
        let mut matched: Vec<&'static OpSpec> = Vec::new();
        for tag in &tags {
            let Some(op) = entry.op_for_tag_key(&tag.key) else {
                continue;
            };
            match Schedule::parse(&tag.value) {
                Ok(sched) => {
                    if sched.matches(cycle) {
                        matched.push(op);
                    }
                }
                Err(e) => {
                    summary.parse_errors += 1;
                    warn!(
                        kind = "sched_parse",
                        rsrc_id = %rsrc_id,
                        tag_key = tag.key.as_str(),
                        tag_value = tag.value.as_str(),
                        error = %e,
                        "unparseable schedule; resource skipped for this cycle"
                    );
                    return;
                }
            }
        }

        match matched.len() {
            0 => {}
            1 => {
                let op = matched[0];
                let req = OpRequest {
                    cycle_start: cycle,
                    service: entry.service,
                    rsrc_type: entry.rsrc_type.to_string(),
                    rsrc_id,
                    op: op.tag,
                    tags,
                    op_kwargs: op.find_kwargs.and_then(|build| build(rsrc)),
                };
                self.enqueue(&req, summary).await;
            }
            _ => {
                // Hard invariant: never dispatch simultaneous operations
                // against one resource
                summary.conflicts += 1;
                let ops: Vec<&str> = matched.iter().map(|op| op.tag.tag_key()).collect();
                error!(
                    kind = "multiple_ops",
                    service = %entry.service,
                    rsrc_type = entry.rsrc_type,
                    rsrc_id = %rsrc_id,
                    ops = ?ops,
                    cycle = %cycle,
                    "multiple operations scheduled in the same cycle; none dispatched"
                );
            }
        }
    }

    async fn enqueue(&self, req: &OpRequest, summary: &mut FindSummary) {
        let body = match req.encode(self.config.queue_message_bytes_max) {
            Ok(body) => body,
            Err(e) => {
                summary.send_failures += 1;
                error!(
                    kind = "queue_send",
                    rsrc_id = %req.rsrc_id,
                    op = %req.op,
                    error = %e,
                    "request dropped"
                );
                return;
            }
        };

        for attempt in 1..=SEND_ATTEMPTS {
            match self.queue.send(&body).await {
                Ok(()) => {
                    summary.queued += 1;
                    debug!(kind = "queue_send", rsrc_id = %req.rsrc_id, op = %req.op, "queued");
                    return;
                }
                Err(e) if attempt < SEND_ATTEMPTS => {
                    warn!(
                        kind = "queue_send",
                        rsrc_id = %req.rsrc_id,
                        attempt,
                        error = %e,
                        "send failed; retrying"
                    );
                    sleep(Duration::from_millis(SEND_RETRY_BASE_MS * u64::from(attempt))).await;
                }
                Err(e) => {
                    summary.send_failures += 1;
                    error!(
                        kind = "queue_send",
                        rsrc_id = %req.rsrc_id,
                        op = %req.op,
                        error = %e,
                        "send failed; dropped for this cycle"
                    );
                }
            }
        }
    }
}
