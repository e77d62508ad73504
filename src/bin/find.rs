// File: src/bin/find.rs
//
// Find stage entrypoint. The external trigger starts this one minute after
// each cycle boundary; the process floors its own start time to the cycle,
// runs one scan under its wall-clock budget, and exits.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use offhours::catalog;
use offhours::clock::CycleInstant;
use offhours::config::{self, Config};
use offhours::finder::Finder;
use offhours::provider::http::HttpProvider;
use offhours::queue::http::HttpQueue;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    config::init_tracing(&cfg.log_level)?;
    catalog::validate()?;

    let cycle = CycleInstant::floor(Utc::now());
    let run_id = Uuid::new_v4();
    info!(kind = "invocation", %run_id, cycle = %cycle, config = ?cfg, "find starting");

    let provider = Arc::new(HttpProvider::new(
        &cfg.provider_api_url,
        &cfg.provider_api_token,
    )?);
    let queue = Arc::new(HttpQueue::new(
        &cfg.queue_url,
        &cfg.failed_queue_url,
        &cfg.provider_api_token,
    )?);

    let budget = Duration::from_secs(cfg.find_timeout_secs);
    let finder = Finder::new(Arc::new(cfg), provider, queue);
    if timeout(budget, finder.run(cycle)).await.is_err() {
        warn!(
            kind = "scan_budget",
            budget_secs = budget.as_secs(),
            "scan exceeded its budget; remaining entries wait for the next cycle"
        );
    }
    Ok(())
}
