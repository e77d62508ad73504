// File: src/bin/do.rs
//
// Do stage entrypoint: a long-running worker pool draining the operation
// queue. In-flight messages survive an interrupt through the queue's
// visibility timeout.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use offhours::catalog;
use offhours::config::{self, Config};
use offhours::doer::Doer;
use offhours::provider::http::HttpProvider;
use offhours::queue::http::HttpQueue;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;
    config::init_tracing(&cfg.log_level)?;
    catalog::validate()?;

    let run_id = Uuid::new_v4();
    info!(kind = "invocation", %run_id, workers = cfg.do_workers, config = ?cfg, "do starting");

    let provider = Arc::new(HttpProvider::new(
        &cfg.provider_api_url,
        &cfg.provider_api_token,
    )?);
    let queue = Arc::new(HttpQueue::new(
        &cfg.queue_url,
        &cfg.failed_queue_url,
        &cfg.provider_api_token,
    )?);

    let doer = Doer::new(Arc::new(cfg), provider, queue);
    tokio::select! {
        _ = doer.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!(kind = "shutdown", "interrupt received; in-flight messages redeliver via visibility");
        }
    }
    Ok(())
}
