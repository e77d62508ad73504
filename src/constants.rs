//! Central repository for timing, queue, and naming constants
//!
//! Groups constants by concern so every magic number has one home.

#![allow(dead_code)] // Some constants are defined for deployment tooling

/// Cycle timing constants
pub mod cycle {
    /// Length of the scheduling cycle in minutes; schedule minutes must be
    /// multiples of this value
    pub const CYCLE_MINUTES: u32 = 10;

    /// Age in minutes past which a queued operation request is discarded
    /// instead of executed; always strictly less than CYCLE_MINUTES
    pub const EXPIRE_AFTER_MINUTES: i64 = 9;
}

/// Queue contract constants
pub mod queue {
    /// Default cap on an encoded operation request
    pub const MSG_BYTES_DEFAULT: usize = 32 * 1024;

    /// Absolute ceiling the queue service accepts
    pub const MSG_BYTES_CEILING: usize = 256 * 1024;

    /// Long-poll receive wait
    pub const LONG_POLL_SECS: u64 = 20;

    /// Send attempts per message before the request is dropped for the cycle
    pub const SEND_ATTEMPTS: u32 = 3;

    /// Base delay between send attempts, multiplied by the attempt number
    pub const SEND_RETRY_BASE_MS: u64 = 250;

    /// Receives after which a transiently-failing message is dead-lettered
    pub const MAX_RECEIVES: u32 = 2;

    /// Default visibility timeout; must cover the do budget plus margin
    pub const VISIBILITY_TIMEOUT_SECS_DEFAULT: u64 = 90;

    /// Default dead-letter retention (7 days)
    pub const FAILED_RETENTION_SECS_DEFAULT: u64 = 7 * 24 * 3600;

    /// Main queue retention (20 minutes, two cycles)
    pub const MAIN_RETENTION_SECS: u64 = 20 * 60;
}

/// Per-invocation wall-clock budgets
pub mod budgets {
    /// Default budget for one find scan
    pub const FIND_TIMEOUT_SECS_DEFAULT: u64 = 60;

    /// Default budget for one queued operation
    pub const DO_TIMEOUT_SECS_DEFAULT: u64 = 30;

    /// Default do worker parallelism
    pub const DO_WORKERS_DEFAULT: usize = 5;

    /// Margin required between the do budget and the visibility timeout
    pub const VISIBILITY_MARGIN_SECS: u64 = 30;
}

/// HTTP client budgets for provider and queue calls
pub mod http {
    use std::time::Duration;

    /// Timeout for a single request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Timeout for establishing a connection
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Reserved tag keys and naming pieces
pub mod tags {
    /// Prefix shared by every operation tag and every reserved child tag
    pub const RESERVED_PREFIX: &str = "sched-";

    /// Console-visible resource name tag
    pub const NAME: &str = "Name";

    pub const PARENT_NAME: &str = "sched-parent-name";
    pub const PARENT_ID: &str = "sched-parent-id";
    pub const OP: &str = "sched-op";
    pub const CYCLE_START: &str = "sched-cycle-start";

    /// ISO cycle instant for backups routed through a backup-service
    /// intermediary that would otherwise lose the cycle time
    pub const TIME: &str = "sched-time";
}

/// Child resource naming constants
pub mod naming {
    /// Child names sort after most manually-created resources
    pub const CHILD_NAME_PREFIX: &str = "zsched";

    pub const NAME_DELIM: char = '-';

    /// Replacement for characters the destination service forbids
    pub const UNSAFE_FILL: char = 'X';

    /// Random suffix length
    pub const SUFFIX_LEN: usize = 5;

    /// Unambiguous alphabet: digits and lowercase letters minus 0 o 1 l i
    pub const SUFFIX_ALPHABET: &[u8] = b"23456789abcdefghjkmnpqrstuvwxyz";
}
