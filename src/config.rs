// File: src/config.rs
//
// Read-only configuration, derived from the environment at startup. The
// setting names are the operator interface and match the deployment
// template parameters. Anything malformed here is fatal; nothing else in
// the process mutates global state.

use std::fmt;
use tracing_subscriber::EnvFilter;

use crate::constants::{budgets, queue};
use crate::errors::ConfigError;

pub const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Clone)]
pub struct Config {
    /// Whether the find stage runs this cycle; while false, nothing new is
    /// queued and in-flight requests drain normally
    pub enable: bool,
    /// Whether non-reserved parent tags propagate to backup children
    pub copy_tags: bool,
    pub log_level: String,
    /// Wall-clock budget for one find scan
    pub find_timeout_secs: u64,
    /// Wall-clock budget for one queued operation
    pub do_timeout_secs: u64,
    /// Do worker parallelism
    pub do_workers: usize,
    pub queue_visibility_timeout_secs: u64,
    pub queue_message_bytes_max: usize,
    pub failed_retention_secs: u64,
    pub queue_url: String,
    pub failed_queue_url: String,
    pub provider_api_url: String,
    pub provider_api_token: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any name→value lookup; `from_env` is the thin wrapper
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            enable: bool_setting(&get, "Enable", true)?,
            copy_tags: bool_setting(&get, "CopyTags", true)?,
            log_level: level_setting(&get, "LogLevel")?,
            find_timeout_secs: u64_setting(
                &get,
                "FindLambdaFnTimeoutSecs",
                budgets::FIND_TIMEOUT_SECS_DEFAULT,
            )?,
            do_timeout_secs: u64_setting(
                &get,
                "DoLambdaFnTimeoutSecs",
                budgets::DO_TIMEOUT_SECS_DEFAULT,
            )?,
            do_workers: u64_setting(
                &get,
                "DoLambdaFnReservedConcurrentExecutions",
                budgets::DO_WORKERS_DEFAULT as u64,
            )? as usize,
            queue_visibility_timeout_secs: u64_setting(
                &get,
                "OperationQueueVisibilityTimeoutSecs",
                queue::VISIBILITY_TIMEOUT_SECS_DEFAULT,
            )?,
            queue_message_bytes_max: u64_setting(
                &get,
                "QueueMessageBytesMax",
                queue::MSG_BYTES_DEFAULT as u64,
            )? as usize,
            failed_retention_secs: u64_setting(
                &get,
                "OperationFailedQueueMessageRetentionPeriodSecs",
                queue::FAILED_RETENTION_SECS_DEFAULT,
            )?,
            queue_url: required(&get, "QueueUrl")?,
            failed_queue_url: required(&get, "FailedQueueUrl")?,
            provider_api_url: required(&get, "ProviderApiUrl")?,
            provider_api_token: required(&get, "ProviderApiToken")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_message_bytes_max == 0
            || self.queue_message_bytes_max > queue::MSG_BYTES_CEILING
        {
            return Err(ConfigError::Constraint {
                reason: format!(
                    "QueueMessageBytesMax must be between 1 and {}",
                    queue::MSG_BYTES_CEILING
                ),
            });
        }
        if self.do_workers == 0 {
            return Err(ConfigError::Constraint {
                reason: "DoLambdaFnReservedConcurrentExecutions must be at least 1".to_string(),
            });
        }
        if self.find_timeout_secs == 0 || self.do_timeout_secs == 0 {
            return Err(ConfigError::Constraint {
                reason: "timeout budgets must be at least 1 second".to_string(),
            });
        }
        if self.queue_visibility_timeout_secs
            < self.do_timeout_secs + budgets::VISIBILITY_MARGIN_SECS
        {
            return Err(ConfigError::Constraint {
                reason: format!(
                    "OperationQueueVisibilityTimeoutSecs must be at least \
                     DoLambdaFnTimeoutSecs plus a {}s margin",
                    budgets::VISIBILITY_MARGIN_SECS
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("enable", &self.enable)
            .field("copy_tags", &self.copy_tags)
            .field("log_level", &self.log_level)
            .field("find_timeout_secs", &self.find_timeout_secs)
            .field("do_timeout_secs", &self.do_timeout_secs)
            .field("do_workers", &self.do_workers)
            .field("queue_visibility_timeout_secs", &self.queue_visibility_timeout_secs)
            .field("queue_message_bytes_max", &self.queue_message_bytes_max)
            .field("failed_retention_secs", &self.failed_retention_secs)
            .field("queue_url", &self.queue_url)
            .field("failed_queue_url", &self.failed_queue_url)
            .field("provider_api_url", &self.provider_api_url)
            .field("provider_api_token", &"<redacted>")
            .finish()
    }
}

fn required<F: Fn(&str) -> Option<String>>(
    get: &F,
    key: &'static str,
) -> Result<String, ConfigError> {
    match get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingRequired { key }),
    }
}

fn bool_setting<F: Fn(&str) -> Option<String>>(
    get: &F,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key).as_deref() {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            value: other.to_string(),
            reason: "expected 'true' or 'false'".to_string(),
        }),
    }
}

fn u64_setting<F: Fn(&str) -> Option<String>>(
    get: &F,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected an unsigned integer".to_string(),
        }),
    }
}

fn level_setting<F: Fn(&str) -> Option<String>>(
    get: &F,
    key: &'static str,
) -> Result<String, ConfigError> {
    let raw = get(key).unwrap_or_else(|| "ERROR".to_string());
    if LOG_LEVELS.contains(&raw.as_str()) {
        Ok(raw)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: format!("expected one of {:?}", LOG_LEVELS),
        })
    }
}

/// Install the JSON log writer at the configured threshold, quieting the
/// HTTP stack the way the log sinks expect
pub fn init_tracing(log_level: &str) -> Result<(), ConfigError> {
    let directive = match log_level {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        _ => "error", // ERROR and CRITICAL share the tracing error level
    };
    let mut filter = EnvFilter::new(directive);
    for noisy in ["hyper=warn", "reqwest=warn"] {
        filter = filter.add_directive(noisy.parse().map_err(|e| ConfigError::Constraint {
            reason: format!("log filter directive failed to parse: {}", e),
        })?);
    }
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
    Ok(())
}
