//! Error taxonomy for the scheduler
//!
//! Configuration errors are fatal at startup; queue and provider errors are
//! classified so the acknowledge decision stays a pure function of the class.

use std::fmt;

/// Configuration error variants; any of these aborts startup
#[derive(Debug)]
pub enum ConfigError {
    /// Required setting absent from the environment
    MissingRequired { key: &'static str },

    /// Setting present but unparseable
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Settings individually valid but mutually inconsistent
    Constraint { reason: String },

    /// Catalog table failed its startup validation
    Catalog { reason: String },
}

/// Queue communication error variants
#[derive(Debug)]
pub enum QueueError {
    /// Encoded message exceeds the configured byte cap
    Oversize { bytes: usize, cap: usize },

    /// Send failed after bounded retries
    Send { reason: String },

    /// Receive failed
    Receive { reason: String },

    /// Delete (acknowledge) failed
    Delete { reason: String },

    /// Visibility release failed
    Release { reason: String },

    /// Dead-letter transfer failed
    DeadLetter { reason: String },
}

/// How a failed provider call should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Already in the desired state; acknowledge and log at INFO
    Benign,

    /// Throttling, 5xx, timeout; let the queue redeliver once
    Transient,

    /// Authorization or validation failure; dead-letter immediately
    Permanent,
}

/// Error codes the provider returns when a resource is already in the state
/// the operation would put it in
const BENIGN_CODES: &[&str] = &[
    "IncorrectState",
    "IncorrectInstanceState",
    "InvalidDbInstanceState",
    "InvalidDbClusterState",
    "NoUpdatesToBePerformed",
];

/// One failed provider API call
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status, absent for connect failures and timeouts
    pub status: Option<u16>,

    /// Provider error code, when the response body carried one
    pub code: Option<String>,

    pub message: String,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        if let Some(code) = &self.code {
            if BENIGN_CODES.contains(&code.as_str()) {
                return ErrorClass::Benign;
            }
        }
        match self.status {
            None => ErrorClass::Transient,
            Some(429) => ErrorClass::Transient,
            Some(s) if (500..=599).contains(&s) => ErrorClass::Transient,
            Some(_) => ErrorClass::Permanent,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired { key } => {
                write!(f, "Missing required setting: {}", key)
            }
            ConfigError::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value '{}' for '{}': {}", value, key, reason)
            }
            ConfigError::Constraint { reason } => {
                write!(f, "Inconsistent configuration: {}", reason)
            }
            ConfigError::Catalog { reason } => {
                write!(f, "Invalid catalog entry: {}", reason)
            }
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Oversize { bytes, cap } => {
                write!(
                    f,
                    "Encoded message is {} bytes, cap is {}; raise QueueMessageBytesMax",
                    bytes, cap
                )
            }
            QueueError::Send { reason } => write!(f, "Queue send failed: {}", reason),
            QueueError::Receive { reason } => write!(f, "Queue receive failed: {}", reason),
            QueueError::Delete { reason } => write!(f, "Queue delete failed: {}", reason),
            QueueError::Release { reason } => write!(f, "Queue release failed: {}", reason),
            QueueError::DeadLetter { reason } => {
                write!(f, "Dead-letter transfer failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.code) {
            (Some(status), Some(code)) => {
                write!(f, "Provider error {} ({}): {}", code, status, self.message)
            }
            (Some(status), None) => write!(f, "Provider error ({}): {}", status, self.message),
            _ => write!(f, "Provider unreachable: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for QueueError {}
impl std::error::Error for ApiError {}
