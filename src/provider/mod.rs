//! Provider API seam.
//!
//! The catalog decides *what* to call; this module owns *how*: a trait the
//! find and do stages depend on, with an HTTP implementation in [`http`]
//! and in-memory fakes on the test side. Failures come back as
//! [`ApiError`], whose classification drives the acknowledge decision.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::catalog::Service;
use crate::errors::ApiError;

/// One provider API invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub service: Service,
    pub action: String,
    pub params: Value,
}

/// One page of a lazy enumeration
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Raw response body; the catalog entry knows how to flatten it
    pub body: Value,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Fetch one page of a list action; `filters` follows the provider's
    /// `[{Name, Values}]` convention and may be absent
    async fn list_page(
        &self,
        service: Service,
        action: &str,
        filters: Option<&Value>,
        next_token: Option<&str>,
    ) -> Result<ListPage, ApiError>;

    /// Invoke an operation; success means the provider accepted the work,
    /// not that it has completed
    async fn invoke(&self, call: &ApiCall) -> Result<Value, ApiError>;
}
