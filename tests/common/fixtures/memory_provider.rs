//! In-memory provider fake
//!
//! Serves pre-registered list pages and records every invocation, with
//! switches for failing enumerations and operations.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use offhours::catalog::Service;
use offhours::errors::ApiError;
use offhours::provider::{ApiCall, ListPage, ProviderApi};

#[derive(Default)]
pub struct MemoryProvider {
    /// "{service}/{action}" -> ordered page bodies
    pages: Mutex<HashMap<String, Vec<Value>>>,
    /// list actions that fail with a transport error
    broken_listings: Mutex<Vec<String>>,
    /// "{action}" -> error every invocation returns
    invoke_errors: Mutex<HashMap<String, ApiError>>,
    invocations: Mutex<Vec<ApiCall>>,
}

fn key(service: Service, action: &str) -> String {
    format!("{}/{}", service, action)
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one list-response page; call repeatedly for pagination
    pub fn add_page(&self, service: Service, action: &str, body: Value) {
        self.pages
            .lock()
            .unwrap()
            .entry(key(service, action))
            .or_default()
            .push(body);
    }

    pub fn break_listing(&self, service: Service, action: &str) {
        self.broken_listings.lock().unwrap().push(key(service, action));
    }

    pub fn fail_invocations(&self, action: &str, error: ApiError) {
        self.invoke_errors
            .lock()
            .unwrap()
            .insert(action.to_string(), error);
    }

    pub fn invocations(&self) -> Vec<ApiCall> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderApi for MemoryProvider {
    async fn list_page(
        &self,
        service: Service,
        action: &str,
        _filters: Option<&Value>,
        next_token: Option<&str>,
    ) -> Result<ListPage, ApiError> {
        let key = key(service, action);
        if self.broken_listings.lock().unwrap().contains(&key) {
            return Err(ApiError::transport("listing disabled by test"));
        }

        let pages = self.pages.lock().unwrap();
        let bodies = pages.get(&key).cloned().unwrap_or_default();
        let index: usize = next_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let body = bodies.get(index).cloned().unwrap_or_else(|| json!({}));
        let next_token = (index + 1 < bodies.len()).then(|| (index + 1).to_string());
        Ok(ListPage { body, next_token })
    }

    async fn invoke(&self, call: &ApiCall) -> Result<Value, ApiError> {
        self.invocations.lock().unwrap().push(call.clone());
        if let Some(error) = self.invoke_errors.lock().unwrap().get(&call.action) {
            return Err(error.clone());
        }
        Ok(json!({"Accepted": true}))
    }
}
