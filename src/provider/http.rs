// File: src/provider/http.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiCall, ListPage, ProviderApi};
use crate::catalog::Service;
use crate::constants::http::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use crate::errors::{ApiError, ConfigError};

/// Provider client: JSON-over-HTTP actions at `{base}/{service}/{action}`
/// with bearer authentication
pub struct HttpProvider {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpProvider {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Constraint {
                reason: format!("HTTP client failed to build: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post(&self, service: Service, action: &str, body: &Value) -> Result<Value, ApiError> {
        let url = format!("{}/{}/{}", self.base_url, service.as_str(), action);
        debug!(kind = "api_request", %url, "provider call");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Value>()
                .await
                .map_err(|e| ApiError::transport(format!("unreadable response body: {}", e)));
        }

        // Error bodies carry {"code", "message"}; tolerate anything else
        let text = resp.text().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_str(&text).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(text);
        Err(ApiError {
            status: Some(status.as_u16()),
            code,
            message,
        })
    }
}

#[async_trait]
impl ProviderApi for HttpProvider {
    async fn list_page(
        &self,
        service: Service,
        action: &str,
        filters: Option<&Value>,
        next_token: Option<&str>,
    ) -> Result<ListPage, ApiError> {
        let mut body = json!({});
        if let Some(filters) = filters {
            body["Filters"] = filters.clone();
        }
        if let Some(token) = next_token {
            body["NextToken"] = json!(token);
        }
        let page = self.post(service, action, &body).await?;
        let next_token = page
            .get("NextToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(ListPage {
            body: page,
            next_token,
        })
    }

    async fn invoke(&self, call: &ApiCall) -> Result<Value, ApiError> {
        self.post(call.service, &call.action, &call.params).await
    }
}
