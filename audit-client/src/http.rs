//! HTTP record source for the upstream reporting service

use crate::config::ClientConfig;
use crate::source::{Endpoint, RecordSource};
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{CrmEventWire, OrderDetailWire};

/// Request body of both endpoints
#[derive(Debug, Serialize)]
struct RecordQuery<'a> {
    pedido: &'a str,
}

/// Network record source
#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRecordSource {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    async fn post_records<T: DeserializeOwned>(&self, endpoint: Endpoint, id: &str) -> ClientResult<Vec<T>> {
        let mut req = self
            .client
            .post(self.url(endpoint))
            .json(&RecordQuery { pedido: id });
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                endpoint: endpoint.path(),
                status: status.as_u16(),
                body,
            });
        }
        let body: Value = response.json().await?;
        Ok(records_from_body(endpoint, id, body))
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn order_details(&self, id: &str) -> ClientResult<Vec<OrderDetailWire>> {
        self.post_records(Endpoint::OrderDetails, id).await
    }

    async fn crm_events(&self, id: &str) -> ClientResult<Vec<CrmEventWire>> {
        self.post_records(Endpoint::CrmEvents, id).await
    }
}

/// Decode a response body into records.
///
/// `null` and non-array bodies count as zero records; array elements that
/// are not records are skipped one by one.
pub fn records_from_body<T: DeserializeOwned>(endpoint: Endpoint, id: &str, body: Value) -> Vec<T> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            tracing::warn!(
                endpoint = endpoint.path(),
                id,
                "Expected an array of records, got {}",
                json_kind(&other)
            );
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(endpoint = endpoint.path(), id, index, "Skipping undecodable record: {e}");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
