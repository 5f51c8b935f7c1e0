//! HTTP record store for per-conversation roster and personality records.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Url};
use std::time::Duration;
use tracing::debug;

use super::client::{map_transport_error, BackendClientConfig};
use crate::domain::models::Session;
use crate::domain::ports::{GatewayError, GatewayResult, RecordPath, RecordPayload, RecordStore};

/// Reads `GET {base_url}/records/{path}/{record_id}`.
///
/// `record_id` is opaque and is sent as a single percent-encoded segment.
pub struct HttpRecordStore {
    http_client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl HttpRecordStore {
    pub fn new(config: &BackendClientConfig) -> GatewayResult<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(config.rpc_timeout)
            .build()
            .map_err(|e| GatewayError::Unknown(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::Unknown(format!("invalid base URL {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Unknown(format!(
                "base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            timeout: config.rpc_timeout,
        })
    }

    fn record_url(&self, path: RecordPath, record_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["records", path.as_str(), record_id]);
        }
        url
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch(
        &self,
        session: &Session,
        path: RecordPath,
        record_id: &str,
    ) -> GatewayResult<RecordPayload> {
        let url = self.record_url(path, record_id);
        debug!(%path, record_id, "fetching record");

        let mut request = self.http_client.get(url);
        if let Some(token) = &session.token {
            request = request.bearer_auth(token);
        }

        let fetch = async {
            let response = request.send().await.map_err(|e| map_transport_error(&e))?;
            let status = response.status();
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("application/json"));
            let bytes = response.bytes().await.map_err(|e| map_transport_error(&e))?;

            if !status.is_success() {
                return Err(GatewayError::from_status(
                    status.as_u16(),
                    &String::from_utf8_lossy(&bytes),
                ));
            }

            if is_json {
                Ok(RecordPayload::Json(serde_json::from_slice(&bytes)?))
            } else {
                Ok(RecordPayload::Raw(bytes.to_vec()))
            }
        };

        tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| GatewayError::Timeout)?
    }
}
