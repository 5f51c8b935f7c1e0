//! Live RPC client for the matching backend.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{
    EmbeddingAck, MatchPair, MatchingStatus, OptInResponse, Session, SimilarUsers,
    UserAggregatedTraits,
};
use crate::domain::ports::{GatewayError, GatewayResult, MatchGateway};

/// Configuration for the live backend client
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    /// Base URL of the backend
    pub base_url: String,

    /// Per-call deadline
    pub rpc_timeout: Duration,
}

impl Default for BackendClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7350".to_string(),
            rpc_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Map a transport error onto the gateway taxonomy.
pub(crate) fn map_transport_error(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_decode() {
        GatewayError::Serialization(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

/// Redact a bearer token for logging.
pub(crate) fn redact_token(token: Option<&str>) -> String {
    match token {
        Some(t) if t.chars().count() > 8 => {
            format!("{}...[REDACTED]", t.chars().take(8).collect::<String>())
        }
        Some(_) => "[REDACTED]".to_string(),
        None => "none".to_string(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusEnvelope {
    #[serde(default)]
    matching_status: Option<MatchingStatus>,
}

#[derive(Deserialize)]
struct CurrentMatchEnvelope {
    #[serde(default, rename = "match")]
    current: Option<MatchPair>,
}

#[derive(Deserialize)]
struct SuccessEnvelope {
    #[serde(default)]
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingRequest<'a> {
    user_id: &'a str,
    traits: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimilarRequest<'a> {
    user_id: &'a str,
    top_k: usize,
    include_vectors: bool,
}

/// HTTP client speaking the backend's RPC surface.
///
/// Every RPC is `POST {base_url}/v2/rpc/{id}` with a JSON body and a
/// bearer token; every call is bounded by `rpc_timeout`.
pub struct LiveMatchGateway {
    http_client: ReqwestClient,
    base_url: String,
    rpc_timeout: Duration,
}

impl LiveMatchGateway {
    pub fn new(config: BackendClientConfig) -> GatewayResult<Self> {
        info!(
            base_url = %config.base_url,
            timeout_ms = config.rpc_timeout.as_millis() as u64,
            "initializing matching backend client"
        );

        let http_client = ReqwestClient::builder()
            .timeout(config.rpc_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| GatewayError::Unknown(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rpc_timeout: config.rpc_timeout,
        })
    }

    fn require_identity(session: &Session) -> GatewayResult<()> {
        if session.has_identity() {
            Ok(())
        } else {
            Err(GatewayError::MissingIdentity)
        }
    }

    /// Send one RPC and return the raw JSON answer. `None` means the
    /// backend answered 404 or an empty/`null` body.
    async fn call_raw(&self, session: &Session, rpc_id: &str, body: Value) -> GatewayResult<Option<Value>> {
        let url = format!("{}/v2/rpc/{}", self.base_url, rpc_id);
        debug!(
            rpc = rpc_id,
            token = %redact_token(session.token.as_deref()),
            "sending rpc"
        );

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(token) = &session.token {
            request = request.bearer_auth(token);
        }

        let send = async {
            let response = request.send().await.map_err(|e| map_transport_error(&e))?;
            let status = response.status();
            let text = response.text().await.map_err(|e| map_transport_error(&e))?;
            Ok::<_, GatewayError>((status, text))
        };

        let (status, text) = tokio::time::timeout(self.rpc_timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout)??;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error = GatewayError::from_status(status.as_u16(), &text);
            warn!(rpc = rpc_id, status = status.as_u16(), "rpc failed");
            return Err(error);
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&text)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn call<T: DeserializeOwned>(&self, session: &Session, rpc_id: &str, body: Value) -> GatewayResult<Option<T>> {
        match self.call_raw(session, rpc_id, body).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn call_required<T: DeserializeOwned>(&self, session: &Session, rpc_id: &str, body: Value) -> GatewayResult<T> {
        self.call(session, rpc_id, body).await?.ok_or_else(|| {
            GatewayError::from_status(404, &format!("rpc {rpc_id} returned no result"))
        })
    }
}

#[async_trait]
impl MatchGateway for LiveMatchGateway {
    fn name(&self) -> &'static str {
        "live"
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn can_participate(&self, session: &Session) -> GatewayResult<bool> {
        if !session.has_identity() {
            return Ok(false);
        }
        let traits = self.get_user_traits(session).await?;
        Ok(traits.is_some_and(|t| t.has_traits()))
    }

    async fn get_status(&self, session: &Session) -> GatewayResult<Option<MatchingStatus>> {
        Self::require_identity(session)?;
        let envelope: Option<StatusEnvelope> =
            self.call(session, "get_user_match_status", json!({})).await?;
        Ok(envelope.and_then(|e| e.matching_status))
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn opt_in(&self, session: &Session) -> GatewayResult<Option<OptInResponse>> {
        Self::require_identity(session)?;
        self.call(session, "opt_in_match", json!({})).await
    }

    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    async fn opt_out(&self, session: &Session) -> GatewayResult<bool> {
        Self::require_identity(session)?;
        let envelope: Option<SuccessEnvelope> =
            self.call(session, "opt_out_match", json!({})).await?;
        Ok(envelope.is_some_and(|e| e.success))
    }

    async fn get_current_match(&self, session: &Session) -> GatewayResult<Option<MatchPair>> {
        Self::require_identity(session)?;
        let envelope: Option<CurrentMatchEnvelope> =
            self.call(session, "get_current_match", json!({})).await?;
        Ok(envelope.and_then(|e| e.current))
    }

    async fn get_user_traits(
        &self,
        session: &Session,
    ) -> GatewayResult<Option<UserAggregatedTraits>> {
        Self::require_identity(session)?;
        self.call(session, "get_user_traits", json!({})).await
    }

    #[instrument(skip(self, session, traits), fields(user_id = %session.user_id, trait_count = traits.len()))]
    async fn generate_match_embeddings(
        &self,
        session: &Session,
        traits: &[String],
    ) -> GatewayResult<EmbeddingAck> {
        Self::require_identity(session)?;
        let body = serde_json::to_value(EmbeddingRequest {
            user_id: &session.user_id,
            traits,
        })?;
        self.call_required(session, "generate_match_embeddings", body).await
    }

    async fn find_similar_users(
        &self,
        session: &Session,
        top_k: usize,
        include_vectors: bool,
    ) -> GatewayResult<SimilarUsers> {
        Self::require_identity(session)?;
        let body = serde_json::to_value(SimilarRequest {
            user_id: &session.user_id,
            top_k,
            include_vectors,
        })?;
        Ok(self
            .call(session, "find_similar_users", body)
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_token() {
        assert_eq!(redact_token(Some("abcdefghijkl")), "abcdefgh...[REDACTED]");
        assert_eq!(redact_token(Some("short")), "[REDACTED]");
        assert_eq!(redact_token(None), "none");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway = LiveMatchGateway::new(BackendClientConfig {
            base_url: "http://localhost:1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(gateway.base_url, "http://localhost:1");
    }

    #[tokio::test]
    async fn test_missing_identity_is_not_eligible() {
        let gateway = LiveMatchGateway::new(BackendClientConfig::default()).unwrap();
        assert!(!gateway.can_participate(&Session::new("")).await.unwrap());
        assert!(matches!(
            gateway.get_status(&Session::new("")).await,
            Err(GatewayError::MissingIdentity)
        ));
    }
}
