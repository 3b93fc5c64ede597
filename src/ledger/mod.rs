//! Ledger gateway client.
//!
//! Submits certificate digests to a distributed-ledger gateway over HTTP.
//! The engine knows two operations: submit a digest, read one back. Peer
//! topology, channels and endorsement live entirely behind the gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::domain::{CertificateId, Hash256};
use crate::infra::{EngineError, LedgerReceipt, LedgerService, Result};

/// Ledger gateway configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Gateway base URL
    pub endpoint: String,
    /// Bearer token for the gateway, if it requires one
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when `LEDGER_GATEWAY_URL` is unset; anchoring is then
    /// unavailable and anchor attempts fail as terminal external errors.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("LEDGER_GATEWAY_URL").ok()?;
        let auth_token = std::env::var("LEDGER_GATEWAY_TOKEN").ok();
        let request_timeout = std::env::var("LEDGER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Some(Self {
            endpoint,
            auth_token,
            request_timeout,
        })
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    certificate_id: &'a str,
    digest: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    tx_id: String,
    digest: String,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct QueryResponse {
    digest: String,
}

/// HTTP client for the ledger gateway
pub struct HttpLedgerClient {
    config: LedgerConfig,
    client: reqwest::Client,
}

impl HttpLedgerClient {
    pub fn new(config: LedgerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { config, client }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Timeouts and connection failures are retryable; the gateway rejecting
    /// the request is not.
    fn transport_error(operation: &'static str, err: reqwest::Error) -> EngineError {
        let retryable = err.is_timeout() || err.is_connect() || err.is_request();
        EngineError::external(operation, retryable, err.to_string())
    }

    fn decode_digest(operation: &'static str, digest_hex: &str) -> Result<Hash256> {
        hex::decode(digest_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                EngineError::external(
                    operation,
                    false,
                    format!("gateway returned malformed digest {digest_hex:?}"),
                )
            })
    }
}

#[async_trait]
impl LedgerService for HttpLedgerClient {
    async fn submit(
        &self,
        certificate_id: CertificateId,
        digest: Hash256,
    ) -> Result<LedgerReceipt> {
        let url = format!("{}/v1/anchors", self.config.endpoint);
        let certificate_id_str = certificate_id.to_string();

        let response = self
            .request(self.client.post(&url))
            .json(&SubmitRequest {
                certificate_id: &certificate_id_str,
                digest: hex::encode(digest),
            })
            .send()
            .await
            .map_err(|e| Self::transport_error("ledger submit", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::external(
                "ledger submit",
                status.is_server_error(),
                format!("gateway returned {status}"),
            ));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| EngineError::external("ledger submit", false, e.to_string()))?;

        let receipt = LedgerReceipt {
            tx_id: body.tx_id,
            digest: Self::decode_digest("ledger submit", &body.digest)?,
            timestamp: body.timestamp,
        };

        info!(
            certificate_id = %certificate_id,
            tx_id = %receipt.tx_id,
            "certificate digest anchored"
        );
        Ok(receipt)
    }

    async fn query(&self, certificate_id: CertificateId) -> Result<Option<Hash256>> {
        let url = format!("{}/v1/anchors/{}", self.config.endpoint, certificate_id);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Self::transport_error("ledger query", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::external(
                "ledger query",
                status.is_server_error(),
                format!("gateway returned {status}"),
            ));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| EngineError::external("ledger query", false, e.to_string()))?;

        Ok(Some(Self::decode_digest("ledger query", &body.digest)?))
    }
}
