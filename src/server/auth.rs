//! Optional request-authentication gate.
//!
//! When enabled, every request must carry a signed nonce in three headers.
//! The gate verifies the signature through a pluggable [`SignatureVerifier`]
//! and may additionally consult an external [`SubscriptionLedger`]. Any
//! rejection (missing headers, undecodable values, bad signature, no
//! subscription) is an HTTP 403 carrying JSON-RPC error code `-32099`.
//!
//! The signature scheme itself is external to the server. The bundled
//! [`Ed25519Verifier`] expects the public-key header to be base64-encoded
//! 32-byte ed25519 key material and the signature header a base64-encoded
//! 64-byte signature over the UTF-8 nonce.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::warn;

use crate::crypto::base64_decode;
use crate::error::{A2AError, Result};
use crate::types::{JsonRpcErrorResponse, RequestId};

/// Header carrying the base64 signature.
pub const SIGNATURE_HEADER: &str = "X-Solana-Signature";
/// Header carrying the UTF-8 nonce that was signed.
pub const NONCE_HEADER: &str = "X-Solana-Nonce";
/// Header carrying the requester's public key.
pub const PUBLIC_KEY_HEADER: &str = "X-Solana-PublicKey";

/// Verifies a signature over a nonce. The public key arrives as the raw
/// header string; its encoding is a property of the scheme, not the gate.
pub trait SignatureVerifier: Send + Sync {
    /// Returns true if `signature` is valid for `nonce` under `public_key`.
    fn verify(&self, public_key: &str, nonce: &[u8], signature: &[u8]) -> bool;
}

/// Read-only view of an external subscription ledger.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Returns whether `user` holds an active subscription to `agent`.
    async fn has_active_subscription(&self, user: &str, agent: &str) -> Result<bool>;
}

/// ed25519 signature verification via `ed25519-dalek`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, public_key: &str, nonce: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = base64_decode(public_key) else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        key.verify(nonce, &Signature::from_bytes(&sig_bytes)).is_ok()
    }
}

/// Optional environment configuration read when the gate is enabled. None
/// of these affect core task logic; they parameterize the external
/// verifier/ledger implementations.
#[derive(Debug, Clone, Default)]
pub struct GateEnv {
    /// The agent's identity key, checked against the ledger.
    pub agent_key: Option<String>,
    /// The on-chain program id of the subscription ledger.
    pub ledger_program_id: Option<String>,
    /// RPC endpoint for ledger queries.
    pub ledger_rpc_url: Option<String>,
    /// Key of the wallet receiving service payments.
    pub service_wallet_key: Option<String>,
}

impl GateEnv {
    /// Reads the recognized variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            agent_key: std::env::var("A2A_AGENT_KEY").ok(),
            ledger_program_id: std::env::var("A2A_LEDGER_PROGRAM_ID").ok(),
            ledger_rpc_url: std::env::var("A2A_LEDGER_RPC_URL").ok(),
            service_wallet_key: std::env::var("A2A_SERVICE_WALLET_KEY").ok(),
        }
    }
}

/// The pre-dispatch request filter.
pub struct AuthGate {
    verifier: Arc<dyn SignatureVerifier>,
    ledger: Option<Arc<dyn SubscriptionLedger>>,
    agent_key: Option<String>,
}

impl AuthGate {
    /// Creates a gate that only checks the signed nonce.
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            verifier,
            ledger: None,
            agent_key: None,
        }
    }

    /// Creates a gate using the bundled ed25519 verifier.
    #[must_use]
    pub fn ed25519() -> Self {
        Self::new(Arc::new(Ed25519Verifier))
    }

    /// Additionally requires an active subscription for this agent identity.
    #[must_use]
    pub fn with_ledger(
        mut self,
        ledger: Arc<dyn SubscriptionLedger>,
        agent_key: impl Into<String>,
    ) -> Self {
        self.ledger = Some(ledger);
        self.agent_key = Some(agent_key.into());
        self
    }

    /// Checks one request's headers. `Err` means reject with 403.
    pub async fn check(&self, headers: &HeaderMap) -> Result<()> {
        let signature_b64 = header_str(headers, SIGNATURE_HEADER)?;
        let nonce = header_str(headers, NONCE_HEADER)?;
        let public_key = header_str(headers, PUBLIC_KEY_HEADER)?;

        let signature = base64_decode(signature_b64)
            .map_err(|_| A2AError::auth_failed("signature is not valid base64"))?;

        if !self.verifier.verify(public_key, nonce.as_bytes(), &signature) {
            return Err(A2AError::auth_failed("signature verification failed"));
        }

        if let (Some(ledger), Some(agent_key)) = (&self.ledger, &self.agent_key) {
            let active = ledger
                .has_active_subscription(public_key, agent_key)
                .await
                .map_err(|e| {
                    A2AError::auth_failed(format!("subscription lookup failed: {}", e.message))
                })?;
            if !active {
                return Err(A2AError::auth_failed("no active subscription"));
            }
        }

        Ok(())
    }

    /// Builds the HTTP 403 response for a rejected request.
    #[must_use]
    pub fn reject(error: A2AError) -> Response {
        warn!(code = error.code, message = %error.message, "request rejected by auth gate");
        let body = JsonRpcErrorResponse::new(RequestId::Null, error);
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| A2AError::auth_failed(format!("missing or invalid {} header", name)))
}
