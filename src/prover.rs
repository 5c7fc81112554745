//! Proof request client
//!
//! Submits the normalized signature, public key coordinates, and message
//! hash to the external zero-knowledge proving service. The circuit consumes
//! little-endian limbs, so every 32-byte input is byte-reversed relative to
//! its natural big-endian form before transmission. A single request, no
//! retry; any failure surfaces as [`ExternalServiceError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ExternalServiceError;
use crate::settings::ProverSettings;

/// Circuit inputs in their natural big-endian form
#[derive(Debug, Clone)]
pub struct ProofInputs {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub pubkey_x: [u8; 32],
    pub pubkey_y: [u8; 32],
    pub message_hash: [u8; 32],
}

/// External proving service boundary
#[async_trait]
pub trait ProofService: Send + Sync {
    /// Generate a signature proof for the given inputs
    ///
    /// # Errors
    /// Returns `ExternalServiceError` on network failure, a non-2xx
    /// response, or a malformed response payload.
    async fn prove(&self, inputs: &ProofInputs) -> Result<Vec<u8>, ExternalServiceError>;
}

/// Wire body of `POST /prove_evm`; all byte fields little-endian
#[derive(Serialize, Debug)]
struct ProveRequestBody {
    r: Vec<u8>,
    s: Vec<u8>,
    pubkey_x: Vec<u8>,
    pubkey_y: Vec<u8>,
    msghash: Vec<u8>,
    proving_key_path: String,
}

#[derive(Deserialize, Debug)]
struct ProveResponseBody {
    data: String, // Hex-encoded proof blob
}

/// HTTP client for the proving service
pub struct HttpProverClient {
    settings: ProverSettings,
    client: reqwest::Client,
}

impl HttpProverClient {
    #[must_use]
    pub fn new(settings: ProverSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, inputs: &ProofInputs) -> ProveRequestBody {
        ProveRequestBody {
            r: reversed(&inputs.r),
            s: reversed(&inputs.s),
            pubkey_x: reversed(&inputs.pubkey_x),
            pubkey_y: reversed(&inputs.pubkey_y),
            msghash: reversed(&inputs.message_hash),
            proving_key_path: self.settings.proving_key_path.clone(),
        }
    }
}

#[async_trait]
impl ProofService for HttpProverClient {
    async fn prove(&self, inputs: &ProofInputs) -> Result<Vec<u8>, ExternalServiceError> {
        let url = format!("{}/prove_evm", self.settings.endpoint.trim_end_matches('/'));
        log::debug!("Requesting signature proof from {url}");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(inputs))
            .send()
            .await
            .map_err(|e| ExternalServiceError(format!("Proving service request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ExternalServiceError(format!(
                "Proving service returned status: {}",
                response.status()
            )));
        }

        let body: ProveResponseBody = response.json().await.map_err(|e| {
            ExternalServiceError(format!("Failed to parse proving service response: {e}"))
        })?;

        let proof = hex::decode(body.data.trim_start_matches("0x"))
            .map_err(|e| ExternalServiceError(format!("Proof blob is not valid hex: {e}")))?;

        log::debug!("Received {} byte proof", proof.len());
        Ok(proof)
    }
}

/// Byte-reverse a 32-byte big-endian value into little-endian limbs
#[must_use]
pub fn reversed(bytes: &[u8; 32]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_are_byte_reversed_for_the_circuit() {
        let mut value = [0u8; 32];
        value[0] = 0x01;
        value[31] = 0xFF;

        let wire = reversed(&value);
        assert_eq!(wire[0], 0xFF);
        assert_eq!(wire[31], 0x01);
        assert_eq!(wire.len(), 32);
    }

    #[test]
    fn request_body_carries_proving_key_path() {
        let client = HttpProverClient::new(ProverSettings {
            endpoint: "http://localhost:8000".to_string(),
            proving_key_path: "./keys/proving_key.pk".to_string(),
        });
        let inputs = ProofInputs {
            r: [1; 32],
            s: [2; 32],
            pubkey_x: [3; 32],
            pubkey_y: [4; 32],
            message_hash: [5; 32],
        };

        let body = client.request_body(&inputs);
        assert_eq!(body.proving_key_path, "./keys/proving_key.pk");
        assert_eq!(body.r, vec![1; 32]);
        assert_eq!(body.msghash, vec![5; 32]);

        // Byte fields serialize as JSON arrays of numbers.
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["s"].as_array().is_some_and(|a| a.len() == 32));
    }
}
