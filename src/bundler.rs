//! Bundler RPC client and user operation types
//!
//! Account-abstraction transactions are submitted as user operations to a
//! bundler over JSON-RPC: `eth_sendUserOperation` returns the operation
//! hash, `eth_getUserOperationReceipt` returns the inclusion receipt or
//! `null` while the operation is pending.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ExternalServiceError;
use crate::settings::BundlerSettings;

/// An ERC-4337 user operation, built transiently per transaction
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: String,                   // Smart account address
    pub nonce: String,                    // 0x-hex quantity
    pub init_code: String,                // Factory call, "0x" once deployed
    pub call_data: String,                // Encoded account execution call
    pub call_gas_limit: String,           // 0x-hex quantity
    pub verification_gas_limit: String,   // 0x-hex quantity
    pub pre_verification_gas: String,     // 0x-hex quantity
    pub max_fee_per_gas: String,          // 0x-hex quantity
    pub max_priority_fee_per_gas: String, // 0x-hex quantity
    pub paymaster_and_data: String,       // Paymaster address plus payload
    pub signature: String,                // 0x-hex proof blob
}

/// Inner transaction receipt of an included user operation
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

/// Receipt returned by `eth_getUserOperationReceipt`
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    #[serde(default)]
    pub user_op_hash: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    pub receipt: TransactionReceipt,
}

/// Bundler JSON-RPC boundary
#[async_trait]
pub trait BundlerRpc: Send + Sync {
    /// Submit a user operation; returns the user operation hash
    ///
    /// # Errors
    /// Returns `ExternalServiceError` on network failure, a non-2xx
    /// response, or an RPC-level error.
    async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
        entry_point: &str,
    ) -> Result<String, ExternalServiceError>;

    /// Query the receipt for a submitted user operation; `None` while pending
    ///
    /// # Errors
    /// Returns `ExternalServiceError` on network failure, a non-2xx
    /// response, or an RPC-level error.
    async fn get_user_operation_receipt(
        &self,
        user_op_hash: &str,
    ) -> Result<Option<UserOperationReceipt>, ExternalServiceError>;
}

#[derive(Serialize, Debug)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for a bundler endpoint
pub struct HttpBundlerClient {
    settings: BundlerSettings,
    client: reqwest::Client,
    request_id: AtomicU64,
}

impl HttpBundlerClient {
    #[must_use]
    pub fn new(settings: BundlerSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
            request_id: AtomicU64::new(1),
        }
    }

    async fn call(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ExternalServiceError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        log::debug!("Bundler RPC call: {method}");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExternalServiceError(format!("Bundler request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ExternalServiceError(format!(
                "Bundler returned status: {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ExternalServiceError(format!("Failed to parse bundler response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ExternalServiceError(format!(
                "Bundler RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(body.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl BundlerRpc for HttpBundlerClient {
    async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
        entry_point: &str,
    ) -> Result<String, ExternalServiceError> {
        let params = serde_json::json!([user_operation, entry_point]);
        let result = self.call("eth_sendUserOperation", params).await?;

        result.as_str().map(ToString::to_string).ok_or_else(|| {
            ExternalServiceError("eth_sendUserOperation did not return a hash".to_string())
        })
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: &str,
    ) -> Result<Option<UserOperationReceipt>, ExternalServiceError> {
        let params = serde_json::json!([user_op_hash]);
        let result = self.call("eth_getUserOperationReceipt", params).await?;

        if result.is_null() {
            return Ok(None);
        }

        let receipt: UserOperationReceipt = serde_json::from_value(result)
            .map_err(|e| ExternalServiceError(format!("Malformed user operation receipt: {e}")))?;
        Ok(Some(receipt))
    }
}

/// Format an integer as a 0x-prefixed hex quantity
#[must_use]
pub fn hex_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_operation_serializes_camel_case() {
        let op = UserOperation {
            sender: "0xDb53929659505D0979FcC0ec9889e373a62eeE32".to_string(),
            nonce: hex_quantity(7),
            init_code: "0x".to_string(),
            call_data: "0x68656c6c6f".to_string(),
            call_gas_limit: hex_quantity(900_000),
            verification_gas_limit: hex_quantity(900_000),
            pre_verification_gas: hex_quantity(900_000),
            max_fee_per_gas: hex_quantity(1_000_000_000),
            max_priority_fee_per_gas: hex_quantity(1_000_000_000),
            paymaster_and_data: "0x".to_string(),
            signature: "0x".to_string(),
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["callGasLimit"], "0xdbba0");
        assert_eq!(json["paymasterAndData"], "0x");
        assert_eq!(json["nonce"], "0x7");
        assert!(json.get("call_gas_limit").is_none());
    }

    #[test]
    fn null_receipt_deserializes_to_none() {
        let body: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(body.result.unwrap_or(serde_json::Value::Null).is_null());
        assert!(body.error.is_none());
    }

    #[test]
    fn rpc_error_carries_code_and_message() {
        let body: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid params"}}"#,
        )
        .unwrap();
        let error = body.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "invalid params");
    }

    #[test]
    fn receipt_parses_nested_transaction_hash() {
        let receipt: UserOperationReceipt = serde_json::from_str(
            r#"{"userOpHash":"0xabc","success":true,"receipt":{"transactionHash":"0xdef","blockNumber":"0x10"}}"#,
        )
        .unwrap();
        assert_eq!(receipt.receipt.transaction_hash, "0xdef");
        assert_eq!(receipt.user_op_hash.as_deref(), Some("0xabc"));
    }
}
