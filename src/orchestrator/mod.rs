//! Transaction orchestration state machine
//!
//! Drives the two passkey flows end to end. Registration creates a platform
//! credential and persists its public key. Signing walks a strictly linear
//! stage sequence: assert against a challenge, prove the signature
//! externally, assemble a user operation carrying the proof, submit it to
//! the bundler, and poll for the inclusion receipt.
//!
//! One run at a time: starting a flow while another is in flight is a
//! silent no-op. On failure the stage is deliberately left where the run
//! failed so a UI can show which step broke; [`Orchestrator::reset`] is the
//! explicit transition back to [`TransactionStage::Unsent`].

mod platform;

pub use platform::PlatformAuthenticator;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::bundler::{hex_quantity, BundlerRpc, UserOperation, UserOperationReceipt};
use crate::errors::{ExternalServiceError, FlowError};
use crate::prover::{ProofInputs, ProofService};
use crate::settings::ZkPasskeySettings;
use crate::store::{CredentialStore, StoredCredential};
use crate::webauthn::{
    attestation, crypto, AssertionOptions, AuthenticatorData, CoseKey, CredentialCreationOptions,
    EcdsaSignature, PublicKeyCredentialParameters, RegistrationResponse, UserEntity, WebAuthnError,
};

/// Stages of one orchestrated transaction, in transition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransactionStage {
    Unsent,
    SigningChallenge,
    CreatingProof,
    VerifyingProof,
    GeneratingUserOp,
    SendingUserOp,
    QueryingForReceipts,
    Confirmed,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStage::Unsent => "Unsent",
            TransactionStage::SigningChallenge => "SigningChallenge",
            TransactionStage::CreatingProof => "CreatingProof",
            TransactionStage::VerifyingProof => "VerifyingProof",
            TransactionStage::GeneratingUserOp => "GeneratingUserOp",
            TransactionStage::SendingUserOp => "SendingUserOp",
            TransactionStage::QueryingForReceipts => "QueryingForReceipts",
            TransactionStage::Confirmed => "Confirmed",
        };
        f.write_str(label)
    }
}

/// Inputs to the registration flow
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub user_id: String,
    pub user_name: String,
    /// Caller-provided challenge; a random one is generated when absent
    pub challenge: Option<String>,
}

/// Inputs to the signing flow
///
/// Call data and init code arrive pre-encoded; contract encoding is the
/// host's concern.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub sender: String,
    pub nonce: u64,
    pub init_code: String,
    pub call_data: String,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    /// Caller-provided challenge; a random one is generated when absent
    pub challenge: Option<String>,
}

/// Result of a confirmed signing flow
#[derive(Debug, Clone)]
pub struct SigningOutcome {
    pub user_op_hash: String,
    pub transaction_hash: String,
    pub receipt: UserOperationReceipt,
}

#[derive(Debug)]
struct RunState {
    stage: TransactionStage,
    in_flight: bool,
    last_error: Option<String>,
    history: Vec<TransactionStage>,
}

impl RunState {
    fn new() -> Self {
        Self {
            stage: TransactionStage::Unsent,
            in_flight: false,
            last_error: None,
            history: Vec::new(),
        }
    }
}

/// The orchestration state machine, owned by the caller
pub struct Orchestrator {
    settings: ZkPasskeySettings,
    platform: Arc<dyn PlatformAuthenticator>,
    store: Arc<dyn CredentialStore>,
    prover: Arc<dyn ProofService>,
    bundler: Arc<dyn BundlerRpc>,
    state: Mutex<RunState>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        settings: ZkPasskeySettings,
        platform: Arc<dyn PlatformAuthenticator>,
        store: Arc<dyn CredentialStore>,
        prover: Arc<dyn ProofService>,
        bundler: Arc<dyn BundlerRpc>,
    ) -> Self {
        Self {
            settings,
            platform,
            store,
            prover,
            bundler,
            state: Mutex::new(RunState::new()),
        }
    }

    /// The stage the most recent run last reached
    #[must_use]
    pub fn current_stage(&self) -> TransactionStage {
        self.lock_state().stage
    }

    /// Error message of the most recent failed run, if any
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Stages the most recent signing run passed through, in order
    #[must_use]
    pub fn stage_history(&self) -> Vec<TransactionStage> {
        self.lock_state().history.clone()
    }

    /// Return to [`TransactionStage::Unsent`] after a failed or confirmed run
    ///
    /// Required before a new attempt once a run has failed; ignored while a
    /// run is in flight.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        if state.in_flight {
            return;
        }
        state.stage = TransactionStage::Unsent;
        state.last_error = None;
        state.history.clear();
    }

    /// Register a new passkey credential and persist it
    ///
    /// Returns `Ok(None)` without invoking the platform API when another run
    /// is in flight or a previous failure has not been [`Orchestrator::reset`].
    ///
    /// # Errors
    /// Returns `FlowError` if the platform prompt fails or the attestation
    /// cannot be parsed.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<Option<StoredCredential>, FlowError> {
        if !self.try_begin() {
            log::debug!("Registration ignored: a run is already in flight");
            return Ok(None);
        }

        let result = self.run_registration(request).await;
        self.finish(result.as_ref().err());
        result.map(Some)
    }

    /// Sign and submit a transaction with a registered passkey
    ///
    /// Returns `Ok(None)` without invoking the platform API when another run
    /// is in flight or a previous failure has not been [`Orchestrator::reset`].
    ///
    /// # Errors
    /// Returns `FlowError` for parsing failures, a store miss, or a proving
    /// service / bundler failure. The visible stage stays where the run
    /// failed.
    pub async fn sign_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<Option<SigningOutcome>, FlowError> {
        if !self.try_begin() {
            log::debug!("Signing ignored: a run is already in flight");
            return Ok(None);
        }

        let result = self.run_signing(request).await;
        self.finish(result.as_ref().err());
        result.map(Some)
    }

    async fn run_registration(
        &self,
        request: &RegistrationRequest,
    ) -> Result<StoredCredential, FlowError> {
        let challenge = request
            .challenge
            .clone()
            .unwrap_or_else(generate_challenge);

        let options = CredentialCreationOptions {
            challenge,
            rp: self.settings.relying_party.clone().into(),
            user: UserEntity {
                id: request.user_id.clone(),
                name: request.user_name.clone(),
                display_name: request.user_name.clone(),
            },
            public_key_params: vec![PublicKeyCredentialParameters::es256()],
            attestation: "direct".to_string(),
        };

        let response = self.platform.create_credential(&options).await?;
        let credential = credential_from_attestation(&response)?;
        self.store.put(&response.id, credential.clone());

        log::info!(
            "Registered credential {} ({} byte public key)",
            response.id,
            credential.credential_public_key.len()
        );
        Ok(credential)
    }

    #[allow(clippy::too_many_lines)]
    async fn run_signing(&self, request: &TransactionRequest) -> Result<SigningOutcome, FlowError> {
        self.set_stage(TransactionStage::SigningChallenge);
        let challenge = request
            .challenge
            .clone()
            .unwrap_or_else(generate_challenge);

        let options = AssertionOptions {
            challenge,
            rp_id: self.settings.relying_party.rp_id.clone(),
        };
        let assertion = self.platform.get_assertion(&options).await?;

        let client_data_json = decode_b64url(&assertion.client_data_json, "client data")?;
        let authenticator_data = decode_b64url(&assertion.authenticator_data, "authenticator data")?;
        let signature_der = decode_b64url(&assertion.signature, "signature")?;

        let parsed_auth = AuthenticatorData::parse(&authenticator_data)?;

        let client_hash = crypto::client_data_hash(&client_data_json);
        let payload = crypto::signing_payload(&authenticator_data, &client_hash);
        let message_hash = crypto::message_hash(&payload);

        let stored = self.store.get(&assertion.id).ok_or_else(|| {
            FlowError::CredentialNotFound(
                "Credential not stored. Please try registering again!".to_string(),
            )
        })?;

        let public_key = CoseKey::decode_first(&stored.credential_public_key)?;
        let pubkey_x = coordinate(public_key.x()?, "x")?;
        let pubkey_y = coordinate(public_key.y()?, "y")?;

        let signature = EcdsaSignature::from_der(&signature_der)?;

        // Cheap local check before paying for a proof.
        crypto::verify_assertion(&pubkey_x, &pubkey_y, &payload, &signature_der)?;

        // Refresh the stored counter; replay rejection stays with the host.
        self.store.put(
            &assertion.id,
            StoredCredential {
                counter: parsed_auth.sign_count,
                last_used: Some(Utc::now()),
                ..stored
            },
        );

        self.set_stage(TransactionStage::CreatingProof);
        let inputs = ProofInputs {
            r: signature.r_scalar(),
            s: signature.s_scalar(),
            pubkey_x,
            pubkey_y,
            message_hash,
        };
        let proof = self.prover.prove(&inputs).await?;

        self.set_stage(TransactionStage::VerifyingProof);
        if proof.is_empty() {
            return Err(ExternalServiceError(
                "Proving service returned an empty proof".to_string(),
            )
            .into());
        }
        log::debug!("Proof accepted ({} bytes)", proof.len());

        self.set_stage(TransactionStage::GeneratingUserOp);
        let user_operation = self.build_user_operation(request, &proof);

        self.set_stage(TransactionStage::SendingUserOp);
        let user_op_hash = self
            .bundler
            .send_user_operation(&user_operation, &self.settings.bundler.entry_point)
            .await?;
        log::info!("User operation submitted: {user_op_hash}");

        self.set_stage(TransactionStage::QueryingForReceipts);
        let receipt = self.poll_for_receipt(&user_op_hash).await?;

        self.set_stage(TransactionStage::Confirmed);
        let transaction_hash = receipt.receipt.transaction_hash.clone();
        log::info!("User operation included: {transaction_hash}");

        Ok(SigningOutcome {
            user_op_hash,
            transaction_hash,
            receipt,
        })
    }

    fn build_user_operation(&self, request: &TransactionRequest, proof: &[u8]) -> UserOperation {
        let wallet = &self.settings.wallet;
        UserOperation {
            sender: request.sender.clone(),
            nonce: hex_quantity(u128::from(request.nonce)),
            init_code: request.init_code.clone(),
            call_data: request.call_data.clone(),
            call_gas_limit: hex_quantity(u128::from(wallet.call_gas_limit)),
            verification_gas_limit: hex_quantity(u128::from(wallet.verification_gas_limit)),
            pre_verification_gas: hex_quantity(u128::from(wallet.pre_verification_gas)),
            max_fee_per_gas: hex_quantity(request.max_fee_per_gas),
            max_priority_fee_per_gas: hex_quantity(request.max_priority_fee_per_gas),
            paymaster_and_data: wallet.paymaster_and_data.clone(),
            signature: format!("0x{}", hex::encode(proof)),
        }
    }

    async fn poll_for_receipt(
        &self,
        user_op_hash: &str,
    ) -> Result<UserOperationReceipt, FlowError> {
        let polling = &self.settings.receipts;
        let interval = Duration::from_millis(polling.interval_ms);

        for attempt in 1..=polling.max_attempts {
            tokio::time::sleep(interval).await;
            match self.bundler.get_user_operation_receipt(user_op_hash).await? {
                Some(receipt) => return Ok(receipt),
                None => log::debug!("Still waiting for receipt (attempt {attempt})"),
            }
        }

        Err(ExternalServiceError(format!(
            "No user operation receipt after {} attempts",
            polling.max_attempts
        ))
        .into())
    }

    /// Atomically claim the single run slot
    fn try_begin(&self) -> bool {
        let mut state = self.lock_state();
        let startable = matches!(
            state.stage,
            TransactionStage::Unsent | TransactionStage::Confirmed
        );
        if state.in_flight || !startable {
            return false;
        }
        state.in_flight = true;
        state.last_error = None;
        state.history.clear();
        let stage = state.stage;
        state.history.push(stage);
        true
    }

    fn set_stage(&self, stage: TransactionStage) {
        let mut state = self.lock_state();
        log::debug!("Stage transition: {} -> {stage}", state.stage);
        state.stage = stage;
        state.history.push(stage);
    }

    fn finish(&self, error: Option<&FlowError>) {
        let mut state = self.lock_state();
        state.in_flight = false;
        if let Some(error) = error {
            log::warn!("Run failed at stage {}: {error}", state.stage);
            state.last_error = Some(error.to_string());
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.state.lock().expect("orchestrator state lock poisoned")
    }
}

/// Build a stored credential from a registration response
fn credential_from_attestation(
    response: &RegistrationResponse,
) -> Result<StoredCredential, FlowError> {
    let attestation_object = decode_b64url(&response.attestation_object, "attestation object")?;
    let auth_data = attestation::extract_auth_data(&attestation_object)?;
    let parsed = AuthenticatorData::parse(&auth_data)?;

    let attested = parsed.attested_credential.ok_or_else(|| {
        WebAuthnError::MalformedAuthenticatorData("No attested credential data".to_string())
    })?;

    Ok(StoredCredential {
        credential_id: attested.credential_id,
        credential_public_key: attested.credential_public_key,
        counter: parsed.sign_count,
        created_at: Utc::now(),
        last_used: None,
    })
}

fn decode_b64url(value: &str, field: &str) -> Result<Vec<u8>, FlowError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| WebAuthnError::EncodingError(format!("Invalid {field} encoding")).into())
}

fn coordinate(bytes: &[u8], axis: &str) -> Result<[u8; 32], FlowError> {
    bytes.try_into().map_err(|_| {
        WebAuthnError::DecodeError(format!(
            "COSE {axis} coordinate is {} bytes, expected 32",
            bytes.len()
        ))
        .into()
    })
}

/// Generate a 32-byte Base64URL-encoded random challenge
#[must_use]
pub fn generate_challenge() -> String {
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);
    URL_SAFE_NO_PAD.encode(nonce)
}

impl From<crate::settings::RelyingPartySettings> for crate::webauthn::RelyingParty {
    fn from(settings: crate::settings::RelyingPartySettings) -> Self {
        Self {
            id: settings.rp_id,
            name: settings.rp_name,
        }
    }
}
