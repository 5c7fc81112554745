//! Platform credential API exchange types
//!
//! Serializable structures passed across the boundary to the platform
//! `WebAuthn` implementation: the options this crate builds and the
//! responses the authenticator hands back. Binary fields travel
//! Base64URL-encoded, as the platform API delivers them.

use serde::{Deserialize, Serialize};

/// `WebAuthn` relying party information
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelyingParty {
    pub id: String,   // Domain name (e.g., "example.com")
    pub name: String, // Display name
}

/// `WebAuthn` user entity
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserEntity {
    pub id: String,           // User handle
    pub name: String,         // Username (e.g., email)
    pub display_name: String, // Display name
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicKeyCredentialParameters {
    pub r#type: String, // Always "public-key"
    pub alg: i32,       // Algorithm identifier (-7 for ES256)
}

impl PublicKeyCredentialParameters {
    /// ECDSA P-256 with SHA-256, the only algorithm the proving circuit takes
    #[must_use]
    pub fn es256() -> Self {
        Self {
            r#type: "public-key".to_string(),
            alg: -7,
        }
    }
}

/// Credential creation options sent to the platform API
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CredentialCreationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp: RelyingParty,  // Relying party information
    pub user: UserEntity,  // User information
    pub public_key_params: Vec<PublicKeyCredentialParameters>, // Allowed algorithms
    pub attestation: String, // "none", "indirect", "direct"
}

/// Assertion request options sent to the platform API
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssertionOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp_id: String,     // Relying party ID
}

/// Registration response from the platform API
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistrationResponse {
    pub id: String,                 // Base64URL-encoded credential ID
    pub attestation_object: String, // Base64URL-encoded attestation object
}

/// Assertion response from the platform API
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssertionResponse {
    pub id: String,                 // Base64URL-encoded credential ID
    pub client_data_json: String,   // Base64URL-encoded client data JSON
    pub authenticator_data: String, // Base64URL-encoded authenticator data
    pub signature: String,          // Base64URL-encoded DER signature
}
