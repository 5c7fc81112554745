//! Credential persistence
//!
//! The orchestrator needs one capability from its host: a keyed store
//! mapping credential IDs to the registered public key material. The store
//! is external (browser storage, a database, a file); [`MemoryCredentialStore`]
//! is the process-local implementation used by tests and single-process
//! hosts.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered passkey credential as persisted by the host
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StoredCredential {
    pub credential_id: Vec<u8>,         // Raw credential ID bytes
    pub credential_public_key: Vec<u8>, // COSE-encoded public key
    pub counter: u32,                   // Signature counter
    pub created_at: DateTime<Utc>,      // When the credential was registered
    pub last_used: Option<DateTime<Utc>>, // When the credential last signed
}

impl StoredCredential {
    /// Serialize for an external JSON-compatible store
    ///
    /// Byte fields serialize as plain JSON arrays, matching what
    /// browser-storage hosts persist.
    ///
    /// # Errors
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self) -> Result<String, anyhow::Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from an external JSON-compatible store
    ///
    /// # Errors
    /// Returns an error if JSON deserialization fails.
    pub fn decode(encoded: &str) -> Result<Self, anyhow::Error> {
        let credential: Self = serde_json::from_str(encoded)?;
        Ok(credential)
    }
}

/// Keyed credential storage provided by the host
///
/// Most recent write for a given ID wins; no uniqueness or expiry policy is
/// imposed.
pub trait CredentialStore: Send + Sync {
    /// Persist a credential under `id`, replacing any previous value
    fn put(&self, id: &str, credential: StoredCredential);

    /// Retrieve the credential stored under `id`
    fn get(&self, id: &str) -> Option<StoredCredential>;
}

/// Process-local credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, StoredCredential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn put(&self, id: &str, credential: StoredCredential) {
        self.entries
            .lock()
            .expect("credential store lock poisoned")
            .insert(id.to_string(), credential);
    }

    fn get(&self, id: &str) -> Option<StoredCredential> {
        self.entries
            .lock()
            .expect("credential store lock poisoned")
            .get(id)
            .cloned()
    }
}
