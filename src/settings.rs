//! Crate configuration
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (applied after loading base settings)
//! 2. Settings.toml in `ZKPASSKEY_SETTINGS_DIR` (if specified and exists)
//! 3. Settings.toml in current directory (if exists)
//! 4. Default settings

use std::fs;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZkPasskeySettings {
    pub relying_party: RelyingPartySettings,
    pub prover: ProverSettings,
    pub bundler: BundlerSettings,
    pub wallet: WalletSettings,
    pub receipts: ReceiptPollingSettings,
}

/// Relying party identity used for credential creation and assertions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelyingPartySettings {
    pub rp_id: String,
    pub rp_name: String,
}

impl Default for RelyingPartySettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "zkpasskey".to_string(),
        }
    }
}

/// Proving service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProverSettings {
    pub endpoint: String,
    pub proving_key_path: String,
}

impl Default for ProverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            proving_key_path: "./keys/proving_key.pk".to_string(),
        }
    }
}

/// Bundler RPC endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundlerSettings {
    pub endpoint: String,
    pub entry_point: String,
}

impl Default for BundlerSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4337/rpc".to_string(),
            // ERC-4337 v0.6 canonical entry point
            entry_point: "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".to_string(),
        }
    }
}

/// Gas and paymaster defaults applied to assembled user operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    pub call_gas_limit: u64,
    pub verification_gas_limit: u64,
    pub pre_verification_gas: u64,
    pub paymaster_and_data: String,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            call_gas_limit: 900_000,
            verification_gas_limit: 900_000,
            pre_verification_gas: 900_000,
            paymaster_and_data: "0x".to_string(),
        }
    }
}

/// Receipt polling policy
///
/// The poll is bounded: one RPC query per interval, up to `max_attempts`
/// queries, after which the run fails instead of waiting forever on a hung
/// bundler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptPollingSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for ReceiptPollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 120,
        }
    }
}

impl ZkPasskeySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)?;
            settings = basic_toml::from_str(&toml_content)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(settings_dir) = std::env::var("ZKPASSKEY_SETTINGS_DIR") {
            let settings_path = std::path::Path::new(&settings_dir).join("Settings.toml");
            if settings_path.exists() {
                let toml_content = fs::read_to_string(&settings_path)?;
                settings = basic_toml::from_str(&toml_content)?;
                println!("✓ Overriding settings from {}", settings_path.display());
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(rp_id) = std::env::var("ZKPASSKEY_RP_ID") {
            settings.relying_party.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("ZKPASSKEY_RP_NAME") {
            settings.relying_party.rp_name = rp_name;
        }
        if let Ok(endpoint) = std::env::var("ZKPASSKEY_PROVER_URL") {
            settings.prover.endpoint = endpoint;
        }
        if let Ok(path) = std::env::var("ZKPASSKEY_PROVING_KEY_PATH") {
            settings.prover.proving_key_path = path;
        }
        if let Ok(endpoint) = std::env::var("ZKPASSKEY_BUNDLER_URL") {
            settings.bundler.endpoint = endpoint;
        }
        if let Ok(entry_point) = std::env::var("ZKPASSKEY_ENTRY_POINT") {
            settings.bundler.entry_point = entry_point;
        }
        if let Ok(interval) = std::env::var("ZKPASSKEY_RECEIPT_INTERVAL_MS") {
            if let Ok(interval) = interval.parse() {
                settings.receipts.interval_ms = interval;
            }
        }
        if let Ok(attempts) = std::env::var("ZKPASSKEY_RECEIPT_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                settings.receipts.max_attempts = attempts;
            }
        }
    }

    /// Validate endpoint URLs and the entry point address
    ///
    /// # Errors
    /// Returns an error naming the field that failed validation.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        Url::parse(&self.prover.endpoint)
            .map_err(|e| format!("Invalid prover endpoint: {e}"))?;
        Url::parse(&self.bundler.endpoint)
            .map_err(|e| format!("Invalid bundler endpoint: {e}"))?;

        let entry_point = self
            .bundler
            .entry_point
            .strip_prefix("0x")
            .ok_or("Entry point address must be 0x-prefixed")?;
        let decoded =
            hex::decode(entry_point).map_err(|e| format!("Invalid entry point address: {e}"))?;
        if decoded.len() != 20 {
            return Err(format!(
                "Entry point address is {} bytes, expected 20",
                decoded.len()
            )
            .into());
        }

        if self.receipts.max_attempts == 0 {
            return Err("Receipt polling requires at least one attempt".into());
        }

        Ok(())
    }
}

/// Initialize the process logger from `RUST_LOG`
///
/// # Errors
/// Returns an error if a logger is already installed.
pub fn init_logging() -> Result<(), log::SetLoggerError> {
    env_logger::try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        ZkPasskeySettings::default().validate().unwrap();
    }

    #[test]
    fn default_polling_is_one_second_bounded() {
        let settings = ZkPasskeySettings::default();
        assert_eq!(settings.receipts.interval_ms, 1000);
        assert!(settings.receipts.max_attempts > 0);
    }

    #[test]
    fn rejects_malformed_entry_point() {
        let mut settings = ZkPasskeySettings::default();
        settings.bundler.entry_point = "0x1234".to_string();
        assert!(settings.validate().is_err());

        settings.bundler.entry_point = "no-prefix".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_invalid_endpoint_url() {
        let mut settings = ZkPasskeySettings::default();
        settings.prover.endpoint = "not a url".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn parses_settings_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[relying_party]
rp_id = "example.com"
rp_name = "Example"

[prover]
endpoint = "https://prover.example.com"
proving_key_path = "/keys/pk"

[bundler]
endpoint = "https://bundler.example.com/rpc"
entry_point = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"

[wallet]
call_gas_limit = 500000
verification_gas_limit = 500000
pre_verification_gas = 100000
paymaster_and_data = "0xc059f997624fd240214c025e8bb5572e7c65182e"

[receipts]
interval_ms = 250
max_attempts = 8
"#
        )
        .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let settings: ZkPasskeySettings = basic_toml::from_str(&content).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.relying_party.rp_id, "example.com");
        assert_eq!(settings.wallet.call_gas_limit, 500_000);
        assert_eq!(settings.receipts.max_attempts, 8);
    }
}
