use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::webauthn::WebAuthnSettings;

/// Settings file name looked up in the working directory and `PASSKEY_SETTINGS_DIR`
pub const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CeremonySettings {
    pub client: ClientSettings,
    pub gateway: GatewaySettings,
    pub webauthn: WebAuthnSettings,
    pub logging: LoggingSettings,
}

/// Ceremony client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the verification gateway, resolved once at startup
    pub gateway_url: String,
    /// Deadline for the options request
    pub options_timeout_seconds: u64,
    /// Upper bound for the platform ceremony (user presence, biometrics, PIN)
    pub ceremony_timeout_seconds: u64,
    /// Deadline for submitting the signed response
    pub verify_timeout_seconds: u64,
}

/// Reference gateway server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    /// Comma separated list of origins allowed to call the API
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8000".to_string(),
            options_timeout_seconds: 10,
            ceremony_timeout_seconds: 120,
            verify_timeout_seconds: 10,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CeremonySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - Settings file cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        Self::initialize_logging(&settings.logging)?;
        Ok(settings)
    }

    /// Initialize `env_logger`, `RUST_LOG` taking precedence over the configured level
    fn initialize_logging(logging: &LoggingSettings) -> anyhow::Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(logging.level.as_str()),
        )
        .try_init()
        .context("failed to initialize logger")
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PASSKEY_SETTINGS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    pub fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = Path::new(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(settings_dir) = std::env::var("PASSKEY_SETTINGS_DIR") {
            let dir_path = Path::new(&settings_dir).join(SETTINGS_FILE);
            if dir_path.exists() {
                settings = Self::from_file(&dir_path)?;
                println!("✓ Overriding settings from {}", dir_path.display());
            } else {
                println!(
                    "ℹ PASSKEY_SETTINGS_DIR set but no {SETTINGS_FILE} found at: {}",
                    dir_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse one TOML settings file; missing sections fall back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_client_env_overrides(&mut settings.client);
        Self::apply_gateway_env_overrides(&mut settings.gateway);
        Self::apply_webauthn_env_overrides(&mut settings.webauthn);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for ceremony client settings
    pub fn apply_client_env_overrides(client_settings: &mut ClientSettings) {
        if let Ok(gateway_url) = std::env::var("GATEWAY_URL") {
            client_settings.gateway_url = gateway_url;
        }
        Self::apply_numeric_env_override(
            "OPTIONS_TIMEOUT_SECONDS",
            &mut client_settings.options_timeout_seconds,
        );
        Self::apply_numeric_env_override(
            "CEREMONY_TIMEOUT_SECONDS",
            &mut client_settings.ceremony_timeout_seconds,
        );
        Self::apply_numeric_env_override(
            "VERIFY_TIMEOUT_SECONDS",
            &mut client_settings.verify_timeout_seconds,
        );
    }

    /// Apply environment overrides for gateway server settings
    fn apply_gateway_env_overrides(gateway_settings: &mut GatewaySettings) {
        if let Ok(host) = std::env::var("HOST") {
            gateway_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                gateway_settings.port = port;
            }
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            gateway_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for relying party settings
    pub fn apply_webauthn_env_overrides(webauthn_settings: &mut WebAuthnSettings) {
        if let Ok(rp_id) = std::env::var("RP_ID") {
            webauthn_settings.rp_id = rp_id;
        }
        if let Ok(rp_name) = std::env::var("RP_NAME") {
            webauthn_settings.rp_name = rp_name;
        }
        if let Ok(origin) = std::env::var("ORIGIN") {
            webauthn_settings.rp_origin = origin;
        }
        if let Ok(user_verification) = std::env::var("USER_VERIFICATION") {
            webauthn_settings.user_verification = user_verification;
        }
        Self::apply_numeric_env_override(
            "WEBAUTHN_TIMEOUT_SECONDS",
            &mut webauthn_settings.timeout_seconds,
        );
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the gateway server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.gateway
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}
