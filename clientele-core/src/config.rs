//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "security": {
//!     "passwordEncoder": "argon2",
//!     "passwordSalt": null,
//!     "defaultAuthorities": ["ROLE_USER"],
//!     "minPasswordLength": 8
//!   },
//!   "idGeneration": { "batchSize": 50 }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::password::{Argon2PasswordEncoder, Sha256PasswordEncoder};
use crate::domain::result::Error;
use crate::ports::PasswordEncoder;
use crate::services::DEFAULT_BATCH_SIZE;

pub const SETTINGS_FILE: &str = "settings.json";
pub const ENV_PASSWORD_ENCODER: &str = "CLIENTELE_PASSWORD_ENCODER";
pub const ENV_ID_BATCH_SIZE: &str = "CLIENTELE_ID_BATCH_SIZE";

const DEFAULT_AUTHORITY: &str = "ROLE_USER";
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Which password encoder to wire into the services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordEncoderKind {
    #[default]
    Argon2,
    Sha256,
}

impl PasswordEncoderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordEncoderKind::Argon2 => "argon2",
            PasswordEncoderKind::Sha256 => "sha256",
        }
    }

    pub fn build(&self) -> Arc<dyn PasswordEncoder> {
        match self {
            PasswordEncoderKind::Argon2 => Arc::new(Argon2PasswordEncoder::new()),
            PasswordEncoderKind::Sha256 => Arc::new(Sha256PasswordEncoder),
        }
    }
}

impl fmt::Display for PasswordEncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordEncoderKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "argon2" | "argon2id" => Ok(PasswordEncoderKind::Argon2),
            "sha256" | "sha-256" => Ok(PasswordEncoderKind::Sha256),
            other => Err(Error::Config(format!("Unknown password encoder '{}'", other))),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    security: SecuritySettings,
    #[serde(default)]
    id_generation: IdGenerationSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySettings {
    #[serde(default)]
    password_encoder: Option<PasswordEncoderKind>,
    #[serde(default)]
    password_salt: Option<String>,
    #[serde(default)]
    default_authorities: Option<Vec<String>>,
    #[serde(default)]
    min_password_length: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdGenerationSettings {
    #[serde(default)]
    batch_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved configuration (settings file plus environment overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub password_encoder: PasswordEncoderKind,
    pub password_salt: Option<String>,
    pub default_authorities: Vec<String>,
    pub min_password_length: usize,
    pub id_batch_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password_encoder: PasswordEncoderKind::default(),
            password_salt: None,
            default_authorities: vec![DEFAULT_AUTHORITY.to_string()],
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            id_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    if content.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with_env(dir, |key| std::env::var(key).ok())
    }

    /// Load config, reading overrides through `env`
    pub fn load_with_env(dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(dir)?;
        let defaults = Config::default();

        let password_encoder = match env(ENV_PASSWORD_ENCODER) {
            Some(value) => value
                .parse::<PasswordEncoderKind>()
                .with_context(|| format!("Invalid {}", ENV_PASSWORD_ENCODER))?,
            None => raw.security.password_encoder.unwrap_or(defaults.password_encoder),
        };

        let id_batch_size = match env(ENV_ID_BATCH_SIZE) {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid {}: '{}'", ENV_ID_BATCH_SIZE, value))?,
            None => raw.id_generation.batch_size.unwrap_or(defaults.id_batch_size),
        }
        .max(1);

        Ok(Self {
            password_encoder,
            password_salt: raw.security.password_salt.filter(|s| !s.is_empty()),
            default_authorities: raw
                .security
                .default_authorities
                .unwrap_or(defaults.default_authorities),
            min_password_length: raw
                .security
                .min_password_length
                .unwrap_or(defaults.min_password_length),
            id_batch_size,
        })
    }

    /// Save config to the data directory
    /// Preserves settings this crate doesn't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut settings = read_settings(dir)?;

        settings.security.password_encoder = Some(self.password_encoder);
        settings.security.password_salt = self.password_salt.clone();
        settings.security.default_authorities = Some(self.default_authorities.clone());
        settings.security.min_password_length = Some(self.min_password_length);
        settings.id_generation.batch_size = Some(self.id_batch_size);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn build_password_encoder(&self) -> Arc<dyn PasswordEncoder> {
        self.password_encoder.build()
    }
}
