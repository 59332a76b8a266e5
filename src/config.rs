//! Runtime configuration from `TRIAGE_*` environment variables.
//!
//! Supported:
//! - `TRIAGE_MODEL_DIR` (default `models`)
//! - `TRIAGE_EHR_FALLBACK_CSV`
//! - `TRIAGE_ALLOW_UNSIGNED_MODELS`
//! - `TRIAGE_MODEL_SIGNING_PUBKEY_B64` or `TRIAGE_MODEL_SIGNING_PUBKEY_B64_FILE`
//! - `TRIAGE_LOG_MODE` (`stderr`, `file`) and `TRIAGE_LOG_FILE`
//!
//! `TRIAGE_SANITIZE_MAX_BYTES` is read by the log sanitizer itself.

use std::path::PathBuf;

use crate::adapters::bundle::{verifying_key_from_b64, BundleOptions};
use crate::TriageError;

pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_LOG_FILE: &str = "logs/smart-triage.log";

/// Where log output goes. Stdout is reserved for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

/// Source of the model signing public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    pub model_dir: PathBuf,
    pub ehr_fallback_csv: Option<PathBuf>,
    pub allow_unsigned_models: bool,
    pub signing_pubkey: Option<KeySource>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            ehr_fallback_csv: None,
            allow_unsigned_models: false,
            signing_pubkey: None,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// `1`, `true` or `yes` (either case) enable a flag; anything else disables it.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl TriageConfig {
    /// Read the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(dir) = get("TRIAGE_MODEL_DIR") {
            cfg.model_dir = PathBuf::from(dir.trim());
        }
        cfg.ehr_fallback_csv = get("TRIAGE_EHR_FALLBACK_CSV").map(|p| PathBuf::from(p.trim()));
        cfg.allow_unsigned_models = get("TRIAGE_ALLOW_UNSIGNED_MODELS").is_some_and(|v| parse_bool(&v));

        cfg.signing_pubkey = get("TRIAGE_MODEL_SIGNING_PUBKEY_B64_FILE")
            .map(|p| KeySource::File(PathBuf::from(p.trim())))
            .or_else(|| get("TRIAGE_MODEL_SIGNING_PUBKEY_B64").map(KeySource::Inline));

        if let Some(mode) = get("TRIAGE_LOG_MODE") {
            cfg.log_mode = match mode.trim() {
                "file" => LogMode::File,
                _ => LogMode::Stderr,
            };
        }
        if let Some(file) = get("TRIAGE_LOG_FILE") {
            cfg.log_file = PathBuf::from(file.trim());
        }

        cfg
    }

    /// Resolve the bundle loading options, reading the key file if configured.
    ///
    /// # Errors
    /// Returns error if the key file is unreadable or the key is invalid.
    pub fn bundle_options(&self) -> Result<BundleOptions, TriageError> {
        let verifying_key = match &self.signing_pubkey {
            None => None,
            Some(KeySource::Inline(b64)) => Some(verifying_key_from_b64(b64)?),
            Some(KeySource::File(path)) => {
                let b64 = std::fs::read_to_string(path).map_err(|e| {
                    TriageError::Config(format!("Failed reading public key file {path:?}: {e}"))
                })?;
                Some(verifying_key_from_b64(&b64)?)
            }
        };

        Ok(BundleOptions {
            allow_unsigned: self.allow_unsigned_models,
            verifying_key,
        })
    }
}
