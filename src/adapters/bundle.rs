//! Model bundle: Loads and cross-checks the five frozen artifacts.
//!
//! # Security
//!
//! A bundle directory may carry a signed manifest:
//! - `manifest.json` lists every artifact with its SHA-256 digest
//! - `model.sig` is a 64-byte Ed25519 signature over the exact manifest bytes
//!
//! When the pair is present it is always verified and any mismatch fails
//! closed. A bundle without it loads only when `allow_unsigned` is set.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adapters::encoders::{EncoderError, JsonLabelEncoder, JsonMultiLabelEncoder};
use crate::adapters::forest::{DecisionForest, ForestError};
use crate::application::TriageModels;
use crate::ports::{Classifier, LabelDecoder};

pub const RISK_MODEL_FILE: &str = "triage_model.json";
pub const RISK_LABELS_FILE: &str = "label_encoder.json";
pub const SYMPTOM_ENCODER_FILE: &str = "symptom_encoder.json";
pub const DEPARTMENT_MODEL_FILE: &str = "department_model.json";
pub const DEPARTMENT_LABELS_FILE: &str = "department_encoder.json";

/// Every artifact a bundle consists of.
pub const ARTIFACT_FILES: [&str; 5] = [
    RISK_MODEL_FILE,
    RISK_LABELS_FILE,
    SYMPTOM_ENCODER_FILE,
    DEPARTMENT_MODEL_FILE,
    DEPARTMENT_LABELS_FILE,
];

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to load {name}: {source}")]
    Forest {
        name: &'static str,
        #[source]
        source: ForestError,
    },

    #[error("Failed to load {name}: {source}")]
    Encoder {
        name: &'static str,
        #[source]
        source: EncoderError,
    },

    #[error("Inconsistent model bundle: {0}")]
    Mismatch(String),

    #[error("Model signature required: {0}")]
    Unsigned(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),
}

/// Signed list of artifact digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when the manifest was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    pub files: BTreeMap<String, String>,
}

impl SignedManifest {
    #[must_use]
    pub fn new(files: BTreeMap<String, String>, created_at: Option<i64>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            created_at,
            files,
        }
    }
}

/// How strictly to treat bundle integrity.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Load bundles that carry no manifest/signature pair.
    pub allow_unsigned: bool,
    /// Key that signed manifests must verify against.
    pub verifying_key: Option<VerifyingKey>,
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Parse a base64-encoded 32-byte Ed25519 public key.
///
/// # Errors
/// Returns `BundleError::Integrity` if the text is not a valid key.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, BundleError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| BundleError::Integrity(format!("Invalid public key base64: {e}")))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| BundleError::Integrity("Public key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| BundleError::Integrity("Invalid Ed25519 public key".into()))
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Verify the manifest/signature pair in `dir`, if any.
///
/// Returns `Ok(None)` for an unsigned bundle that `options` allows.
///
/// # Errors
/// Returns `BundleError::Unsigned` for a disallowed unsigned bundle and
/// `BundleError::Integrity` for any signature or digest problem.
pub fn verify_bundle(
    dir: &Path,
    options: &BundleOptions,
) -> Result<Option<SignedManifest>, BundleError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let sig_path = dir.join(SIGNATURE_FILE);

    match (manifest_path.exists(), sig_path.exists()) {
        (false, false) => {
            if options.allow_unsigned {
                tracing::warn!("Loading UNSIGNED model bundle from {:?}", dir);
                return Ok(None);
            }
            return Err(BundleError::Unsigned(format!(
                "{dir:?} has no {MANIFEST_FILE}/{SIGNATURE_FILE}"
            )));
        }
        (true, false) => {
            return Err(BundleError::Integrity(format!(
                "{MANIFEST_FILE} present without {SIGNATURE_FILE}"
            )))
        }
        (false, true) => {
            return Err(BundleError::Integrity(format!(
                "{SIGNATURE_FILE} present without {MANIFEST_FILE}"
            )))
        }
        (true, true) => {}
    }

    let key = options.verifying_key.as_ref().ok_or_else(|| {
        BundleError::Integrity("Bundle is signed but no verifying key is configured".into())
    })?;

    let sig_bytes = std::fs::read(&sig_path)
        .map_err(|e| BundleError::Integrity(format!("Failed to read signature: {e}")))?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| BundleError::Integrity("Invalid signature length (expected 64 bytes)".into()))?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_bytes = std::fs::read(&manifest_path)
        .map_err(|e| BundleError::Integrity(format!("Failed to read manifest: {e}")))?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| BundleError::Integrity("Invalid model signature".into()))?;

    let manifest: SignedManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| BundleError::Integrity(format!("Invalid {MANIFEST_FILE} format: {e}")))?;
    if manifest.version != MANIFEST_VERSION {
        return Err(BundleError::Integrity(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }

    if let Some(unknown) = manifest
        .files
        .keys()
        .find(|name| !ARTIFACT_FILES.contains(&name.as_str()))
    {
        return Err(BundleError::Integrity(format!(
            "Manifest lists unexpected file {unknown:?}"
        )));
    }

    for name in ARTIFACT_FILES {
        let expected = manifest.files.get(name).ok_or_else(|| {
            BundleError::Integrity(format!("Manifest does not bind {name}"))
        })?;
        let bytes = std::fs::read(dir.join(name))
            .map_err(|e| BundleError::Integrity(format!("Failed to read {name}: {e}")))?;
        if !constant_time_eq_str(&sha256_hex(&bytes), &expected.to_ascii_lowercase()) {
            return Err(BundleError::Integrity(format!("File hash mismatch for {name}")));
        }
    }

    tracing::info!("Verified signed model manifest ({} files)", manifest.files.len());
    Ok(Some(manifest))
}

/// The loaded, cross-checked artifacts.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub risk_model: DecisionForest,
    pub risk_labels: JsonLabelEncoder,
    pub symptoms: JsonMultiLabelEncoder,
    pub department_model: DecisionForest,
    pub department_labels: JsonLabelEncoder,
}

impl ModelBundle {
    /// Verify and load a bundle directory.
    ///
    /// # Errors
    /// Returns error if integrity checks fail, an artifact is malformed, or
    /// the artifacts disagree with each other.
    pub fn load(dir: &Path, options: &BundleOptions) -> Result<Self, BundleError> {
        verify_bundle(dir, options)?;

        let forest = |name: &'static str| {
            DecisionForest::load(&dir.join(name)).map_err(|source| BundleError::Forest { name, source })
        };
        let encoder_err =
            |name: &'static str| move |source: EncoderError| BundleError::Encoder { name, source };

        let bundle = Self {
            risk_model: forest(RISK_MODEL_FILE)?,
            risk_labels: JsonLabelEncoder::load(&dir.join(RISK_LABELS_FILE))
                .map_err(encoder_err(RISK_LABELS_FILE))?,
            symptoms: JsonMultiLabelEncoder::load(&dir.join(SYMPTOM_ENCODER_FILE))
                .map_err(encoder_err(SYMPTOM_ENCODER_FILE))?,
            department_model: forest(DEPARTMENT_MODEL_FILE)?,
            department_labels: JsonLabelEncoder::load(&dir.join(DEPARTMENT_LABELS_FILE))
                .map_err(encoder_err(DEPARTMENT_LABELS_FILE))?,
        };
        bundle.check_consistency()?;

        tracing::info!(
            "Model bundle ready: {} risk classes, {} departments, {} features",
            bundle.risk_labels.classes().len(),
            bundle.department_labels.classes().len(),
            bundle.risk_model.required_columns().len()
        );
        Ok(bundle)
    }

    fn check_consistency(&self) -> Result<(), BundleError> {
        if self.department_model.required_columns() != self.risk_model.required_columns() {
            return Err(BundleError::Mismatch(format!(
                "{DEPARTMENT_MODEL_FILE} columns differ from {RISK_MODEL_FILE}"
            )));
        }
        let pairs = [
            (RISK_MODEL_FILE, &self.risk_model, &self.risk_labels),
            (DEPARTMENT_MODEL_FILE, &self.department_model, &self.department_labels),
        ];
        for (name, model, labels) in pairs {
            if model.n_classes() != labels.classes().len() {
                return Err(BundleError::Mismatch(format!(
                    "{name} has {} classes but its encoder has {}",
                    model.n_classes(),
                    labels.classes().len()
                )));
            }
        }
        Ok(())
    }

    /// Share the artifacts as the pipeline's predictor set.
    ///
    /// The risk forest serves as both classifier and explainer.
    #[must_use]
    pub fn into_models(self) -> TriageModels {
        let risk_model = Arc::new(self.risk_model);
        TriageModels {
            risk_classifier: risk_model.clone(),
            risk_labels: Arc::new(self.risk_labels),
            symptom_encoder: Arc::new(self.symptoms),
            department_classifier: Arc::new(self.department_model),
            department_labels: Arc::new(self.department_labels),
            explainer: risk_model,
        }
    }
}
