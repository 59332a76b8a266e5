//! Model signing utility for triage model bundles.
//!
//! # Usage
//!
//! ```bash
//! triage-sign-model keygen --out-seed <path> [--out-pub <path>] [--force]
//! triage-sign-model sign <model_dir> [--key <seed_file>]
//! ```
//!
//! `sign` writes `manifest.json` (SHA-256 of every bundle artifact) and
//! `model.sig` (Ed25519 over the manifest bytes). The seed is read from
//! `--key`, `TRIAGE_MODEL_SIGNING_KEY_B64_FILE`, or in debug builds only
//! `TRIAGE_MODEL_SIGNING_KEY_B64`.
//!
//! # Security
//!
//! - Seeds come from OS entropy and are written with 0600 permissions
//! - Seed material is zeroized after use
//! - Only non-secret material is printed

use std::collections::BTreeMap;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, ensure, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use smart_triage::adapters::bundle::{
    sha256_hex, SignedManifest, ARTIFACT_FILES, MANIFEST_FILE, SIGNATURE_FILE,
};

const USAGE: &str = "Usage:\n  triage-sign-model keygen --out-seed <path> [--out-pub <path>] [--force]\n  triage-sign-model sign <model_dir> [--key <seed_file>]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn write_new(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    ensure!(
        force || !path.exists(),
        "Refusing to overwrite existing file {path:?}. Use --force."
    );
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(path).with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn keygen(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut out_seed: Option<PathBuf> = None;
    let mut out_pub: Option<PathBuf> = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out-seed" => out_seed = Some(args.next().context(USAGE)?.into()),
            "--out-pub" => out_pub = Some(args.next().context(USAGE)?.into()),
            "--force" => force = true,
            _ => bail!("Unknown arg: {arg}\n{USAGE}"),
        }
    }
    let out_seed = out_seed.context(USAGE)?;

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    write_new(&out_seed, seed_b64.as_bytes(), 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(out_pub) = &out_pub {
        let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());
        write_new(out_pub, pub_b64.as_bytes(), 0o644, force)?;
        println!("Wrote public key (base64) to {out_pub:?}");
    }
    println!("Public key (hex)={}", to_hex(verifying_key.as_bytes()));

    seed.zeroize();
    Ok(())
}

fn read_seed(key_path: Option<&Path>) -> Result<Seed> {
    const KEY_FILE_ENV: &str = "TRIAGE_MODEL_SIGNING_KEY_B64_FILE";
    const KEY_ENV: &str = "TRIAGE_MODEL_SIGNING_KEY_B64";

    let file = key_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(KEY_FILE_ENV).ok().map(|p| PathBuf::from(p.trim())));

    let b64 = match file {
        Some(path) => Zeroizing::new(
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed reading signing key file {path:?}"))?,
        ),
        None if cfg!(debug_assertions) => Zeroizing::new(
            std::env::var(KEY_ENV)
                .with_context(|| format!("Missing signing key. Use --key or {KEY_FILE_ENV}."))?,
        ),
        None => bail!("Missing signing key. Use --key or {KEY_FILE_ENV}."),
    };

    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );
    ensure!(
        raw.len() == 32,
        "Signing key seed must be 32 bytes after base64 decode (got {})",
        raw.len()
    );

    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn sign(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut model_dir: Option<PathBuf> = None;
    let mut key_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--key" => key_path = Some(args.next().context(USAGE)?.into()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => bail!(USAGE),
        }
    }
    let model_dir = model_dir.context(USAGE)?;

    let mut files = BTreeMap::new();
    for name in ARTIFACT_FILES {
        let path = model_dir.join(name);
        let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
        files.insert(name.to_string(), sha256_hex(&bytes));
    }

    let manifest = SignedManifest::new(files, Some(unix_now()));
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let seed = read_seed(key_path.as_deref())?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let manifest_path = model_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig_path = model_dir.join(SIGNATURE_FILE);
    std::fs::write(&sig_path, signing_key.sign(&manifest_bytes).to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "Public key (hex)={}",
        to_hex(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("keygen") => keygen(args),
        Some("sign") => sign(args),
        Some("-h" | "--help") => {
            println!("{USAGE}");
            Ok(())
        }
        _ => bail!(USAGE),
    }
}
