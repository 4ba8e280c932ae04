//! Password-based encryption/decryption of text using PBKDF2 + AES-256-GCM
//!
//! Every encryption draws a fresh 16-byte salt and a fresh 12-byte IV. The
//! result is a [`PortableEnvelope`]: salt, IV and ciphertext (with the
//! 16-byte GCM tag appended), each base64-encoded independently.
//!
//! Decryption fails with [`ErrorKind::AuthenticationFailed`] for every kind
//! of input mismatch, and never says which input was wrong.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::encoding;
use crate::error::{ErrorCategory, ErrorKind, PwsealError, Result};
use crate::kdf::{self, DerivedKey, KdfParams, SALT_LEN};

/// Length of IV (GCM nonce) in bytes
pub const IV_LEN: usize = 12;

/// Length of the GCM authentication tag appended to the ciphertext
pub const TAG_LEN: usize = 16;

const AUTH_FAILURE_MSG: &str = "corrupt input, tampered-with data, or bad password";

/// Salt, IV and ciphertext as portable text.
///
/// This is everything a caller needs to keep, besides the password, in order
/// to decrypt later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableEnvelope {
    pub salt: String,
    pub iv: String,
    pub ciphertext: String,
}

/// Encrypt plaintext with a password using random salt and IV and the
/// default iteration count.
pub fn encrypt(plaintext: &str, password: &str) -> Result<PortableEnvelope> {
    encrypt_with_params(plaintext, password, KdfParams::default())
}

/// Encrypt plaintext with a password using random salt and IV.
pub fn encrypt_with_params(
    plaintext: &str,
    password: &str,
    params: KdfParams,
) -> Result<PortableEnvelope> {
    let mut salt = [0u8; SALT_LEN];
    rand::fill(&mut salt[..]);

    let mut iv = [0u8; IV_LEN];
    rand::fill(&mut iv[..]);

    encrypt_deterministic(plaintext, password, &salt, &iv, params)
}

/// Encrypt plaintext with a password using provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - reusing an IV under the same key breaks
/// AES-GCM. Always use `encrypt()` which generates random salt/IV.
pub fn encrypt_deterministic(
    plaintext: &str,
    password: &str,
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    params: KdfParams,
) -> Result<PortableEnvelope> {
    let key = kdf::derive_with_params(password, salt, params);
    let cipher = new_cipher(&key);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(iv), plaintext.as_bytes())
        .map_err(|e| {
            PwsealError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::EncryptionFailed,
                format!("encryption failed: {}", e),
            )
        })?;

    debug!(
        iterations = params.iterations(),
        ciphertext_len = ciphertext.len(),
        "sealed plaintext"
    );

    Ok(PortableEnvelope {
        salt: encoding::encode(salt),
        iv: encoding::encode(iv),
        ciphertext: encoding::encode(&ciphertext),
    })
}

/// Decrypt portable-text ciphertext with a password, using the default
/// iteration count.
pub fn decrypt(ciphertext: &str, password: &str, salt: &str, iv: &str) -> Result<String> {
    decrypt_with_params(ciphertext, password, salt, iv, KdfParams::default())
}

/// Decrypt an envelope produced by [`encrypt_with_params`] with the same
/// parameters.
pub fn decrypt_envelope(
    envelope: &PortableEnvelope,
    password: &str,
    params: KdfParams,
) -> Result<String> {
    decrypt_with_params(
        &envelope.ciphertext,
        password,
        &envelope.salt,
        &envelope.iv,
        params,
    )
}

/// Decrypt portable-text ciphertext with a password.
///
/// All three encoded inputs are decoded and length-checked before any key
/// derivation takes place.
pub fn decrypt_with_params(
    ciphertext: &str,
    password: &str,
    salt: &str,
    iv: &str,
    params: KdfParams,
) -> Result<String> {
    let salt: [u8; SALT_LEN] =
        encoding::decode_fixed(salt, "salt").map_err(|e| auth_failure("salt", e))?;
    let iv: [u8; IV_LEN] = encoding::decode_fixed(iv, "iv").map_err(|e| auth_failure("iv", e))?;
    let sealed = encoding::decode(ciphertext).map_err(|e| auth_failure("ciphertext", e))?;
    if sealed.len() < TAG_LEN {
        debug!(
            ciphertext_len = sealed.len(),
            "ciphertext shorter than authentication tag"
        );
        return Err(auth_failed());
    }

    let key = kdf::derive_with_params(password, &salt, params);
    let cipher = new_cipher(&key);
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
            .map_err(|_| auth_failed())?,
    );

    let text = std::str::from_utf8(&plaintext).map_err(|_| auth_failed())?;
    Ok(text.to_owned())
}

fn new_cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn auth_failed() -> PwsealError {
    PwsealError::with_kind(
        ErrorCategory::User,
        ErrorKind::AuthenticationFailed,
        AUTH_FAILURE_MSG,
    )
}

// Malformed encodings are logged at debug level for the operator, but the
// returned error is the same as for a bad password.
fn auth_failure(field: &'static str, err: PwsealError) -> PwsealError {
    debug!(field, reason = %err, "rejected encoded input before key derivation");
    auth_failed()
}
