//! Versioned single-line armoring of an encrypted envelope
//!
//! The three-field envelope does not record how the key was derived. The
//! armored form adds the PBKDF2 iteration count under a version marker, so
//! text sealed today still opens after the default iteration count is raised.
//!
//! The armored format is:
//!
//! ```text
//! pwseal1:<iterations>:<salt>:<iv>:<ciphertext>
//! ```
//!
//! - Free of whitespace (including newlines)
//! - Fields are standard base64, which never contains `:`

use tracing::debug;

use crate::cipher::{self, PortableEnvelope};
use crate::error::{ErrorCategory, ErrorKind, PwsealError, Result};
use crate::kdf::KdfParams;

/// Magic prefix for all pwseal armor versions
const MAGIC_PREFIX: &str = "pwseal";

/// Version 1 magic marker
const V1_MAGIC: &str = "pwseal1:";

/// Upper bound accepted when reading an iteration count from armor. Anything
/// above this is treated as malformed rather than spending minutes in PBKDF2.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// An envelope together with the key derivation parameters that sealed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmoredEnvelope {
    pub params: KdfParams,
    pub envelope: PortableEnvelope,
}

/// Render an envelope as armored text.
pub fn wrap(armored: &ArmoredEnvelope) -> String {
    let env = &armored.envelope;
    format!(
        "{}{}:{}:{}:{}",
        V1_MAGIC,
        armored.params.iterations(),
        env.salt,
        env.iv,
        env.ciphertext
    )
}

/// Parse armored text.
///
/// Surrounding whitespace is ignored. The salt, IV and ciphertext fields are
/// not base64-validated here; decryption does that.
pub fn unwrap(armored: &str) -> Result<ArmoredEnvelope> {
    let armored = armored.trim();
    if armored.len() < V1_MAGIC.len() {
        return Err(invalid("input size smaller than magic marker; likely truncated"));
    }

    let Some(body) = armored.strip_prefix(V1_MAGIC) else {
        if armored.starts_with(MAGIC_PREFIX) {
            return Err(PwsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::ArmoringFromFuture,
                "input claims to be pwseal, but not a version we support",
            ));
        }
        return Err(invalid("input unrecognized as pwseal data"));
    };

    let fields: Vec<&str> = body.split(':').collect();
    let [iterations, salt, iv, ciphertext] = fields.as_slice() else {
        return Err(invalid(format!(
            "expected 4 fields after version marker, found {}",
            fields.len()
        )));
    };

    // Canonical decimal only, so that unwrap and wrap are exact inverses.
    if iterations.is_empty()
        || !iterations.bytes().all(|b| b.is_ascii_digit())
        || (iterations.len() > 1 && iterations.starts_with('0'))
    {
        return Err(invalid("iteration count is not a canonical decimal number"));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| invalid("iteration count is not a number"))?;
    if iterations > MAX_ITERATIONS {
        return Err(invalid(format!(
            "iteration count {} exceeds maximum of {}",
            iterations, MAX_ITERATIONS
        )));
    }
    let params = KdfParams::new(iterations).map_err(|e| {
        PwsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringInvalid,
            "invalid iteration count",
            e,
        )
    })?;

    Ok(ArmoredEnvelope {
        params,
        envelope: PortableEnvelope {
            salt: salt.to_string(),
            iv: iv.to_string(),
            ciphertext: ciphertext.to_string(),
        },
    })
}

/// Encrypt plaintext and return it as armored text.
pub fn seal(plaintext: &str, password: &str, params: KdfParams) -> Result<String> {
    let envelope = cipher::encrypt_with_params(plaintext, password, params)?;
    Ok(wrap(&ArmoredEnvelope { params, envelope }))
}

/// Decrypt armored text, deriving the key with the iteration count it carries.
pub fn open(armored: &str, password: &str) -> Result<String> {
    let ArmoredEnvelope { params, envelope } = unwrap(armored)?;
    debug!(iterations = params.iterations(), "opening armored envelope");
    cipher::decrypt_envelope(&envelope, password, params)
}

fn invalid(msg: impl Into<String>) -> PwsealError {
    PwsealError::with_kind(ErrorCategory::User, ErrorKind::ArmoringInvalid, msg)
}
