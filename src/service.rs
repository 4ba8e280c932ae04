//! Async facade over the cipher
//!
//! Key derivation is deliberately slow, so each call runs on tokio's
//! blocking pool and the caller awaits it. Calls share no state and may be
//! issued concurrently. Dropping a pending future abandons the result; the
//! blocking work itself still runs to completion.

use tokio::task::{self, JoinError};
use zeroize::Zeroizing;

use crate::cipher::{self, PortableEnvelope};
use crate::error::{ErrorCategory, ErrorKind, PwsealError, Result};
use crate::kdf::KdfParams;

#[derive(Debug, Clone, Copy, Default)]
pub struct CipherService {
    params: KdfParams,
}

impl CipherService {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Encrypt `plaintext` under `password` with a fresh salt and IV.
    pub async fn encrypt(
        &self,
        plaintext: Zeroizing<String>,
        password: Zeroizing<String>,
    ) -> Result<PortableEnvelope> {
        let params = self.params;
        task::spawn_blocking(move || cipher::encrypt_with_params(&plaintext, &password, params))
            .await
            .map_err(join_error)?
    }

    /// Decrypt an envelope under `password`.
    ///
    /// The plaintext is returned in a buffer that is wiped when dropped.
    pub async fn decrypt(
        &self,
        envelope: PortableEnvelope,
        password: Zeroizing<String>,
    ) -> Result<Zeroizing<String>> {
        let params = self.params;
        task::spawn_blocking(move || {
            cipher::decrypt_envelope(&envelope, &password, params).map(Zeroizing::new)
        })
        .await
        .map_err(join_error)?
    }
}

fn join_error(e: JoinError) -> PwsealError {
    PwsealError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        "cipher task did not complete",
        e,
    )
}
