use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee the error is not, for example,
    /// due to a user error - merely that it cannot be confidently determined
    /// by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The cipher rejected an encryption request.
    EncryptionFailed,
    /// Decryption did not produce authentic plaintext. Covers a wrong
    /// password, a wrong or corrupted salt or IV, tampered or truncated
    /// ciphertext, and malformed portable text. The cause is never reported.
    AuthenticationFailed,
    /// Key derivation parameters are out of range.
    InvalidParameters,
    /// Portable text was not valid base64 or decoded to the wrong length.
    EncodingInvalid,
    /// The armored representation is malformed.
    ArmoringInvalid,
    /// Input claimed to be pwseal armor but used a future/unsupported version.
    ArmoringFromFuture,
    /// Password could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// Unexpected state reached within pwseal logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct PwsealError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl PwsealError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns true if this error is tagged with `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == Some(kind)
    }

    /// Wraps the current error with a higher-level message while preserving
    /// the original as source. Category and kind carry over.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PwsealError>;
