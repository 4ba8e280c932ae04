//! pwseal - Password-based text encryption using PBKDF2 and AES-256-GCM

#![forbid(unsafe_code)]

pub mod armor;
pub mod cipher;
pub mod encoding;
pub mod error;
pub mod kdf;
pub mod passphrase;
pub mod service;

pub use cipher::{PortableEnvelope, decrypt, encrypt};
pub use error::{ErrorCategory, ErrorKind, PwsealError, Result};
pub use service::CipherService;
