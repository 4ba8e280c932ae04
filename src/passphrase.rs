//! Password reading functionality

use crate::error::{ErrorCategory, ErrorKind, PwsealError, Result};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PassphraseReader {
    /// Read a password as UTF-8 text.
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed password (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<String>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        Ok(self.passphrase.clone())
    }
}

/// Reads password from any io::Read source, verbatim (no newline trimming)
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        let text = String::from_utf8(std::mem::take(&mut *data)).map_err(|e| {
            drop(Zeroizing::new(e.into_bytes()));
            PwsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "password is not valid UTF-8",
            )
        })?;
        Ok(Zeroizing::new(text))
    }
}

/// Reads password from terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(PwsealError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        io::stderr().write_all(b"Password (pwseal): ").map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        })?;
        io::stderr().flush().map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read password *without echo*
        let passphrase = rpassword::read_password().map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase))
    }
}
