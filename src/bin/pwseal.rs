//! pwseal CLI - Password-based text encryption
//!
//! Encrypts short text with a password-derived AES-256-GCM key and prints
//! the salt, IV and ciphertext as base64, or decrypts them again.

use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error as StdError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use pwseal::armor::{self, ArmoredEnvelope};
use pwseal::kdf::{DEFAULT_ITERATIONS, KdfParams};
use pwseal::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use pwseal::{CipherService, ErrorCategory, ErrorKind, PortableEnvelope, PwsealError, Result};

#[derive(Parser)]
#[command(name = "pwseal")]
#[command(version)]
#[command(about = "Password-based text encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// PBKDF2 iteration count (armored input carries its own)
    #[arg(long, global = true, env = "PWSEAL_ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Log filter directive, e.g. "debug" or "pwseal=trace"
    #[arg(long, global = true, env = "PWSEAL_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One "name: value" line per field
    Fields,
    /// JSON object with salt, iv and ciphertext
    Json,
    /// Single versioned line that also records the iteration count
    Armored,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text
    #[command(alias = "e")]
    Encrypt {
        /// Text to encrypt
        #[arg(short, long, conflicts_with = "input")]
        text: Option<String>,

        /// Path to a file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// How to print the result
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Fields)]
        format: OutputFormat,
    },

    /// Decrypt text
    #[command(alias = "d")]
    Decrypt {
        /// Base64 salt
        #[arg(long, requires_all = ["iv", "ciphertext"], conflicts_with_all = ["armored", "input"])]
        salt: Option<String>,

        /// Base64 IV
        #[arg(long, requires = "salt")]
        iv: Option<String>,

        /// Base64 ciphertext
        #[arg(long, requires = "salt")]
        ciphertext: Option<String>,

        /// Armored envelope as printed by `encrypt --format armored`
        #[arg(short, long, conflicts_with = "input")]
        armored: Option<String>,

        /// Path to a file holding a JSON or armored envelope
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let result = match init_logging(&cli.log_level) {
        Ok(()) => run(cli).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", render_chain(&e));
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let params = KdfParams::new(cli.iterations)?;
    let mut reader = get_passphrase_reader(cli.passphrase_stdin);

    match cli.command {
        Commands::Encrypt {
            text,
            input,
            format,
        } => {
            let plaintext = match (text, input) {
                (Some(text), _) => Zeroizing::new(text),
                (None, Some(path)) => read_text(&path)?,
                (None, None) => {
                    return Err(PwsealError::new(
                        ErrorCategory::User,
                        "provide the plaintext with --text or --input",
                    ));
                }
            };
            if plaintext.is_empty() {
                return Err(PwsealError::new(
                    ErrorCategory::User,
                    "please provide plaintext to encrypt",
                ));
            }
            let password = read_password(&mut *reader)?;

            let envelope = CipherService::new(params)
                .encrypt(plaintext, password)
                .await
                .map_err(|e| e.with_context("encryption failed"))?;
            write_stdout(render_envelope(envelope, params, format)?.as_bytes())
        }
        Commands::Decrypt {
            salt,
            iv,
            ciphertext,
            armored,
            input,
        } => {
            let source = match (salt, iv, ciphertext, armored, input) {
                (Some(salt), Some(iv), Some(ciphertext), None, None) => ArmoredEnvelope {
                    params,
                    envelope: PortableEnvelope {
                        salt,
                        iv,
                        ciphertext,
                    },
                },
                (None, None, None, Some(armored), None) => armor::unwrap(&armored)?,
                (None, None, None, None, Some(path)) => parse_envelope_file(&path, params)?,
                _ => {
                    return Err(PwsealError::new(
                        ErrorCategory::User,
                        "provide --salt, --iv and --ciphertext, or --armored, or --input",
                    ));
                }
            };
            let env = &source.envelope;
            if env.salt.is_empty() || env.iv.is_empty() || env.ciphertext.is_empty() {
                return Err(PwsealError::new(
                    ErrorCategory::User,
                    "please provide ciphertext, salt, and IV",
                ));
            }
            let password = read_password(&mut *reader)?;

            debug!(iterations = source.params.iterations(), "decrypting");
            let plaintext = CipherService::new(source.params)
                .decrypt(source.envelope, password)
                .await
                .map_err(|e| e.with_context("decryption failed"))?;
            write_stdout(plaintext.as_bytes())
        }
    }
}

fn init_logging(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive).map_err(|e| {
        PwsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidParameters,
            format!("invalid log filter {:?}", directive),
            e,
        )
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}

fn read_password(reader: &mut dyn PassphraseReader) -> Result<Zeroizing<String>> {
    let password = reader.read_passphrase()?;
    if password.is_empty() {
        return Err(PwsealError::with_kind(
            ErrorCategory::User,
            ErrorKind::PassphraseUnavailable,
            "please enter a password",
        ));
    }
    Ok(password)
}

fn render_envelope(
    envelope: PortableEnvelope,
    params: KdfParams,
    format: OutputFormat,
) -> Result<String> {
    let rendered = match format {
        OutputFormat::Fields => format!(
            "salt: {}\niv: {}\nciphertext: {}\n",
            envelope.salt, envelope.iv, envelope.ciphertext
        ),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&envelope).map_err(|e| {
                PwsealError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::InternalInvariant,
                    "failed to serialize envelope",
                    e,
                )
            })?;
            json.push('\n');
            json
        }
        OutputFormat::Armored => {
            let mut line = armor::wrap(&ArmoredEnvelope { params, envelope });
            line.push('\n');
            line
        }
    };
    Ok(rendered)
}

/// Accepts either a JSON envelope or an armored line.
fn parse_envelope_file(path: &Path, params: KdfParams) -> Result<ArmoredEnvelope> {
    let contents = read_text(path)?;
    let trimmed = contents.trim_start();
    if trimmed.starts_with('{') {
        let envelope: PortableEnvelope = serde_json::from_str(trimmed).map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmoringInvalid,
                format!("{} is not a valid JSON envelope: {}", path.display(), e),
                e,
            )
        })?;
        Ok(ArmoredEnvelope { params, envelope })
    } else {
        armor::unwrap(trimmed)
            .map_err(|e| e.with_context(format!("failed to unarmor {}", path.display())))
    }
}

fn read_text(path: &Path) -> Result<Zeroizing<String>> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
        PwsealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|_| stdout.flush())
        .map_err(|e| {
            PwsealError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write to stdout",
                e,
            )
        })
}

fn read_error(path: &Path, err: io::Error) -> PwsealError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    PwsealError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

fn render_chain(err: &PwsealError) -> String {
    let mut out = err.message().to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
