//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::ContentCipher;
use crate::envelope::OutputFormat;
use crate::errors::{EyamlError, Result};
use crate::keys;

/// eyaml CLI: encrypt and decrypt PKCS7 values in YAML files.
#[derive(Parser)]
#[command(
    name = "eyaml",
    about = "Encrypt and decrypt ENC[PKCS7,...] values for hiera-eyaml",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Public key (certificate) PEM file
    #[arg(long, env = "EYAML_PUBLIC_KEY", global = true)]
    pub public_key: Option<PathBuf>,

    /// Private key (PKCS#1 RSA) PEM file
    #[arg(long, env = "EYAML_PRIVATE_KEY", global = true)]
    pub private_key: Option<PathBuf>,

    /// Directory holding .eyaml.toml; relative key paths resolve against it
    #[arg(long, default_value = ".", global = true)]
    pub config_dir: PathBuf,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where a single value comes from.
#[derive(clap::Args, Debug, Default)]
pub struct InputArgs {
    /// Value given on the command line
    #[arg(short = 's', long = "string", conflicts_with_all = ["file", "stdin"])]
    pub string: Option<String>,

    /// Read the value from a file
    #[arg(short = 'f', long, conflicts_with = "stdin")]
    pub file: Option<PathBuf>,

    /// Read the value from standard input
    #[arg(long)]
    pub stdin: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Encrypt a value (or every DEC::PKCS7[...]! marker in a file)
    Encrypt {
        #[command(flatten)]
        input: InputArgs,

        /// Prompt for the value without echo
        #[arg(short = 'p', long, conflicts_with_all = ["string", "file", "stdin", "eyaml"])]
        password: bool,

        /// Encrypt every DEC::PKCS7[...]! marker in this eyaml file
        #[arg(long, conflicts_with_all = ["string", "file", "stdin"])]
        eyaml: Option<PathBuf>,

        /// Output format: string or block (default from config)
        #[arg(short, long)]
        output: Option<OutputFormat>,

        /// Prefix the output with `LABEL: `
        #[arg(short, long)]
        label: Option<String>,

        /// Content cipher (default from config)
        #[arg(long)]
        cipher: Option<ContentCipher>,
    },

    /// Decrypt an envelope (or every ENC[PKCS7,...] value in a file)
    Decrypt {
        #[command(flatten)]
        input: InputArgs,

        /// Decrypt every envelope in this eyaml file
        #[arg(long, conflicts_with_all = ["string", "file", "stdin"])]
        eyaml: Option<PathBuf>,
    },

    /// Show the cipher and recipients of an envelope without decrypting it
    Inspect {
        #[command(flatten)]
        input: InputArgs,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show version and supported ciphers
    Version,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.eyaml.toml` from `--config-dir`.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(&cli.config_dir)
}

/// Public key path: `--public-key` / `EYAML_PUBLIC_KEY`, then config, then default.
pub fn public_key_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.public_key
        .clone()
        .unwrap_or_else(|| settings.public_key_path(&cli.config_dir))
}

/// Private key path: `--private-key` / `EYAML_PRIVATE_KEY`, then config, then default.
pub fn private_key_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.private_key
        .clone()
        .unwrap_or_else(|| settings.private_key_path(&cli.config_dir))
}

/// Read the public key PEM text.
pub fn read_public_key(cli: &Cli, settings: &Settings) -> Result<String> {
    keys::read_key_file(&public_key_path(cli, settings))
}

/// Read the private key PEM text.
///
/// Returns `Zeroizing<String>` so the key is wiped from memory on drop.
pub fn read_private_key(cli: &Cli, settings: &Settings) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(keys::read_key_file(&private_key_path(
        cli, settings,
    ))?))
}

/// Read the single value selected by `-s`, `-f` or `--stdin`.
pub fn read_input(input: &InputArgs) -> Result<Zeroizing<String>> {
    if let Some(value) = &input.string {
        return Ok(Zeroizing::new(value.clone()));
    }

    if let Some(path) = &input.file {
        return read_text_file(path);
    }

    if input.stdin {
        let mut buf = Zeroizing::new(String::new());
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    Err(EyamlError::CommandFailed(
        "no input given — use -s VALUE, -f FILE or --stdin".into(),
    ))
}

/// Read a whole text file, naming the path when it is missing.
pub fn read_text_file(path: &Path) -> Result<Zeroizing<String>> {
    std::fs::read_to_string(path)
        .map(Zeroizing::new)
        .map_err(|e| EyamlError::CommandFailed(format!("cannot read {}: {e}", path.display())))
}

/// Prompt for a value without echoing it (used by `encrypt -p`).
///
/// Returns `Zeroizing<String>` so the value is wiped from memory on drop.
pub fn prompt_value() -> Result<Zeroizing<String>> {
    let value = dialoguer::Password::new()
        .with_prompt("Enter value to encrypt")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| EyamlError::CommandFailed(format!("value prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}
