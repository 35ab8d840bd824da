//! `eyaml encrypt`: encrypt a single value, or every marker in a file.
//!
//! Usage:
//!   eyaml encrypt -s 'hunter2'
//!   eyaml encrypt -p -l db_password -o block
//!   eyaml encrypt --eyaml common.eyaml > common.yaml

use std::path::Path;

use crate::cli::{self, output, Cli, InputArgs};
use crate::config::Settings;
use crate::crypto::{encrypt_to_envelope, ContentCipher};
use crate::envelope::{self, OutputFormat};
use crate::errors::Result;

/// Options for the `encrypt` command, as parsed from the command line.
pub struct EncryptOptions<'a> {
    pub input: &'a InputArgs,
    pub prompt: bool,
    pub eyaml: Option<&'a Path>,
    pub output: Option<OutputFormat>,
    pub label: Option<&'a str>,
    pub cipher: Option<ContentCipher>,
}

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, opts: EncryptOptions<'_>) -> Result<()> {
    let settings = cli::load_settings(cli)?;
    let public_key = cli::read_public_key(cli, &settings)?;
    let cipher = opts.cipher.unwrap_or(settings.content_cipher);

    if let Some(path) = opts.eyaml {
        return encrypt_file(path, &public_key, cipher);
    }

    let value = if opts.prompt {
        cli::prompt_value()?
    } else {
        cli::read_input(opts.input)?
    };

    let envelope = encrypt_to_envelope(&value, &public_key, cipher)?;
    println!("{}", render(&envelope, &settings, &opts));

    Ok(())
}

/// Apply output format and label.
fn render(envelope: &str, settings: &Settings, opts: &EncryptOptions<'_>) -> String {
    let format = opts.output.unwrap_or(settings.output);
    let rendered = envelope::format(envelope, format);
    match opts.label {
        Some(label) => format!("{label}: {rendered}"),
        None => rendered,
    }
}

fn encrypt_file(path: &Path, public_key: &str, cipher: ContentCipher) -> Result<()> {
    let text = cli::read_text_file(path)?;

    let mut count = 0usize;
    let encrypted = envelope::encrypt_document(&text, |plaintext| {
        count += 1;
        encrypt_to_envelope(plaintext, public_key, cipher)
    })?;

    print!("{encrypted}");
    output::success(&format!("Encrypted {count} value(s) in {}", path.display()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts<'a>(input: &'a InputArgs, label: Option<&'a str>, output: Option<OutputFormat>) -> EncryptOptions<'a> {
        EncryptOptions {
            input,
            prompt: false,
            eyaml: None,
            output,
            label,
            cipher: None,
        }
    }

    #[test]
    fn render_uses_configured_format() {
        let input = InputArgs::default();
        let settings = Settings {
            output: OutputFormat::Block,
            ..Settings::default()
        };
        let out = render("ENC[PKCS7,abc]", &settings, &opts(&input, None, None));
        assert_eq!(out, ">\n    ENC[PKCS7,abc]");
    }

    #[test]
    fn render_prefixes_label() {
        let input = InputArgs::default();
        let out = render(
            "ENC[PKCS7,abc]",
            &Settings::default(),
            &opts(&input, Some("db_password"), Some(OutputFormat::String)),
        );
        assert_eq!(out, "db_password: ENC[PKCS7,abc]");
    }
}
