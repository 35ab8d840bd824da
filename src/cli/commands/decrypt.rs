//! `eyaml decrypt`: decrypt one envelope, or every envelope in a file.

use std::path::Path;

use crate::cli::{self, output, Cli, InputArgs};
use crate::crypto::decrypt_envelope;
use crate::envelope;
use crate::errors::Result;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, input: &InputArgs, eyaml: Option<&Path>) -> Result<()> {
    let settings = cli::load_settings(cli)?;
    let private_key = cli::read_private_key(cli, &settings)?;
    let public_key = cli::read_public_key(cli, &settings)?;

    if let Some(path) = eyaml {
        let text = cli::read_text_file(path)?;
        let count = envelope::document::count_envelopes(&text);
        let decrypted = envelope::decrypt_document(&text, |env| {
            decrypt_envelope(env, &private_key, &public_key)
        })?;
        print!("{decrypted}");
        output::success(&format!("Decrypted {count} value(s) in {}", path.display()));
        return Ok(());
    }

    let text = cli::read_input(input)?;
    let plaintext = decrypt_envelope(text.trim(), &private_key, &public_key)?;
    println!("{plaintext}");

    Ok(())
}
