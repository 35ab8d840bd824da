//! `eyaml inspect`: show cipher and recipients of an envelope.
//!
//! Nothing is decrypted, so no private key is needed.  When the configured
//! public key is readable, its certificates are listed too, flagged by
//! whether the envelope is addressed to them.

use crate::cli::{self, output, Cli, InputArgs};
use crate::crypto::{addressed_to, inspect};
use crate::envelope;
use crate::errors::{EyamlError, Result};
use crate::keys;

/// Execute the `inspect` command.
pub fn execute(cli: &Cli, input: &InputArgs, json: bool) -> Result<()> {
    let text = cli::read_input(input)?;
    let payload = envelope::unwrap(envelope::normalize(&text))?;
    let der = envelope::decode_payload(payload)?;
    let info = inspect(&der)?;

    if json {
        let out = serde_json::to_string_pretty(&info)
            .map_err(|e| EyamlError::CommandFailed(format!("JSON serialization: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    output::info(&format!(
        "{} — {} byte(s) of content, {} recipient(s)",
        info.content_cipher,
        info.content_length,
        info.recipients.len()
    ));
    output::print_recipients_table(&info);

    let settings = cli::load_settings(cli)?;
    let path = cli::public_key_path(cli, &settings);
    match keys::load_certificates_file(&path) {
        Ok(certs) => {
            let addressed = certs
                .iter()
                .map(|cert| addressed_to(&der, cert))
                .collect::<Result<Vec<bool>>>()?;
            output::print_certificates_table(&certs, &addressed);
            if !addressed.first().copied().unwrap_or(false) {
                output::warning(
                    "The first configured certificate is not a recipient; decrypt will fail.",
                );
            }
        }
        Err(e) => {
            output::tip(&format!("Public key not loaded ({e})."));
        }
    }

    Ok(())
}
