//! `eyaml version`: display version and supported content ciphers.

use console::style;

use crate::crypto::ContentCipher;
use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    let current = env!("CARGO_PKG_VERSION");
    println!("eyaml {current}");

    let ciphers: Vec<String> = ContentCipher::ALL
        .iter()
        .map(|c| {
            if *c == ContentCipher::default() {
                format!("{} (default)", style(c).green().bold())
            } else {
                c.to_string()
            }
        })
        .collect();
    println!("Content ciphers: {}", ciphers.join(", "));

    Ok(())
}
