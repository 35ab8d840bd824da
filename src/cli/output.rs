//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::crypto::EnvelopeInfo;
use crate::keys::Certificate;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the recipients of an envelope (Issuer, Serial, Key transport).
pub fn print_recipients_table(envelope: &EnvelopeInfo) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Issuer", "Serial", "Key transport"]);

    for r in &envelope.recipients {
        let issuer = match (&r.issuer, &r.subject_key_id) {
            (Some(name), _) if name.is_empty() => "(empty)".to_string(),
            (Some(name), _) => name.clone(),
            (None, Some(ski)) => format!("key id {ski}"),
            (None, None) => "(unknown)".to_string(),
        };
        table.add_row(vec![
            issuer,
            r.serial.clone().unwrap_or_else(|| "-".to_string()),
            key_transport_name(&r.key_encryption).to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the configured certificates with their fingerprints.
///
/// `addressed` says, per certificate, whether the envelope names it.
pub fn print_certificates_table(certs: &[Certificate], addressed: &[bool]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Subject",
        "Issuer",
        "Serial",
        "Expires",
        "SHA-256",
        "Recipient",
    ]);

    for (cert, is_recipient) in certs.iter().zip(addressed) {
        table.add_row(vec![
            name_or_empty(cert.subject()),
            name_or_empty(cert.issuer()),
            cert.serial(),
            cert.not_after(),
            cert.fingerprint_sha256(),
            if *is_recipient { "yes" } else { "no" }.to_string(),
        ]);
    }

    println!("{table}");
}

fn name_or_empty(name: String) -> String {
    if name.is_empty() {
        "(empty)".to_string()
    } else {
        name
    }
}

fn key_transport_name(oid: &str) -> &str {
    match oid {
        "1.2.840.113549.1.1.1" => "rsaEncryption",
        "1.2.840.113549.1.1.7" => "RSAES-OAEP",
        other => other,
    }
}
