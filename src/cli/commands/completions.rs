//! `eyaml completions`: print a shell completion script to stdout.
//!
//!   eyaml completions bash > /etc/bash_completion.d/eyaml
//!   eyaml completions zsh > "${fpath[1]}/_eyaml"

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::{EyamlError, Result};

/// Execute the `completions` command.
pub fn execute(shell: &str) -> Result<()> {
    let shell = parse_shell(shell)?;
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin, &mut io::stdout());
    Ok(())
}

/// Shell name to `Shell`, accepting `ps`/`pwsh` for PowerShell.
fn parse_shell(name: &str) -> Result<Shell> {
    let lower = name.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "ps" | "pwsh" => "powershell",
        other => other,
    };
    canonical.parse::<Shell>().map_err(|_| {
        EyamlError::CommandFailed(format!(
            "unknown shell '{name}' — supported: bash, zsh, fish, powershell, elvish"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_shells_parse() {
        assert_eq!(parse_shell("bash").unwrap(), Shell::Bash);
        assert_eq!(parse_shell("Zsh").unwrap(), Shell::Zsh);
        assert_eq!(parse_shell("fish").unwrap(), Shell::Fish);
        assert_eq!(parse_shell("elvish").unwrap(), Shell::Elvish);
    }

    #[test]
    fn powershell_aliases() {
        for name in ["powershell", "ps", "PWSH"] {
            assert_eq!(parse_shell(name).unwrap(), Shell::PowerShell, "{name}");
        }
    }

    #[test]
    fn unknown_shell_fails() {
        assert!(parse_shell("csh").is_err());
        assert!(parse_shell("").is_err());
    }
}
