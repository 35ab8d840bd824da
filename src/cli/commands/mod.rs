//! One module per subcommand, each exposing `execute(...) -> Result<()>`.

pub mod completions;
pub mod decrypt;
pub mod encrypt;
pub mod inspect;
pub mod version;
