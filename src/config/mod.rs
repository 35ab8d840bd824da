//! Project configuration (`.eyaml.toml`).

pub mod settings;

pub use settings::Settings;
