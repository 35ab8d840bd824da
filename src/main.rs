use clap::Parser;
use eyaml::cli::commands::encrypt::EncryptOptions;
use eyaml::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Log filter variable; `--verbose` overrides it with `debug`.
const LOG_ENV: &str = "EYAML_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Encrypt {
            ref input,
            password,
            eyaml: ref document,
            output,
            ref label,
            cipher,
        } => eyaml::cli::commands::encrypt::execute(
            &cli,
            EncryptOptions {
                input,
                prompt: password,
                eyaml: document.as_deref(),
                output,
                label: label.as_deref(),
                cipher,
            },
        ),
        Commands::Decrypt {
            ref input,
            eyaml: ref document,
        } => eyaml::cli::commands::decrypt::execute(&cli, input, document.as_deref()),
        Commands::Inspect { ref input, json } => {
            eyaml::cli::commands::inspect::execute(&cli, input, json)
        }
        Commands::Version => eyaml::cli::commands::version::execute(),
        Commands::Completions { ref shell } => eyaml::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        tracing::debug!(kind = ?e.kind(), stage = ?e.stage(), "command failed");
        eyaml::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Install the stderr log subscriber.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("eyaml=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
