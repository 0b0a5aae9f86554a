use anyhow::Result;
use bha::cli::{self, Cli};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing from the global CLI flags.
fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = if let Some(ref custom) = cli.trace_filter {
        EnvFilter::try_new(custom)?
    } else if cli.debug {
        EnvFilter::new("warn,bha=debug")
    } else if cli.verbose {
        EnvFilter::new("warn,bha=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(cli.debug)
                .compact(),
        )
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    cli::run(cli)
}
