use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the log filter (e.g. `capstone_grader=trace`)
pub const LOG_ENV_VAR: &str = "CAPSTONE_GRADER_LOG";

/// Default filter for the given verbosity
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "capstone_grader=debug"
    } else {
        "capstone_grader=warn"
    }
}

/// Install the stderr subscriber. Call once at startup.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}
