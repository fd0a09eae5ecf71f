//! Tracing subscriber setup for the binary.

use crate::domain::settings::LogFormat;

pub const LOG_ENV: &str = "TRADELOG_LOG";

/// Install the global subscriber. `TRADELOG_LOG` overrides the configured
/// filter. Events go to stderr so table output on stdout stays clean.
pub fn init_tracing(filter: &str, format: LogFormat) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| filter.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .map_err(|err| format!("invalid log filter '{filter}': {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.without_time().try_init(),
    };
    result.map_err(|err| format!("failed to install log subscriber: {err}"))
}
