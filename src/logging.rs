//! Tracing subscriber setup. Logs go to stderr so CLI output on stdout stays clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "ragdb=info,tower_http=info";

/// Install the global subscriber. `filter` overrides `RUST_LOG`, which
/// overrides the default `ragdb=info,tower_http=info`.
pub fn init_logging(filter: Option<&str>) -> anyhow::Result<()> {
    let env_filter = match filter {
        Some(f) => EnvFilter::try_new(f)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()?;
    Ok(())
}
