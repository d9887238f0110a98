use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "verbose_log")]
const DEFAULT_FILTER: &str = "debug,hyper=warn,reqwest=warn";
#[cfg(not(feature = "verbose_log"))]
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Logs go to stderr so stdout carries only the reports.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
