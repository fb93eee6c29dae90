pub mod commands;
pub mod config;

use tracing_subscriber::EnvFilter;

/// Installs the log subscriber. An explicit directive wins over `RUST_LOG`.
pub fn init_tracing(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
