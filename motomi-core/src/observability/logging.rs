use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
/// Only the first call in a process has any effect.
pub fn setup_logging(format: LogFormat, default_filter: &str) {
    LOG_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let registry = tracing_subscriber::registry().with(filter);

        // try_init: a host application may already own the global subscriber
        let _ = match format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
    });
}

/// Log a token-budget event under the `budget` target
#[macro_export]
macro_rules! log_budget {
    ($level:ident, $agent:expr, $($arg:tt)*) => {
        tracing::$level!(
            target: "budget",
            agent = $agent,
            $($arg)*
        );
    };
}
