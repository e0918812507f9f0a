use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the fmt subscriber. `RUST_LOG` wins over the built-in filter.
pub fn init(bin_target: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("escape_puzzles=info,{bin_target}=info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
