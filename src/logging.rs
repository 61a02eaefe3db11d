use tracing_subscriber::EnvFilter;

/// Install the log subscriber. With `debug` off the level is pinned to
/// `info` even if `RUST_LOG` is set; with it on, `RUST_LOG` may override.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
