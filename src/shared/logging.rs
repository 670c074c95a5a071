use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Diagnostics go to stderr so `ls`/`cat` output on stdout stays clean.
pub fn init_logger(verbose: bool) {
    let default = if verbose {
        "tees_convert=debug,info"
    } else {
        "tees_convert=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
