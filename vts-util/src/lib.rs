pub mod log {
    use std::sync::Once;

    use tracing_subscriber::fmt::{format::FmtSpan, time::LocalTime};
    use tracing_subscriber::EnvFilter;

    /// Installs the global `tracing` subscriber. Safe to call from every
    /// binary and test entry point; only the first call has any effect.
    /// Verbosity defaults to `debug` but is overridable with `RUST_LOG`,
    /// e.g. `RUST_LOG=vts_video=trace,warn`.
    pub fn init() {
        static START: Once = Once::new();
        START.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug"));
            let subscriber = tracing_subscriber::fmt()
                .with_timer(LocalTime::rfc_3339())
                .with_env_filter(filter)
                .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .expect("failed to set global default tracing subscriber");
        });
    }
}
