use std::sync::Once;

/// Install a test subscriber once per test binary.
///
/// Honors `RUST_LOG`; without it only `keel_docs` warnings are shown. Output
/// goes through the test writer, so it appears only for failing tests unless
/// `--nocapture` is passed.
pub fn init_tracing_from_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keel_docs=warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}
