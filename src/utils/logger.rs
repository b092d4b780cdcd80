use env_logger::Env;

/// Initialise env_logger, `info` unless `RUST_LOG` says otherwise.
/// Safe to call more than once; later calls are no-ops.
pub fn setup_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
