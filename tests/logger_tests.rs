use prepcal::utils::logger::init_logging;

#[test]
fn init_logging_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    init_logging(dir.path()).unwrap();
    // Second call must be a no-op, not an error.
    init_logging(dir.path()).unwrap();

    tracing::info!(target: "app::plan", "logger smoke message");
}
