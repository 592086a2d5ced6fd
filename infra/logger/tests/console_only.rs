use arbor_logger::{ConsoleFormat, LevelFilter, Logger};

#[test]
fn console_only_logger_writes_no_file() {
    let logger = Logger::builder()
        .console(ConsoleFormat::Json)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    tracing::info!(event = "change:model.attr", "console output goes to stderr");

    assert!(!logger.writes_file());
}
