use arbor_logger::{LevelFilter, Logger};
use std::fs;
use tempfile::tempdir;

#[test]
fn file_output_receives_json_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_file = tmp_dir.path().join("logs").join("arbor.log");

    let logger = Logger::builder()
        .without_console()
        .file(&log_file)
        .level(LevelFilter::DEBUG)
        .env_filter("debug")
        .init()?;
    assert!(logger.writes_file());

    tracing::debug!(event = "change:model.attr", "written to the log file");
    tracing::trace!("below the level");
    drop(logger);

    let contents = fs::read_to_string(&log_file)?;
    let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap_or_default())?;
    assert_eq!(line["fields"]["event"], "change:model.attr");
    assert_eq!(contents.lines().count(), 1);

    Ok(())
}
