use arbor_logger::{Logger, LoggerError};

#[test]
fn second_init_is_rejected() {
    let _logger = Logger::builder().init().expect("first init should succeed");

    let err = Logger::builder().init().expect_err("second init should fail");

    assert!(matches!(err, LoggerError::Subscriber { .. }), "{err}");
    assert_eq!(err.kind(), "Subscriber");
}
