//! Unit tests for `AppError` display format and conversions.

use chunibot::AppError;

#[test]
fn display_prefixes_identify_the_variant() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Db("x".into()), "db: x"),
        (AppError::Slack("x".into()), "slack: x"),
        (AppError::Http("x".into()), "http: x"),
        (AppError::Image("x".into()), "image: x"),
        (AppError::NotFound("x".into()), "not found: x"),
        (AppError::AlreadyExists("x".into()), "already exists: x"),
        (AppError::Unauthorized("x".into()), "unauthorized: x"),
        (AppError::InvalidInput("x".into()), "invalid input: x"),
        (AppError::AlreadyActive("x".into()), "already active: x"),
        (AppError::NoActiveSession("x".into()), "no active session: x"),
        (AppError::Io("x".into()), "io: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn session_errors_are_distinct() {
    let active = AppError::AlreadyActive("C1".into());
    let none = AppError::NoActiveSession("C1".into());
    assert_ne!(active.to_string(), none.to_string());
}

#[test]
fn toml_errors_convert_to_config() {
    let err: AppError = toml::from_str::<toml::Value>("= broken")
        .expect_err("invalid toml")
        .into();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn io_errors_convert_to_io() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, AppError::Io(ref msg) if msg.contains("gone")));
}

#[test]
fn image_errors_convert_to_image() {
    let err: AppError = image::load_from_memory(b"not an image")
        .expect_err("invalid image")
        .into();
    assert!(matches!(err, AppError::Image(_)));
}

#[test]
fn implements_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    let err = AppError::Http("timeout".into());
    assert_error(&err);
    assert!(format!("{err:?}").contains("Http"));
}
