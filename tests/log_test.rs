use std::fs;
use std::io::Write;

use canary_stack::log::{Level, LogSink, LogValue, SharedLogSink};
use canary_stack::{log_value, stack_dump, stack_init, Element, LogConfig, Stack};
use tracing_subscriber::fmt::MakeWriter;

fn config(dir: &tempfile::TempDir, rotate_bytes: u64) -> LogConfig {
    LogConfig {
        directory: dir.path().join("log"),
        rotate_bytes,
        ..LogConfig::default()
    }
}

#[test]
fn session_is_framed_by_banners() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 1 << 20);
    let path = config.file_path(0);

    let mut sink = LogSink::open(config);
    assert!(sink.is_enabled());
    assert_eq!(sink.path(), path);
    let capacity = 16usize;
    log_value!(sink, capacity, Level::Value).unwrap();
    sink.write_value(LogValue::Str("full"), "state", "main.rs", "main", 3, Level::Warning)
        .unwrap();
    drop(sink);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert!(lines[2].contains("START"));
    assert!(lines[4].starts_with("[VALUE] tests/log_test.rs:"));
    assert!(lines[4].ends_with("log_test::session_is_framed_by_banners: capacity = 16"));
    assert_eq!(lines[5], "[WARNING] main.rs:3 in main: state = \"full\"");
    assert!(lines[lines.len() - 2].contains(" END "));
}

#[test]
fn reopening_appends() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 1 << 20);

    drop(LogSink::open(config.clone()));
    drop(LogSink::open(config.clone()));

    let text = fs::read_to_string(config.file_path(0)).unwrap();
    assert_eq!(text.matches("START").count(), 2);
    assert_eq!(text.matches(" END ").count(), 2);
}

#[test]
fn rotates_once_the_file_is_full() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 512);

    let mut sink = LogSink::open(config.clone());
    for n in 0..64 {
        writeln!(sink.file(), "line {:04}", n).unwrap();
    }
    assert_ne!(sink.path(), config.file_path(0));
    drop(sink);

    let first = fs::read_to_string(config.file_path(0)).unwrap();
    let second = fs::read_to_string(config.file_path(1)).unwrap();
    assert!(first.contains(" END "));
    assert!(second.contains("START"));
    assert!(first.len() as u64 > 512);
    assert!(first.len() < 1024);
}

#[test]
fn skips_files_that_are_already_full() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 16);
    fs::create_dir_all(&config.directory).unwrap();
    fs::write(config.file_path(0), [b'x'; 64]).unwrap();

    let sink = LogSink::open(config.clone());
    assert_eq!(sink.path(), config.file_path(1));
}

#[test]
fn unopenable_file_disables_logging() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let mut sink = LogSink::open(LogConfig {
        directory: blocker.join("log"),
        ..LogConfig::default()
    });
    assert!(!sink.is_enabled());
    writeln!(sink.file(), "nowhere").unwrap();
    sink.write_value(LogValue::Char('x'), "c", "a.rs", "f", 1, Level::Error)
        .unwrap();
}

#[test]
fn failed_rotation_goes_quiet_without_errors() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 512);
    let mut sink = LogSink::open(config.clone());
    assert!(sink.is_enabled());

    // The next log file can no longer be created.
    fs::remove_dir_all(&config.directory).unwrap();
    fs::write(&config.directory, b"not a directory").unwrap();

    for n in 0..64 {
        writeln!(sink.file(), "line {:04}", n).unwrap();
    }
    assert!(!sink.is_enabled());
    sink.write_value(LogValue::Char('x'), "c", "a.rs", "f", 1, Level::Error)
        .unwrap();
}

#[test]
fn dumps_go_to_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 1 << 20);
    let mut sink = LogSink::open(config.clone());

    let mut numbers = Stack::<i32>::new();
    stack_init!(numbers, 2, i32::copy).unwrap();
    numbers.push(42).unwrap();
    stack_dump!(&numbers, numbers.validate(), sink.file()).unwrap();
    drop(sink);

    let text = fs::read_to_string(config.file_path(0)).unwrap();
    assert!(text.contains("|    42|POISON|"));
}

#[test]
fn shared_sink_feeds_tracing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir, 1 << 20);
    let shared = SharedLogSink::new(LogSink::open(config.clone()));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(shared.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(capacity = 8, "stack ready");
    });

    shared.make_writer().flush().unwrap();
    let text = fs::read_to_string(config.file_path(0)).unwrap();
    assert!(text.contains("stack ready"));
    assert!(text.contains("capacity=8"));
}
