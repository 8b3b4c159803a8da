//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the
//! engine_* macros through a capturing logger.

use crate::engine::Engine;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use serial_test::serial;

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_equality() {
    assert_eq!(LogSeverity::Info, LogSeverity::Info);
    assert_ne!(LogSeverity::Trace, LogSeverity::Error);
}

#[test]
fn test_log_severity_debug_format() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Warn), "Warn");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_clone() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "pulsar3d::Test".to_string(),
        message: "hello".to_string(),
        file: Some("log_tests.rs"),
        line: Some(1),
    };
    let cloned = entry.clone();
    assert_eq!(cloned.source, "pulsar3d::Test");
    assert_eq!(cloned.message, "hello");
    assert_eq!(cloned.file, Some("log_tests.rs"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let logger = DefaultLogger;
    logger.log(&LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "pulsar3d::Test".to_string(),
        message: "error with location".to_string(),
        file: Some("log_tests.rs"),
        line: Some(42),
    });
    logger.log(&LogEntry {
        severity: LogSeverity::Trace,
        timestamp: SystemTime::now(),
        source: "pulsar3d::Test".to_string(),
        message: "plain".to_string(),
        file: None,
        line: None,
    });
}

// ============================================================================
// CAPTURING LOGGER + MACRO TESTS
// ============================================================================

/// Logger that stores entries for inspection
struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CapturingLogger {
        entries: Arc::clone(&entries),
    });
    entries
}

#[test]
#[serial]
fn test_macros_route_through_installed_logger() {
    let entries = install_capture();

    crate::engine_info!("pulsar3d::Test", "info {}", 1);
    crate::engine_warn!("pulsar3d::Test", "warn {}", 2);
    crate::engine_error!("pulsar3d::Test", "error {}", 3);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].message, "info 1");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert_eq!(captured[2].severity, LogSeverity::Error);
    // engine_error! carries source location, engine_info! does not
    assert!(captured[2].file.is_some());
    assert!(captured[0].file.is_none());

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_err_macro_logs_and_builds_error() {
    let entries = install_capture();

    let err = crate::engine_err!("pulsar3d::Test", "submit failed: {}", "code 7");
    match err {
        crate::error::Error::BackendError(msg) => assert_eq!(msg, "submit failed: code 7"),
        other => panic!("unexpected error variant: {:?}", other),
    }

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].message, "submit failed: code 7");

    drop(captured);
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_engine_bail_macro_returns_early() {
    fn guarded(fail: bool) -> crate::error::Result<u32> {
        if fail {
            crate::engine_bail!("pulsar3d::Test", "guard tripped");
        }
        Ok(11)
    }

    Engine::set_logger(CapturingLogger {
        entries: Arc::new(Mutex::new(Vec::new())),
    });

    assert_eq!(guarded(false).unwrap(), 11);
    assert!(guarded(true).is_err());

    Engine::reset_logger();
}
