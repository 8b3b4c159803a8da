//! Unit tests for error.rs

use crate::error::{Error, Result};

#[test]
fn test_error_display_backend() {
    let err = Error::BackendError("queue submit failed".to_string());
    assert_eq!(format!("{}", err), "Backend error: queue submit failed");
}

#[test]
fn test_error_display_out_of_memory() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_error_display_pool_exhausted() {
    let err = Error::PoolExhausted("binding sets (256)".to_string());
    assert_eq!(format!("{}", err), "Pool exhausted: binding sets (256)");
}

#[test]
fn test_error_display_invalid_resource() {
    let err = Error::InvalidResource("mesh 'cube' not registered".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: mesh 'cube' not registered");
}

#[test]
fn test_error_display_initialization_failed() {
    let err = Error::InitializationFailed("no adapter".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no adapter");
}

#[test]
fn test_error_is_std_error() {
    // Error must be usable through the std error trait object
    let err: Box<dyn std::error::Error> = Box::new(Error::OutOfMemory);
    assert_eq!(err.to_string(), "Out of GPU memory");
}

#[test]
fn test_error_clone() {
    let err = Error::InitializationFailed("probe negative".to_string());
    let cloned = err.clone();
    assert_eq!(format!("{}", err), format!("{}", cloned));
}

#[test]
fn test_result_alias() {
    fn produces() -> Result<u32> {
        Ok(7)
    }
    assert_eq!(produces().unwrap(), 7);
}
