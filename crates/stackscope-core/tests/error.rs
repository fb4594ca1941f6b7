//! Tests for error handling

use stackscope_core::error::{Result, StackscopeError};

#[test]
fn test_memory_read_display()
{
    let error = StackscopeError::MemoryRead {
        address: 0x7ff0_0000,
        length: 8,
    };
    let message = format!("{}", error);
    assert!(message.contains("8 byte(s)"));
    assert!(message.contains("0x000000007ff00000"));
}

#[test]
fn test_session_lifecycle_display()
{
    let message = format!("{}", StackscopeError::SessionAlreadyInitialized);
    assert!(message.contains("already initialized"));

    let message = format!("{}", StackscopeError::SessionNotInitialized);
    assert!(message.contains("not initialized"));
}

#[test]
fn test_context_capture_display()
{
    let error = StackscopeError::ContextCapture("thread 12 is gone".to_string());
    let message = format!("{}", error);
    assert!(message.contains("register context"));
    assert!(message.contains("thread 12 is gone"));
}

#[test]
fn test_invalid_snapshot_display()
{
    let error = StackscopeError::InvalidSnapshot("empty scope".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid snapshot"));
    assert!(message.contains("empty scope"));
}

#[test]
fn test_unknown_module_display()
{
    let message = format!("{}", StackscopeError::UnknownModule(0x1_4000_0000));
    assert!(message.contains("0x0000000140000000"));
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed");
    let error: StackscopeError = io.into();

    match error {
        StackscopeError::Io(_) => {
            // Expected: io::Error converts into the Io variant
        }
        _ => panic!("Expected Io variant"),
    }
}

#[test]
fn test_json_error_conversion()
{
    let json = serde_json::from_str::<u64>("not a number").unwrap_err();
    let error: StackscopeError = json.into();
    assert!(format!("{}", error).starts_with("JSON error"));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: Result<()> = Ok(());
    let _error_result: Result<()> = Err(StackscopeError::SessionNotInitialized);
}
