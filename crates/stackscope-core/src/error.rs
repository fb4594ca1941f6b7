//! # Error Types
//!
//! General error handling for the stack engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most problems the engine runs into while rendering a trace are *not* errors:
//! a missing symbol, an unknown register or an unresolved type simply degrade the
//! output. The variants below cover what is left: memory reads the caller asked
//! for explicitly, session lifecycle misuse, and I/O on the output sink.

use thiserror::Error;

/// Main error type for stack engine operations
///
/// ## Error Categories
///
/// 1. **Memory errors**: MemoryRead
/// 2. **Lifecycle errors**: SessionAlreadyInitialized, SessionNotInitialized
/// 3. **Platform errors**: ContextCapture
/// 4. **Input errors**: InvalidSnapshot, UnknownModule
/// 5. **I/O errors**: Io, Json
#[derive(Error, Debug)]
pub enum StackscopeError
{
    /// Reading target memory failed
    ///
    /// This happens when:
    /// - The page is unmapped or protected in the target
    /// - The target process has exited
    /// - The range wraps around the end of the address space
    #[error("Failed to read {length} byte(s) at 0x{address:016x}")]
    MemoryRead
    {
        /// First address of the requested range
        address: u64,
        /// Number of bytes requested
        length: usize,
    },

    /// The symbol session was initialised twice
    ///
    /// A session binds the symbol provider to one debugged process and must be
    /// initialised exactly once.
    #[error("Symbol session is already initialized")]
    SessionAlreadyInitialized,

    /// The symbol session was queried before initialisation or after finalisation
    #[error("Symbol session is not initialized")]
    SessionNotInitialized,

    /// Capturing the register context of a thread failed
    #[error("Failed to capture register context: {0}")]
    ContextCapture(String),

    /// A replay snapshot is structurally invalid
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// No module is loaded at the given base address
    #[error("No module loaded at 0x{0:016x}")]
    UnknownModule(u64),

    /// I/O error (output sink, snapshot files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, StackscopeError>`
///
/// ```rust
/// use stackscope_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, StackscopeError>;
