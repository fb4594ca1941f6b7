//! # stackscope-core
//!
//! Stack unwinding and symbol decoration for a stopped thread.
//!
//! Given the register context of a suspended thread, this crate produces a
//! readable call stack: every physical frame with its symbol, displacement and
//! source line, the inline frames the compiler folded into it, and the local
//! variables in scope with their declared C types and live values.
//!
//! ```text
//! Frame               Code address
//! 0x0000007FF0000040  0x0000000140001034 process + 52   test.cpp(71) + 3 bytes
//!   int count [rbp-14] = 0x2a
//! -- inline frame --  0x0000000140001034 helper + 4   test.cpp(12)
//! 0x0000007FF0000080  0x0000000140001190 main + 16   test.cpp(90)
//! ```
//!
//! ## Architecture
//!
//! - [`unwind`]: the frame walker and its stop conditions
//! - [`symbols`]: address formatting, inline expansion, type declarators
//! - [`locals`]: variable rendering at a configurable [`Detail`] level
//! - [`trace`]: ties the above together and writes to any `io::Write`
//!
//! Debug information, process memory and register capture come from outside
//! through the [`SymbolProvider`], [`MemoryReader`] and [`ContextSource`]
//! traits. [`Snapshot`] implements all three from a JSON document, which is how
//! traces are replayed offline; [`platform`] has live Linux backends.
//!
//! ## Why unsafe code is needed
//!
//! The Linux backends call `process_vm_readv` and `ptrace` through `libc`.
//! Everything else is safe code.

#![allow(unsafe_code)] // Required for process_vm_readv and ptrace

pub mod error;
pub mod locals;
pub mod platform;
pub mod provider;
pub mod session;
pub mod snapshot;
pub mod symbols;
pub mod trace;
pub mod types;
pub mod unwind;

pub use error::{Result, StackscopeError};
pub use locals::{Detail, LocalRenderer, RenderOptions};
pub use provider::{ContextSource, FixedContext, MemoryReader, SymbolProvider};
pub use session::SymbolSession;
pub use snapshot::Snapshot;
pub use trace::{StackTracer, TraceSummary};
// Re-export commonly used types
pub use types::{Address, RegisterContext, StackFrame, ThreadId, WalkStop};
pub use unwind::{FramePointerUnwinder, FrameWalk, StackWalker, UnwindPrimitive};
