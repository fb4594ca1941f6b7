//! # Platform Backends
//!
//! Live-process implementations of the collaborator traits.
//!
//! - **Linux**: `process_vm_readv` for memory, `ptrace(PTRACE_GETREGS)` for
//!   registers
//!   - See: [process_vm_readv(2)](https://man7.org/linux/man-pages/man2/process_vm_readv.2.html)
//!   - See: [ptrace(2)](https://man7.org/linux/man-pages/man2/ptrace.2.html)
//!
//! Attaching to the process and stopping the thread are the caller's job; the
//! backends only read from a target that is already held still.

#[cfg(target_os = "linux")]
pub mod linux;
