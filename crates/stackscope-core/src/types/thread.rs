//! Thread identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Platform-agnostic thread identifier
///
/// The exact meaning depends on the platform backend:
///
/// - **Linux**: Thread ID (TID) of a ptrace-stopped thread
/// - **Replay**: the thread id recorded in the snapshot
///
/// The engine never suspends or resumes the thread itself; the caller hands it
/// over already stopped.
///
/// ```rust
/// use stackscope_core::types::ThreadId;
///
/// let thread = ThreadId::from(12345);
/// assert_eq!(thread.raw(), 12345);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    /// Get the raw `u64` representation of the thread identifier
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}
