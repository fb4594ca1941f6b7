//! Stack frame types.

use std::fmt;

use super::{Address, RegisterContext};

/// One physical frame produced by an unwind step.
///
/// `fp` is the frame base: the anchor a calling convention uses for the
/// activation's locals. A function that omits the frame pointer leaves `rbp`
/// holding its caller's frame base, so `fp` alone cannot order frames.
/// `cfa`, the canonical frame address, can: it is the caller's stack pointer
/// just before the call, and successive frames of a healthy walk have strictly
/// increasing values because the stack grows toward lower addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackFrame
{
    /// Program counter (return address for every frame but the first).
    pub pc: Address,
    /// Frame base pointer.
    pub fp: Address,
    /// Stack pointer.
    pub sp: Address,
    /// Canonical frame address, set by the walker from the function's frame layout.
    pub cfa: Address,
}

impl StackFrame
{
    /// Seed a frame from the canonical registers of a context.
    ///
    /// `cfa` assumes a frame-pointer prologue (`rbp + 16`); the walker
    /// corrects it for functions the function table marks as frameless.
    pub fn from_context(context: &RegisterContext) -> Self
    {
        Self {
            pc: context.pc,
            fp: context.fp,
            sp: context.sp,
            cfa: context.fp + 16,
        }
    }
}

impl fmt::Display for StackFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "PC: {}, FP: {}, SP: {}", self.pc, self.fp, self.sp)
    }
}

/// Cursor over one logical frame the compiler inlined into a physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineFrameCursor
{
    /// The physical program counter shared by every inline frame at this site.
    pub pc: Address,
    /// Provider-assigned inline context id.
    pub context: u32,
    /// Position in `[0, inline depth)`.
    pub ordinal: u32,
}

/// Differentiates physical frames from inline frames during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind
{
    /// Actual stack frame that consumed stack memory.
    Physical,
    /// Logical frame sharing the physical frame's storage.
    Inline
    {
        /// Inline context id handed back by the symbol provider.
        context: u32,
    },
}

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop
{
    /// The unwinder reported no further frame.
    Bottom,
    /// The unwinder produced a frame with a null program counter.
    NullAddress,
    /// The new frame's canonical frame address did not move toward the caller.
    ///
    /// This is a loop guard rather than a strict invariant: some optimised
    /// tail-call sequences legitimately reuse a frame base.
    OutOfSequence
    {
        /// Canonical frame address of the last accepted frame.
        previous: Address,
        /// The offending frame, which is not yielded by the walk.
        frame: StackFrame,
    },
}

impl WalkStop
{
    /// Trailing diagnostic line printed for abnormal stops.
    pub const fn diagnostic(&self) -> Option<&'static str>
    {
        match self {
            WalkStop::Bottom => None,
            WalkStop::NullAddress => Some("Null address"),
            WalkStop::OutOfSequence { .. } => Some("Stack frame out of sequence..."),
        }
    }
}
