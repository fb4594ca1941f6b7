//! Frame-pointer unwinding for x86-64.

use tracing::trace;

use super::{frame_layout, UnwindPrimitive};
use crate::error::Result;
use crate::provider::{MemoryReader, SymbolProvider};
use crate::types::{Address, FrameLayout, RegisterContext, StackFrame};

/// Unwinds through the `rbp` chain, falling back to the function table for
/// functions that do not keep a frame pointer.
///
/// For a frame-pointer function the caller's frame base and the return address
/// are at `[rbp]` and `[rbp + 8]`. For a function the table describes as
/// stack-only the return address is `stack_size` bytes above `rsp` and `rbp`
/// is left untouched, so the caller's frame still reports the caller's `rbp`.
pub struct FramePointerUnwinder<M>
{
    memory: M,
}

impl<M: MemoryReader> FramePointerUnwinder<M>
{
    pub fn new(memory: M) -> Self
    {
        Self { memory }
    }
}

impl<M: MemoryReader> UnwindPrimitive for FramePointerUnwinder<M>
{
    fn step(&mut self, context: &mut RegisterContext, frame: &mut StackFrame, symbols: &dyn SymbolProvider)
        -> Result<bool>
    {
        match frame_layout(symbols, context.pc) {
            FrameLayout::FramePointer => {
                let fp = context.fp;
                if fp.is_null() {
                    return Ok(false);
                }
                let saved_fp = self.memory.read_u64(fp)?;
                let return_address = self.memory.read_u64(fp + 8)?;
                // Zeroed link: the thread entry point's sentinel frame.
                if saved_fp == 0 && return_address == 0 {
                    return Ok(false);
                }
                context.pc = Address::from(return_address);
                context.sp = fp + 16;
                context.fp = Address::from(saved_fp);
                *frame = StackFrame::from_context(context);
            }
            FrameLayout::StackOnly { stack_size } => {
                let slot = context.sp + stack_size;
                let return_address = self.memory.read_u64(slot)?;
                context.pc = Address::from(return_address);
                context.sp = slot + 8;
                *frame = StackFrame::from_context(context);
            }
        }
        trace!(%frame, "frame pointer step");
        Ok(true)
    }
}
