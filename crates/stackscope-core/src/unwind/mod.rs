//! # Frame Walker
//!
//! Iterates the physical frames of a stopped thread, callee to caller.
//!
//! The walker owns the loop and its stop conditions; moving from one frame to
//! the next is delegated to an [`UnwindPrimitive`], the platform-specific part
//! that knows the calling convention. The primitive may consult the symbol
//! provider's module-base and function-table lookups along the way.
//!
//! ## Stop conditions
//!
//! In priority order:
//!
//! 1. the primitive reports no further frame, or fails: [`WalkStop::Bottom`]
//! 2. the new frame's program counter is null: [`WalkStop::NullAddress`]
//! 3. the new frame's canonical frame address does not exceed the previous
//!    one: [`WalkStop::OutOfSequence`]
//!
//! The third check is a loop guard. It compares canonical frame addresses
//! rather than `rbp`, because a function without a frame pointer leaves `rbp`
//! holding its caller's value. The walker computes the address itself for
//! every frame with [`canonical_frame_address`]:
//!
//! - frame-pointer function: `rbp + 16`, past the saved `rbp` and return address
//! - frameless function with a fixed allocation: `rsp + stack_size + 8`
//!
//! A corrupted chain or a tail call can still produce an address that does
//! not move, which would otherwise make the walk spin forever; the trace is
//! cut short instead. It is a heuristic, not a correctness property of every
//! stack.
//!
//! An incomplete trace is always preferred over an aborted one, so nothing in
//! here returns an error once the walk has started.

mod frame_pointer;

pub use frame_pointer::FramePointerUnwinder;
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::Result;
use crate::provider::SymbolProvider;
use crate::session::SymbolSession;
use crate::types::{Address, FrameLayout, RegisterContext, StackFrame, WalkStop};

/// How the function at `pc` sets up its frame.
///
/// Only addresses inside a known module are looked up in the function table;
/// everything else is assumed to keep a frame pointer.
pub(crate) fn frame_layout(symbols: &dyn SymbolProvider, pc: Address) -> FrameLayout
{
    symbols
        .module_base(pc)
        .and_then(|_| symbols.function_entry(pc))
        .map_or(FrameLayout::FramePointer, |entry| entry.layout)
}

/// Canonical frame address of the frame `context` describes: the caller's
/// stack pointer just before the call.
pub fn canonical_frame_address(symbols: &dyn SymbolProvider, context: &RegisterContext) -> Address
{
    match frame_layout(symbols, context.pc) {
        FrameLayout::FramePointer => context.fp + 16,
        FrameLayout::StackOnly { stack_size } => context.sp + stack_size + 8,
    }
}

/// Advances a register context by one physical frame.
pub trait UnwindPrimitive
{
    /// Move `context` and `frame` to the caller of the current frame.
    ///
    /// Returns `Ok(false)` at the bottom of the stack. Errors are treated by the
    /// walker exactly like `Ok(false)`. The walker overwrites `frame.cfa`.
    fn step(
        &mut self,
        context: &mut RegisterContext,
        frame: &mut StackFrame,
        symbols: &dyn SymbolProvider,
    ) -> Result<bool>;
}

impl<U: UnwindPrimitive + ?Sized> UnwindPrimitive for &mut U
{
    fn step(&mut self, context: &mut RegisterContext, frame: &mut StackFrame, symbols: &dyn SymbolProvider)
        -> Result<bool>
    {
        (**self).step(context, frame, symbols)
    }
}

/// Produces lazy frame walks against an initialised session.
pub struct StackWalker<'s, P: SymbolProvider, U>
{
    provider: &'s P,
    unwinder: U,
}

impl<'s, P: SymbolProvider, U: UnwindPrimitive> StackWalker<'s, P, U>
{
    /// ## Errors
    ///
    /// `SessionNotInitialized` if the session is not ready.
    pub fn new(session: &'s SymbolSession<P>, unwinder: U) -> Result<Self>
    {
        Ok(Self {
            provider: session.provider()?,
            unwinder,
        })
    }

    /// Start a walk from `context`.
    ///
    /// The first frame yielded is the one described by `context` itself; each
    /// further frame costs one unwind step. The walk is finite and cannot be
    /// restarted.
    pub fn walk(&mut self, context: RegisterContext) -> FrameWalk<'_, P, U>
    {
        let mut frame = StackFrame::from_context(&context);
        frame.cfa = canonical_frame_address(self.provider, &context);
        debug!(%frame, cfa = %frame.cfa, "starting stack walk");
        FrameWalk {
            provider: self.provider,
            unwinder: &mut self.unwinder,
            context,
            frame,
            previous_cfa: Address::ZERO,
            started: false,
            stop: None,
        }
    }
}

/// A single-pass iterator over physical frames.
pub struct FrameWalk<'w, P: SymbolProvider, U>
{
    provider: &'w P,
    unwinder: &'w mut U,
    context: RegisterContext,
    frame: StackFrame,
    previous_cfa: Address,
    started: bool,
    stop: Option<WalkStop>,
}

impl<P: SymbolProvider, U: UnwindPrimitive> FrameWalk<'_, P, U>
{
    /// Why the walk ended; `None` while frames are still coming.
    pub fn stop(&self) -> Option<WalkStop>
    {
        self.stop
    }

    /// Register context as unwound to the most recently yielded frame.
    pub fn context(&self) -> &RegisterContext
    {
        &self.context
    }

    fn finish(&mut self, stop: WalkStop) -> Option<StackFrame>
    {
        debug!(?stop, "stack walk finished");
        self.stop = Some(stop);
        None
    }
}

impl<P: SymbolProvider, U: UnwindPrimitive> Iterator for FrameWalk<'_, P, U>
{
    type Item = StackFrame;

    fn next(&mut self) -> Option<StackFrame>
    {
        if self.stop.is_some() {
            return None;
        }

        if self.started {
            match self.unwinder.step(&mut self.context, &mut self.frame, self.provider) {
                Ok(true) => {
                    self.frame.cfa = canonical_frame_address(self.provider, &self.context);
                    trace!(frame = %self.frame, cfa = %self.frame.cfa, "unwound");
                }
                Ok(false) => return self.finish(WalkStop::Bottom),
                Err(err) => {
                    debug!("unwind step failed, treating as end of stack: {err}");
                    return self.finish(WalkStop::Bottom);
                }
            }
        } else {
            self.started = true;
        }

        let frame = self.frame;
        if frame.pc.is_null() {
            return self.finish(WalkStop::NullAddress);
        }
        if self.previous_cfa >= frame.cfa {
            let previous = self.previous_cfa;
            return self.finish(WalkStop::OutOfSequence { previous, frame });
        }
        self.previous_cfa = frame.cfa;
        Some(frame)
    }
}

impl<P: SymbolProvider, U: UnwindPrimitive> FusedIterator for FrameWalk<'_, P, U> {}
