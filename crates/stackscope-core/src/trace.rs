//! # Stack Tracer
//!
//! Drives a [`FrameWalk`](crate::unwind::FrameWalk) and renders each frame to
//! an output sink as soon as it is produced:
//!
//! ```text
//! Frame               Code address
//! 0x0000007FF0000040  0x0000000140001034 process + 52   test.cpp(71) + 3 bytes
//!   int count [rbp-14] = 0x2a
//! -- inline frame --  0x0000000140001034 helper + 4   test.cpp(12)
//!   char c [rsp+20] = 'A'
//! 0x0000007FF0000080  0x0000000140001190 main + 16   test.cpp(90)
//! ```
//!
//! Nothing is buffered across frames. Only sink I/O errors and session misuse
//! escape; everything the target or the symbol data gets wrong degrades the
//! output instead.

use std::io::Write;

use tracing::{debug, info};

use crate::error::Result;
use crate::locals::{LocalRenderer, RenderOptions};
use crate::provider::{ContextSource, FixedContext, MemoryReader, SymbolProvider};
use crate::session::SymbolSession;
use crate::symbols::{AddressFormatter, InlineFrameExpander};
use crate::types::{RegisterContext, ThreadId, WalkStop};
use crate::unwind::{FramePointerUnwinder, StackWalker, UnwindPrimitive};

/// First line of every trace.
pub const HEADER: &str = "Frame               Code address";

/// Marker that introduces an inline frame line.
pub const INLINE_MARKER: &str = "-- inline frame --";

/// What a finished trace covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSummary
{
    pub physical_frames: usize,
    pub inline_frames: usize,
    pub stop: WalkStop,
}

/// Renders full stack traces against one symbol session.
pub struct StackTracer<'s, P: SymbolProvider, M: ?Sized>
{
    session: &'s SymbolSession<P>,
    memory: &'s M,
    options: RenderOptions,
}

impl<'s, P: SymbolProvider, M: MemoryReader + ?Sized> StackTracer<'s, P, M>
{
    /// ## Errors
    ///
    /// `SessionNotInitialized` if the session is not ready.
    pub fn new(session: &'s SymbolSession<P>, memory: &'s M) -> Result<Self>
    {
        session.provider()?;
        Ok(Self {
            session,
            memory,
            options: RenderOptions::default(),
        })
    }

    pub fn with_options(mut self, options: impl Into<RenderOptions>) -> Self
    {
        self.options = options.into();
        self
    }

    /// Capture `thread` through `source` and trace it.
    pub fn trace<C>(&self, source: &C, thread: ThreadId, sink: &mut dyn Write) -> Result<TraceSummary>
    where
        C: ContextSource + ?Sized,
    {
        let context = source.capture(thread)?;
        debug!(%thread, pc = %context.pc, "captured thread context");
        self.trace_with_unwinder(FramePointerUnwinder::new(self.memory), context, sink)
    }

    /// Trace from an externally supplied context, used verbatim.
    pub fn trace_with_context(&self, context: RegisterContext, sink: &mut dyn Write) -> Result<TraceSummary>
    {
        self.trace(&FixedContext(context), ThreadId::default(), sink)
    }

    /// Trace with a caller-chosen unwind primitive.
    pub fn trace_with_unwinder<U>(&self, unwinder: U, context: RegisterContext, sink: &mut dyn Write)
        -> Result<TraceSummary>
    where
        U: UnwindPrimitive,
    {
        let provider = self.session.provider()?;
        let formatter = AddressFormatter::new(provider);
        let expander = InlineFrameExpander::new(provider);
        let renderer = LocalRenderer::new(provider, self.memory, self.options);

        writeln!(sink, "{HEADER}")?;

        let mut physical_frames = 0;
        let mut inline_frames = 0;
        let mut walker = StackWalker::new(self.session, unwinder)?;
        let mut walk = walker.walk(context);

        while let Some(frame) = walk.next() {
            physical_frames += 1;
            writeln!(sink, "{}  {}", frame.fp, formatter.format(frame.pc))?;
            renderer.render_frame(&frame, walk.context(), sink)?;

            for cursor in expander.expand(frame.pc) {
                inline_frames += 1;
                writeln!(sink, "{INLINE_MARKER}  {}", formatter.format_inline(cursor.pc, cursor.context))?;
                renderer.render_inline(&cursor, &frame, walk.context(), sink)?;
            }
        }

        let stop = walk.stop().unwrap_or(WalkStop::Bottom);
        if let WalkStop::OutOfSequence { frame, .. } = stop {
            writeln!(sink, "{}  {}", frame.fp, formatter.format(frame.pc))?;
        }
        if let Some(diagnostic) = stop.diagnostic() {
            writeln!(sink, "{diagnostic}")?;
        }
        sink.flush()?;

        info!(physical_frames, inline_frames, ?stop, "trace complete");
        Ok(TraceSummary {
            physical_frames,
            inline_frames,
            stop,
        })
    }
}
