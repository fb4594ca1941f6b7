//! # Collaborator Interfaces
//!
//! The engine does not parse debug information, open processes or capture
//! registers itself. It talks to three collaborators through the traits below:
//!
//! - [`SymbolProvider`]: address → symbol/line, type id → type-graph node,
//!   scope enumeration and inline-frame queries
//! - [`MemoryReader`]: byte-range reads from the target's address space
//! - [`ContextSource`]: register snapshot of a stopped thread
//!
//! Lookups that can miss return `Option`; a miss is an expected outcome
//! (system code without symbols, optimised-away variables) and degrades the
//! output instead of failing the walk.

use crate::error::{Result, StackscopeError};
use crate::types::{
    Address, FunctionEntry, LineInfo, ModuleDescriptor, RegisterContext, Symbol, SymbolHit, ThreadId, TypeInfo,
    TypeQuery,
};

/// Symbol and type database for one debugged process.
///
/// A provider is stateful and not reentrant: scope enumeration may move an
/// internal "current scope". Wrap it in a [`SymbolSession`](crate::SymbolSession)
/// which enforces the initialise-once / finalise-once lifecycle, and keep one walk
/// in flight at a time.
pub trait SymbolProvider
{
    /// Bind the provider to its process. Called exactly once by the session.
    fn initialize(&mut self) -> Result<()>
    {
        Ok(())
    }

    /// Release everything bound to the process. Called exactly once by the session.
    fn finalize(&mut self) -> Result<()>
    {
        Ok(())
    }

    /// A module was mapped into the target.
    fn load_module(&mut self, _module: &ModuleDescriptor) -> Result<()>
    {
        Ok(())
    }

    /// The module at `base` was unmapped.
    fn unload_module(&mut self, _base: Address) -> Result<()>
    {
        Ok(())
    }

    /// Function (or public) symbol covering `address`.
    fn symbol_at(&self, address: Address) -> Option<SymbolHit>;

    /// Source line covering `address`.
    fn line_at(&self, address: Address) -> Option<LineInfo>;

    /// Symbol of the inline frame `context` at `address`.
    fn inline_symbol_at(&self, address: Address, context: u32) -> Option<SymbolHit>;

    /// Source line of the inline frame `context` at `address`.
    fn inline_line_at(&self, address: Address, context: u32) -> Option<LineInfo>;

    /// Answer one question about the type node `(module_base, type_id)`.
    fn type_info(&self, module_base: Address, type_id: u32, query: TypeQuery) -> Option<TypeInfo>;

    /// Visit every symbol in lexical scope at the physical frame whose program counter is `pc`.
    fn locals_at(&self, pc: Address, visit: &mut dyn FnMut(&Symbol));

    /// Visit every symbol in scope of inline frame `context` at `pc`.
    ///
    /// Returns `false` when the scope cannot be set; nothing is visited then.
    fn inline_locals_at(&self, pc: Address, context: u32, visit: &mut dyn FnMut(&Symbol)) -> bool;

    /// Number of logical frames inlined at `address` (zero for none).
    fn inline_frame_count(&self, address: Address) -> u32;

    /// Context id of the first inline frame at `address`; the rest follow sequentially.
    fn first_inline_context(&self, address: Address) -> Option<u32>;

    /// Base of the module containing `address`.
    fn module_base(&self, _address: Address) -> Option<Address>
    {
        None
    }

    /// Function-table entry covering `address`.
    fn function_entry(&self, _address: Address) -> Option<FunctionEntry>
    {
        None
    }
}

/// Reads bytes out of the target's address space.
pub trait MemoryReader
{
    /// Fill `buffer` from `address`, failing unless every byte was read.
    fn read(&self, address: Address, buffer: &mut [u8]) -> Result<()>;

    /// Read a little-endian 64-bit word.
    fn read_u64(&self, address: Address) -> Result<u64>
    {
        let mut buffer = [0; 8];
        self.read(address, &mut buffer)?;
        Ok(u64::from_le_bytes(buffer))
    }
}

impl<T: MemoryReader + ?Sized> MemoryReader for &T
{
    fn read(&self, address: Address, buffer: &mut [u8]) -> Result<()>
    {
        (**self).read(address, buffer)
    }
}

/// Captures the register context of a stopped thread.
pub trait ContextSource
{
    fn capture(&self, thread: ThreadId) -> Result<RegisterContext>;
}

/// A context source that always hands back the same, externally supplied context.
///
/// Used when replaying a context captured at an exception: the snapshot is
/// used verbatim instead of a live capture.
#[derive(Debug, Clone)]
pub struct FixedContext(pub RegisterContext);

impl ContextSource for FixedContext
{
    fn capture(&self, _thread: ThreadId) -> Result<RegisterContext>
    {
        Ok(self.0.clone())
    }
}

/// Build the error a reader returns for an unreadable range.
pub(crate) fn read_error(address: Address, length: usize) -> StackscopeError
{
    StackscopeError::MemoryRead {
        address: address.value(),
        length,
    }
}
