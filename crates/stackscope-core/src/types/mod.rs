//! # Types
//!
//! Plain data shared by the engine and its collaborators.
//!
//! Everything here is transient: it is built during one stack walk and dropped
//! when the walk ends. Nothing is cached across walks.

pub mod address;
pub mod registers;
pub mod stack;
pub mod symbols;
pub mod thread;
pub mod type_graph;

// Re-export all public types
pub use address::Address;
pub use registers::{RegisterContext, RegisterDescriptor, X86_64Register};
pub use stack::{FrameKind, InlineFrameCursor, StackFrame, WalkStop};
pub use symbols::{
    FrameLayout, FunctionEntry, LineInfo, ModuleDescriptor, Symbol, SymbolFlags, SymbolHit, SymbolName,
};
pub use thread::ThreadId;
pub use type_graph::{TypeInfo, TypeQuery, TypeTag};
