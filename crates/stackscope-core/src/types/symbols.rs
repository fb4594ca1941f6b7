//! Symbol, line and module types returned by a symbol provider.

use std::fmt;

use bitflags::bitflags;
use rustc_demangle::try_demangle;
use serde::{Deserialize, Serialize};

use super::Address;

bitflags! {
    /// Symbol record flags, numbered as in PDB `SYMFLAG_*`.
    ///
    /// At most one of `REGISTER`, `REGISTER_RELATIVE` and `FRAME_RELATIVE` is
    /// set for a given symbol; it decides how the value is located.
    ///
    /// Serialised as the flag names joined by `|`, e.g. `"LOCAL | REGISTER_RELATIVE"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SymbolFlags: u32 {
        const VALUE_PRESENT = 0x0000_0001;
        /// The value lives directly in a register.
        const REGISTER = 0x0000_0008;
        /// The value lives at `register + offset`.
        const REGISTER_RELATIVE = 0x0000_0010;
        /// The value lives at `frame base + offset`.
        const FRAME_RELATIVE = 0x0000_0020;
        const PARAMETER = 0x0000_0040;
        const LOCAL = 0x0000_0080;
        const CONSTANT = 0x0000_0100;
        const FUNCTION = 0x0000_0800;
        /// Placeholder object without storage.
        const NULL = 0x0008_0000;
    }
}

/// A symbol record: a function, or a variable in some scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbol
{
    /// Undecorated name as stored in the debug information.
    pub name: String,
    /// Base address of the module whose type graph `type_id` indexes.
    pub module_base: Address,
    /// Type graph node of the symbol.
    pub type_id: u32,
    pub flags: SymbolFlags,
    /// Absolute address for functions; a signed displacement (two's complement)
    /// for register- and frame-relative variables.
    pub address: u64,
    /// Size of the object in bytes, `0` when unknown.
    pub size: u32,
    /// CodeView register code for register and register-relative variables.
    pub register: u32,
}

impl Symbol
{
    /// Local variable (as opposed to a global or a function).
    pub const fn is_local(&self) -> bool
    {
        self.flags.contains(SymbolFlags::LOCAL)
    }

    /// Placeholder object the renderer must skip.
    pub const fn is_null(&self) -> bool
    {
        self.flags.contains(SymbolFlags::NULL)
    }
}

/// A symbol found for an address, with the address's distance from its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolHit
{
    pub symbol: Symbol,
    /// `address - symbol.address`, two's complement when the address precedes it.
    pub displacement: u64,
}

/// Source position for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo
{
    pub file: String,
    pub line: u32,
    /// Bytes between the start of the line's code and the queried address.
    pub displacement: u32,
}

/// A loaded module, as announced by the debug-event loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor
{
    pub name: String,
    pub base: Address,
    pub size: u64,
}

impl ModuleDescriptor
{
    /// Returns `true` if `address` falls inside the module image.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.base && address.value() - self.base.value() < self.size
    }
}

/// How a function sets up its frame, from the module's function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout
{
    /// `push rbp; mov rbp, rsp` prologue: caller's frame base and return
    /// address are saved at `[rbp]` and `[rbp + 8]`.
    FramePointer,
    /// No frame pointer: the return address sits `stack_size` bytes above `rsp`.
    StackOnly
    {
        stack_size: u64,
    },
}

/// A function-table entry covering an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionEntry
{
    pub begin: Address,
    pub end: Address,
    pub layout: FrameLayout,
}

/// A function name with its demangled form, if any.
///
/// Rust symbols reach a Windows-style provider mangled when they come from the
/// public table; the formatter prints the demangled spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
}

impl SymbolName
{
    /// Construct from a raw linkage name, demangling Rust symbols.
    pub fn new(raw: impl Into<String>) -> Self
    {
        let raw = raw.into();
        let demangled = try_demangle(&raw).ok().map(|d| format!("{d:#}"));
        Self { raw, demangled }
    }

    /// Raw (possibly mangled) name.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    /// Preferred presentation (demangled fallback to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}
