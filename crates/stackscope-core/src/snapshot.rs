//! # Snapshots
//!
//! A [`Snapshot`] is a frozen, self-contained picture of one stopped thread:
//! its registers, the stack memory a walk will touch, and just enough symbol
//! and type information to render it. It implements every collaborator trait
//! the engine needs, so a trace can be replayed on any host, long after the
//! target process is gone.
//!
//! Snapshots are JSON documents. Memory blocks are hex strings (whitespace is
//! ignored), symbol flags are written by name:
//!
//! ```json
//! {
//!   "thread": 4242,
//!   "registers": { "pc": 5368713268, "sp": 2146435072, "fp": 2146435136 },
//!   "symbols": [{ "name": "process", "address": 5368713216, "size": 128, "flags": "FUNCTION" }],
//!   "memory": [{ "address": 2146435072, "bytes": "00112233 44556677" }]
//! }
//! ```
//!
//! Every field is optional; an empty document is a valid (if useless) snapshot.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StackscopeError};
use crate::provider::{read_error, ContextSource, MemoryReader, SymbolProvider};
use crate::types::{
    Address, FrameLayout, FunctionEntry, LineInfo, ModuleDescriptor, RegisterContext, Symbol, SymbolFlags, SymbolHit,
    ThreadId, TypeInfo, TypeQuery, TypeTag,
};

/// Replayable state of one thread. See the [module docs](self).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot
{
    pub thread: ThreadId,
    pub registers: RegisterContext,
    pub modules: Vec<ModuleDescriptor>,
    /// Function-table entries, for frames without a frame pointer.
    pub functions: Vec<FunctionRecord>,
    /// Function and public symbols.
    pub symbols: Vec<Symbol>,
    pub lines: Vec<LineRecord>,
    /// Lexical scopes and their variables.
    pub scopes: Vec<ScopeRecord>,
    pub inline_sites: Vec<InlineSite>,
    pub types: Vec<TypeRecord>,
    pub memory: Vec<MemoryBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord
{
    pub begin: Address,
    pub end: Address,
    /// Fixed frame size of a function that does not keep `rbp`; absent for
    /// frame-pointer functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_size: Option<u64>,
}

/// Code bytes `[address, address + length)` belong to `file(line)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord
{
    pub address: Address,
    /// Zero means "until the next record".
    #[serde(default)]
    pub length: u32,
    pub file: String,
    pub line: u32,
}

/// Variables visible while the program counter is in `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRecord
{
    pub begin: Address,
    pub end: Address,
    #[serde(default)]
    pub locals: Vec<Symbol>,
}

/// The inline frames stacked at one physical program counter, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSite
{
    pub address: Address,
    /// Context id of `frames[0]`; the others follow sequentially.
    pub first_context: u32,
    pub frames: Vec<InlineFrameRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFrameRecord
{
    pub name: String,
    /// First instruction of the inlined body.
    pub start: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineRecord>,
    /// `None` when the frame's scope cannot be entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<Vec<Symbol>>,
}

/// One node of a module's type graph. Absent fields answer no query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRecord
{
    pub module_base: Address,
    pub id: u32,
    /// Raw `SymTag` code.
    pub tag: Option<u32>,
    pub name: Option<String>,
    pub base_type: Option<u32>,
    pub length: Option<u64>,
    pub count: Option<u32>,
    pub child: Option<u32>,
}

/// Bytes captured from the target at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock
{
    pub address: Address,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl MemoryBlock
{
    fn end(&self) -> Option<u64>
    {
        self.address.value().checked_add(self.bytes.len() as u64)
    }
}

impl Snapshot
{
    /// Parse and validate a JSON snapshot.
    ///
    /// ## Errors
    ///
    /// - `Json` if the document does not parse
    /// - `InvalidSnapshot` if it parses but describes impossible state
    pub fn from_json(text: &str) -> Result<Self>
    {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        snapshot.validate()?;
        debug!(
            thread = %snapshot.thread,
            modules = snapshot.modules.len(),
            symbols = snapshot.symbols.len(),
            blocks = snapshot.memory.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Read a snapshot file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self>
    {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String>
    {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()>
    {
        let invalid = |message: String| Err(StackscopeError::InvalidSnapshot(message));

        for block in &self.memory {
            if block.end().is_none() {
                return invalid(format!("memory block at {} wraps the address space", block.address));
            }
        }
        for function in &self.functions {
            if function.begin >= function.end {
                return invalid(format!("empty function range at {}", function.begin));
            }
        }
        for scope in &self.scopes {
            if scope.begin >= scope.end {
                return invalid(format!("empty scope range at {}", scope.begin));
            }
        }
        for module in &self.modules {
            if module.base.checked_add(module.size).is_none() {
                return invalid(format!("module {} wraps the address space", module.name));
            }
        }
        for site in &self.inline_sites {
            if site.frames.is_empty() {
                return invalid(format!("inline site at {} has no frames", site.address));
            }
        }
        Ok(())
    }

    fn inline_frame(&self, address: Address, context: u32) -> Option<&InlineFrameRecord>
    {
        let site = self.inline_sites.iter().find(|site| site.address == address)?;
        let ordinal = context.checked_sub(site.first_context)?;
        site.frames.get(ordinal as usize)
    }

    fn type_record(&self, module_base: Address, type_id: u32) -> Option<&TypeRecord>
    {
        self.types
            .iter()
            .find(|record| record.module_base == module_base && record.id == type_id)
    }
}

/// Innermost record starting at or below `address` that still covers it.
fn nearest<'a, T>(
    items: &'a [T],
    address: Address,
    start: impl Fn(&T) -> Address,
    length: impl Fn(&T) -> u64,
) -> Option<&'a T>
{
    items
        .iter()
        .filter(|item| {
            let begin = start(*item);
            let size = length(*item);
            begin <= address && (size == 0 || address.value() - begin.value() < size)
        })
        .max_by_key(|item| start(*item))
}

fn line_info(record: &LineRecord, address: Address) -> LineInfo
{
    LineInfo {
        file: record.file.clone(),
        line: record.line,
        displacement: address.value().wrapping_sub(record.address.value()) as u32,
    }
}

impl SymbolProvider for Snapshot
{
    fn load_module(&mut self, module: &ModuleDescriptor) -> Result<()>
    {
        if !self.modules.iter().any(|known| known.base == module.base) {
            self.modules.push(module.clone());
        }
        Ok(())
    }

    fn unload_module(&mut self, base: Address) -> Result<()>
    {
        self.modules.retain(|module| module.base != base);
        Ok(())
    }

    fn symbol_at(&self, address: Address) -> Option<SymbolHit>
    {
        let symbol = nearest(&self.symbols, address, |s| Address::from(s.address), |s| u64::from(s.size))?;
        Some(SymbolHit {
            symbol: symbol.clone(),
            displacement: address.value().wrapping_sub(symbol.address),
        })
    }

    fn line_at(&self, address: Address) -> Option<LineInfo>
    {
        nearest(&self.lines, address, |l| l.address, |l| u64::from(l.length)).map(|record| line_info(record, address))
    }

    fn inline_symbol_at(&self, address: Address, context: u32) -> Option<SymbolHit>
    {
        let frame = self.inline_frame(address, context)?;
        let module_base = self.module_base(address).unwrap_or_default();
        Some(SymbolHit {
            symbol: Symbol {
                name: frame.name.clone(),
                module_base,
                flags: SymbolFlags::FUNCTION,
                address: frame.start.value(),
                ..Symbol::default()
            },
            displacement: address.value().wrapping_sub(frame.start.value()),
        })
    }

    fn inline_line_at(&self, address: Address, context: u32) -> Option<LineInfo>
    {
        let frame = self.inline_frame(address, context)?;
        frame.line.as_ref().map(|record| line_info(record, address))
    }

    fn type_info(&self, module_base: Address, type_id: u32, query: TypeQuery) -> Option<TypeInfo>
    {
        let record = self.type_record(module_base, type_id)?;
        match query {
            TypeQuery::Tag => record.tag.map(|code| TypeInfo::Tag(TypeTag::from_code(code))),
            TypeQuery::Name => record.name.clone().map(TypeInfo::Name),
            TypeQuery::BaseType => record.base_type.map(TypeInfo::BaseType),
            TypeQuery::Length => record.length.map(TypeInfo::Length),
            TypeQuery::Count => record.count.map(TypeInfo::Count),
            TypeQuery::ChildType => record.child.map(TypeInfo::ChildType),
        }
    }

    fn locals_at(&self, pc: Address, visit: &mut dyn FnMut(&Symbol))
    {
        self.scopes
            .iter()
            .filter(|scope| scope.begin <= pc && pc < scope.end)
            .flat_map(|scope| &scope.locals)
            .for_each(|symbol| visit(symbol));
    }

    fn inline_locals_at(&self, pc: Address, context: u32, visit: &mut dyn FnMut(&Symbol)) -> bool
    {
        let Some(locals) = self.inline_frame(pc, context).and_then(|frame| frame.locals.as_ref()) else {
            return false;
        };
        locals.iter().for_each(|symbol| visit(symbol));
        true
    }

    fn inline_frame_count(&self, address: Address) -> u32
    {
        self.inline_sites
            .iter()
            .find(|site| site.address == address)
            .map_or(0, |site| site.frames.len() as u32)
    }

    fn first_inline_context(&self, address: Address) -> Option<u32>
    {
        self.inline_sites
            .iter()
            .find(|site| site.address == address)
            .map(|site| site.first_context)
    }

    fn module_base(&self, address: Address) -> Option<Address>
    {
        self.modules
            .iter()
            .find(|module| module.contains(address))
            .map(|module| module.base)
    }

    fn function_entry(&self, address: Address) -> Option<FunctionEntry>
    {
        self.functions
            .iter()
            .find(|function| function.begin <= address && address < function.end)
            .map(|function| FunctionEntry {
                begin: function.begin,
                end: function.end,
                layout: function
                    .stack_size
                    .map_or(FrameLayout::FramePointer, |stack_size| FrameLayout::StackOnly { stack_size }),
            })
    }
}

impl MemoryReader for Snapshot
{
    fn read(&self, address: Address, buffer: &mut [u8]) -> Result<()>
    {
        let wanted_end = address
            .checked_add(buffer.len() as u64)
            .ok_or_else(|| read_error(address, buffer.len()))?;

        let block = self
            .memory
            .iter()
            .find(|block| block.address <= address && block.end().is_some_and(|end| wanted_end.value() <= end))
            .ok_or_else(|| read_error(address, buffer.len()))?;

        let start = (address.value() - block.address.value()) as usize;
        buffer.copy_from_slice(&block.bytes[start..start + buffer.len()]);
        Ok(())
    }
}

impl ContextSource for Snapshot
{
    fn capture(&self, thread: ThreadId) -> Result<RegisterContext>
    {
        if thread != self.thread {
            return Err(StackscopeError::ContextCapture(format!(
                "thread {thread} is not recorded in this snapshot (it holds thread {})",
                self.thread
            )));
        }
        Ok(self.registers.clone())
    }
}

mod hex_bytes
{
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error>
    {
        let text = String::deserialize(deserializer)?;
        let digits: String = text.split_whitespace().collect();
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
