//! Shared snapshot fixtures for the integration tests.

#![allow(dead_code)]

use stackscope_core::snapshot::{
    FunctionRecord, InlineFrameRecord, InlineSite, LineRecord, MemoryBlock, ScopeRecord, TypeRecord,
};
use stackscope_core::types::{type_graph::base_type, Address, ModuleDescriptor, Symbol, SymbolFlags, X86_64Register};
use stackscope_core::{RegisterContext, Snapshot, ThreadId};

pub const STACK: u64 = 0x7ff0_0000;
pub const MODULE: u64 = 0x1_4000_0000;
pub const THREAD: ThreadId = ThreadId(4242);

pub const INT: u32 = 1;
pub const CHAR: u32 = 2;

pub const RBP: u32 = 334;
pub const RSP: u32 = 335;
pub const ESI: u32 = 23;

/// Builds a snapshot around one zero-filled stack page.
pub struct Fixture
{
    snapshot: Snapshot,
    stack: Vec<u8>,
}

impl Fixture
{
    pub fn new() -> Self
    {
        let snapshot = Snapshot {
            thread: THREAD,
            modules: vec![ModuleDescriptor {
                name: "test.exe".into(),
                base: Address::from(MODULE),
                size: 0x1_0000,
            }],
            types: vec![
                TypeRecord {
                    module_base: Address::from(MODULE),
                    id: INT,
                    tag: Some(16),
                    base_type: Some(base_type::INT),
                    length: Some(4),
                    ..TypeRecord::default()
                },
                TypeRecord {
                    module_base: Address::from(MODULE),
                    id: CHAR,
                    tag: Some(16),
                    base_type: Some(base_type::CHAR),
                    length: Some(1),
                    ..TypeRecord::default()
                },
            ],
            ..Snapshot::default()
        };
        Self {
            snapshot,
            stack: vec![0; 0x1000],
        }
    }

    pub fn bytes(mut self, stack_offset: u64, bytes: &[u8]) -> Self
    {
        let at = stack_offset as usize;
        self.stack[at..at + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn word(self, stack_offset: u64, value: u64) -> Self
    {
        self.bytes(stack_offset, &value.to_le_bytes())
    }

    /// A function symbol covering `[MODULE + offset, MODULE + offset + size)`.
    pub fn function(mut self, name: &str, offset: u64, size: u32) -> Self
    {
        self.snapshot.symbols.push(Symbol {
            name: name.into(),
            module_base: Address::from(MODULE),
            flags: SymbolFlags::FUNCTION,
            address: MODULE + offset,
            size,
            ..Symbol::default()
        });
        self
    }

    /// A function-table entry for a function without a frame pointer.
    pub fn frameless(mut self, offset: u64, size: u64, stack_size: u64) -> Self
    {
        self.snapshot.functions.push(FunctionRecord {
            begin: Address::from(MODULE + offset),
            end: Address::from(MODULE + offset + size),
            stack_size: Some(stack_size),
        });
        self
    }

    pub fn line(mut self, offset: u64, length: u32, file: &str, line: u32) -> Self
    {
        self.snapshot.lines.push(line_record(offset, length, file, line));
        self
    }

    pub fn scope(mut self, offset: u64, size: u64, locals: Vec<Symbol>) -> Self
    {
        self.snapshot.scopes.push(ScopeRecord {
            begin: Address::from(MODULE + offset),
            end: Address::from(MODULE + offset + size),
            locals,
        });
        self
    }

    pub fn inline_site(mut self, offset: u64, first_context: u32, frames: Vec<InlineFrameRecord>) -> Self
    {
        self.snapshot.inline_sites.push(InlineSite {
            address: Address::from(MODULE + offset),
            first_context,
            frames,
        });
        self
    }

    /// Link a frame-pointer chain through the stack page.
    ///
    /// `frames` lists `(code offset, frame-base offset)` pairs, innermost first.
    /// The outermost frame's link is zeroed.
    pub fn chain(mut self, frames: &[(u64, u64)]) -> Self
    {
        for (index, &(_, fp)) in frames.iter().enumerate() {
            let (saved_fp, return_address) = match frames.get(index + 1) {
                Some(&(pc, caller_fp)) => (STACK + caller_fp, MODULE + pc),
                None => (0, 0),
            };
            self = self.word(fp, saved_fp).word(fp + 8, return_address);
        }
        if let Some(&(pc, fp)) = frames.first() {
            self = self.registers(pc, fp);
        }
        self
    }

    pub fn registers(mut self, pc_offset: u64, fp_offset: u64) -> Self
    {
        self.snapshot.registers = RegisterContext::new(
            Address::from(MODULE + pc_offset),
            Address::from(STACK + fp_offset - 0x20),
            Address::from(STACK + fp_offset),
        );
        self
    }

    pub fn stack_pointer(mut self, stack_offset: u64) -> Self
    {
        self.snapshot.registers.sp = Address::from(STACK + stack_offset);
        self
    }

    pub fn register(mut self, register: X86_64Register, value: u64) -> Self
    {
        self.snapshot.registers.set(register, value);
        self
    }

    pub fn build(mut self) -> Snapshot
    {
        self.snapshot.memory.push(MemoryBlock {
            address: Address::from(STACK),
            bytes: self.stack,
        });
        self.snapshot
    }
}

pub fn line_record(offset: u64, length: u32, file: &str, line: u32) -> LineRecord
{
    LineRecord {
        address: Address::from(MODULE + offset),
        length,
        file: file.into(),
        line,
    }
}

pub fn local(name: &str, flags: SymbolFlags, register: u32, offset: i64, size: u32, type_id: u32) -> Symbol
{
    Symbol {
        name: name.into(),
        module_base: Address::from(MODULE),
        type_id,
        flags: SymbolFlags::LOCAL | flags,
        address: offset as u64,
        size,
        register,
    }
}

pub fn inline_frame(name: &str, start: u64, line: Option<LineRecord>, locals: Option<Vec<Symbol>>) -> InlineFrameRecord
{
    InlineFrameRecord {
        name: name.into(),
        start: Address::from(MODULE + start),
        line,
        locals,
    }
}

/// Two physical frames, two inline frames at the innermost one, variables everywhere.
///
/// ```text
/// main (0x1000) -> process (0x2000), with helper and clamp inlined into process at 0x2034
/// ```
pub fn sample() -> Snapshot
{
    Fixture::new()
        .function("main", 0x1000, 0x100)
        .function("process", 0x2000, 0x80)
        .line(0x2031, 8, "test.cpp", 71)
        .line(0x1010, 4, "test.cpp", 90)
        .scope(
            0x2000,
            0x80,
            vec![
                local("count", SymbolFlags::REGISTER_RELATIVE, RBP, -0x14, 4, INT),
                Symbol {
                    name: "input".into(),
                    flags: SymbolFlags::PARAMETER | SymbolFlags::REGISTER_RELATIVE,
                    register: RBP,
                    address: 0x10,
                    size: 8,
                    ..Symbol::default()
                },
                local("unused", SymbolFlags::NULL, 0, 0, 0, INT),
            ],
        )
        .scope(
            0x1000,
            0x100,
            vec![
                local("argc", SymbolFlags::FRAME_RELATIVE, 0, 0x10, 4, INT),
                local("n", SymbolFlags::REGISTER, ESI, 0, 4, INT),
            ],
        )
        .inline_site(
            0x2034,
            7,
            vec![
                inline_frame(
                    "helper",
                    0x2030,
                    Some(line_record(0x2030, 8, "test.cpp", 12)),
                    Some(vec![local("c", SymbolFlags::REGISTER_RELATIVE, RSP, 0x8, 1, CHAR)]),
                ),
                inline_frame("clamp", 0x2034, None, None),
            ],
        )
        .chain(&[(0x2034, 0x100), (0x1010, 0x200)])
        .bytes(0xec, &0x2au32.to_le_bytes())
        .bytes(0xe8, b"A")
        .bytes(0x210, &3u32.to_le_bytes())
        .register(X86_64Register::Rsi, 0x11)
        .build()
}
