//! x86-64 register context and CodeView register-code mapping.

use serde::{Deserialize, Serialize};

use super::Address;

/// x86-64 general-purpose register identifier
///
/// x86-64 has 16 general-purpose registers. The stack pointer (RSP) and base
/// pointer (RBP) live in their own fields of [`RegisterContext`] because every
/// unwind step rewrites them; the remaining fourteen are indexed through this
/// enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum X86_64Register
{
    /// RAX - Accumulator register (often used for return values)
    Rax,
    /// RBX - Base register
    Rbx,
    /// RCX - Counter register, first integer argument on Windows
    Rcx,
    /// RDX - Data register
    Rdx,
    /// RSI - Source index register
    Rsi,
    /// RDI - Destination index register
    Rdi,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl X86_64Register
{
    /// Index of this register in [`RegisterContext::general`]
    ///
    /// - RAX = 0, RBX = 1, RCX = 2, RDX = 3
    /// - RSI = 4, RDI = 5
    /// - R8 = 6 ... R15 = 13
    pub const fn index(self) -> usize
    {
        match self {
            X86_64Register::Rax => 0,
            X86_64Register::Rbx => 1,
            X86_64Register::Rcx => 2,
            X86_64Register::Rdx => 3,
            X86_64Register::Rsi => 4,
            X86_64Register::Rdi => 5,
            X86_64Register::R8 => 6,
            X86_64Register::R9 => 7,
            X86_64Register::R10 => 8,
            X86_64Register::R11 => 9,
            X86_64Register::R12 => 10,
            X86_64Register::R13 => 11,
            X86_64Register::R14 => 12,
            X86_64Register::R15 => 13,
        }
    }
}

/// Register snapshot of one thread, captured once per walk
///
/// The walker seeds the first [`StackFrame`](super::StackFrame) from `pc`, `fp`
/// and `sp`, and the unwind primitive mutates the context in place as it moves
/// toward the caller. A context belongs to exactly one walk.
///
/// ```rust
/// use stackscope_core::types::{Address, RegisterContext, X86_64Register};
///
/// let mut ctx = RegisterContext::new(Address::from(0x1400_1000), Address::from(0x7f00), Address::from(0x7f40));
/// ctx.set(X86_64Register::Rcx, 42);
/// assert_eq!(ctx.get(X86_64Register::Rcx), 42);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterContext
{
    /// Instruction pointer (RIP)
    pub pc: Address,
    /// Stack pointer (RSP)
    pub sp: Address,
    /// Frame/base pointer (RBP)
    pub fp: Address,
    /// RAX, RBX, RCX, RDX, RSI, RDI, R8-R15, in [`X86_64Register::index`] order
    #[serde(default)]
    pub general: [u64; 14],
    /// RFLAGS
    #[serde(default)]
    pub flags: u64,
}

impl RegisterContext
{
    /// Build a context from the three canonical calling-convention registers.
    pub fn new(pc: Address, sp: Address, fp: Address) -> Self
    {
        Self {
            pc,
            sp,
            fp,
            ..Self::default()
        }
    }

    /// Read a general-purpose register.
    pub fn get(&self, register: X86_64Register) -> u64
    {
        self.general[register.index()]
    }

    /// Write a general-purpose register.
    pub fn set(&mut self, register: X86_64Register, value: u64)
    {
        self.general[register.index()] = value;
    }

    /// Map a CodeView AMD64 register code onto this context.
    ///
    /// Returns `None` for codes that are not integer registers; callers render a
    /// placeholder naming the raw code in that case.
    ///
    /// ```rust
    /// use stackscope_core::types::{Address, RegisterContext};
    ///
    /// let ctx = RegisterContext::new(Address::ZERO, Address::from(0x1234_5678_9abc), Address::ZERO);
    /// let esp = ctx.describe(21).unwrap();
    /// assert_eq!(esp.name, "esp");
    /// assert_eq!(esp.value, 0x5678_9abc);
    /// assert!(ctx.describe(0xffff).is_none());
    /// ```
    pub fn describe(&self, code: u32) -> Option<RegisterDescriptor>
    {
        let view = codeview_register(code)?;
        let raw = match view.source {
            RegisterSource::General(register) => self.get(register),
            RegisterSource::StackPointer => self.sp.value(),
            RegisterSource::FramePointer => self.fp.value(),
        };
        Some(RegisterDescriptor {
            name: view.name,
            value: raw & view.width.mask(),
        })
    }
}

/// A register resolved against a live context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor
{
    /// Assembler name of the view (`eax`, `r10w`, ...)
    pub name: &'static str,
    /// Current value, masked to the width of the view
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterSource
{
    General(X86_64Register),
    StackPointer,
    FramePointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width
{
    Byte,
    Word,
    Dword,
    Qword,
}

impl Width
{
    const fn mask(self) -> u64
    {
        match self {
            Width::Byte => 0xff,
            Width::Word => 0xffff,
            Width::Dword => 0xffff_ffff,
            Width::Qword => u64::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RegisterView
{
    name: &'static str,
    source: RegisterSource,
    width: Width,
}

const fn view(name: &'static str, source: RegisterSource, width: Width) -> Option<RegisterView>
{
    Some(RegisterView { name, source, width })
}

/// CodeView `CV_AMD64_*` register numbering, as emitted in PDB symbol records.
fn codeview_register(code: u32) -> Option<RegisterView>
{
    use RegisterSource::{FramePointer as Fp, General as G, StackPointer as Sp};
    use Width::{Byte, Dword, Qword, Word};
    use X86_64Register as R;

    const EXTENDED: [X86_64Register; 8] = [R::R8, R::R9, R::R10, R::R11, R::R12, R::R13, R::R14, R::R15];
    const NAMES_B: [&str; 8] = ["r8b", "r9b", "r10b", "r11b", "r12b", "r13b", "r14b", "r15b"];
    const NAMES_W: [&str; 8] = ["r8w", "r9w", "r10w", "r11w", "r12w", "r13w", "r14w", "r15w"];
    const NAMES_D: [&str; 8] = ["r8d", "r9d", "r10d", "r11d", "r12d", "r13d", "r14d", "r15d"];
    const NAMES_Q: [&str; 8] = ["r8", "r9", "r10", "r11", "r12", "r13", "r14", "r15"];

    match code {
        1 => view("al", G(R::Rax), Byte),
        2 => view("cl", G(R::Rcx), Byte),
        3 => view("dl", G(R::Rdx), Byte),
        4 => view("bl", G(R::Rbx), Byte),

        9 => view("ax", G(R::Rax), Word),
        10 => view("cx", G(R::Rcx), Word),
        11 => view("dx", G(R::Rdx), Word),
        12 => view("bx", G(R::Rbx), Word),
        13 => view("sp", Sp, Word),
        14 => view("bp", Fp, Word),
        15 => view("si", G(R::Rsi), Word),
        16 => view("di", G(R::Rdi), Word),

        17 => view("eax", G(R::Rax), Dword),
        18 => view("ecx", G(R::Rcx), Dword),
        19 => view("edx", G(R::Rdx), Dword),
        20 => view("ebx", G(R::Rbx), Dword),
        21 => view("esp", Sp, Dword),
        22 => view("ebp", Fp, Dword),
        23 => view("esi", G(R::Rsi), Dword),
        24 => view("edi", G(R::Rdi), Dword),

        324 => view("sil", G(R::Rsi), Byte),
        325 => view("dil", G(R::Rdi), Byte),
        326 => view("bpl", Fp, Byte),
        327 => view("spl", Sp, Byte),

        328 => view("rax", G(R::Rax), Qword),
        329 => view("rbx", G(R::Rbx), Qword),
        330 => view("rcx", G(R::Rcx), Qword),
        331 => view("rdx", G(R::Rdx), Qword),
        332 => view("rsi", G(R::Rsi), Qword),
        333 => view("rdi", G(R::Rdi), Qword),
        334 => view("rbp", Fp, Qword),
        335 => view("rsp", Sp, Qword),

        336..=343 => {
            let i = (code - 336) as usize;
            view(NAMES_Q[i], G(EXTENDED[i]), Qword)
        }
        344..=351 => {
            let i = (code - 344) as usize;
            view(NAMES_B[i], G(EXTENDED[i]), Byte)
        }
        352..=359 => {
            let i = (code - 352) as usize;
            view(NAMES_W[i], G(EXTENDED[i]), Word)
        }
        360..=367 => {
            let i = (code - 360) as usize;
            view(NAMES_D[i], G(EXTENDED[i]), Dword)
        }
        _ => None,
    }
}
