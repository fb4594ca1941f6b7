//! # Local Variable Renderer
//!
//! Prints the variables in lexical scope at one frame, one line each:
//!
//! ```text
//!   int count [rbp-14] = 0x2a
//!   double ratio [frame+8] = 0.5
//!   char *text (rsi) = 0x7ff6a1b24010
//!   Source src Flags: 180
//! ```
//!
//! How much of each line is produced is controlled by [`RenderOptions`],
//! usually built from a [`Detail`] level. Every read of target memory is best
//! effort: a failed read drops the ` = value` segment of that one variable and
//! rendering carries on.

use std::fmt::{self, Write as _};
use std::io::Write;
use std::str::FromStr;

use tracing::debug;

use crate::error::Result;
use crate::provider::{MemoryReader, SymbolProvider};
use crate::symbols::TypeDecorator;
use crate::types::{Address, FrameKind, InlineFrameCursor, RegisterContext, StackFrame, Symbol, SymbolFlags};

/// Verbosity of variable rendering, from nothing to everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Detail
{
    /// Frames only, no variables.
    StackOnly,
    /// Bare variable names.
    Names,
    /// Names decorated with their declared type.
    NamesAndTypes,
    /// Adds the location and value of variables that live in memory.
    Unoptimised,
    /// Adds register-held values and the raw flags of anything else.
    ///
    /// Unwinding recovers only pc, sp and fp. In caller frames every other
    /// register still holds the innermost frame's value, so register-held
    /// variables there (and `[reg+off]` bases other than the stack and frame
    /// pointers) can be stale.
    #[default]
    Full,
}

impl Detail
{
    pub const ALL: [Detail; 5] = [
        Detail::StackOnly,
        Detail::Names,
        Detail::NamesAndTypes,
        Detail::Unoptimised,
        Detail::Full,
    ];

    pub const fn as_str(self) -> &'static str
    {
        match self {
            Detail::StackOnly => "stack-only",
            Detail::Names => "names",
            Detail::NamesAndTypes => "names-and-types",
            Detail::Unoptimised => "unoptimised",
            Detail::Full => "full",
        }
    }
}

impl fmt::Display for Detail
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for Detail
{
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err>
    {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        match wanted.as_str() {
            "unoptimized" => Ok(Detail::Unoptimised),
            other => Detail::ALL
                .into_iter()
                .find(|detail| detail.as_str() == other)
                .ok_or_else(|| {
                    let known: Vec<_> = Detail::ALL.iter().map(|detail| detail.as_str()).collect();
                    format!("unknown detail level '{s}' (expected one of: {})", known.join(", "))
                }),
        }
    }
}

/// Which parts of a variable line to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions
{
    pub include_names: bool,
    pub include_types: bool,
    pub include_register_relative: bool,
    pub include_register_only: bool,
}

impl From<Detail> for RenderOptions
{
    fn from(detail: Detail) -> Self
    {
        let rank = detail as u8;
        Self {
            include_names: rank >= Detail::Names as u8,
            include_types: rank >= Detail::NamesAndTypes as u8,
            include_register_relative: rank >= Detail::Unoptimised as u8,
            include_register_only: rank >= Detail::Full as u8,
        }
    }
}

impl Default for RenderOptions
{
    fn default() -> Self
    {
        Detail::default().into()
    }
}

/// Where a variable's value is found.
enum Location
{
    /// `base + offset` in target memory; `base` is a register or the frame base.
    Relative
    {
        base: Option<(&'static str, u64)>,
    },
    Register,
    Unknown,
}

fn classify(symbol: &Symbol, frame: &StackFrame, context: &RegisterContext) -> Location
{
    if symbol.flags.contains(SymbolFlags::REGISTER_RELATIVE) {
        let base = context.describe(symbol.register).map(|reg| (reg.name, reg.value));
        Location::Relative { base }
    } else if symbol.flags.contains(SymbolFlags::FRAME_RELATIVE) {
        Location::Relative {
            base: Some(("frame", frame.fp.value())),
        }
    } else if symbol.flags.contains(SymbolFlags::REGISTER) {
        Location::Register
    } else {
        Location::Unknown
    }
}

/// Renders the variables of physical and inline frames.
pub struct LocalRenderer<'a, P: ?Sized, M: ?Sized>
{
    provider: &'a P,
    memory: &'a M,
    options: RenderOptions,
}

impl<'a, P, M> LocalRenderer<'a, P, M>
where
    P: SymbolProvider + ?Sized,
    M: MemoryReader + ?Sized,
{
    pub fn new(provider: &'a P, memory: &'a M, options: RenderOptions) -> Self
    {
        Self {
            provider,
            memory,
            options,
        }
    }

    /// Write the variables in scope at a physical frame; returns how many lines were written.
    pub fn render_frame(&self, frame: &StackFrame, context: &RegisterContext, sink: &mut dyn Write) -> Result<usize>
    {
        self.render_scope(frame.pc, FrameKind::Physical, frame, context, sink)
    }

    /// Write the variables in scope at an inline frame.
    ///
    /// A scope the provider cannot enter renders nothing.
    pub fn render_inline(
        &self,
        cursor: &InlineFrameCursor,
        frame: &StackFrame,
        context: &RegisterContext,
        sink: &mut dyn Write,
    ) -> Result<usize>
    {
        let kind = FrameKind::Inline {
            context: cursor.context,
        };
        self.render_scope(cursor.pc, kind, frame, context, sink)
    }

    fn render_scope(
        &self,
        pc: Address,
        kind: FrameKind,
        frame: &StackFrame,
        context: &RegisterContext,
        sink: &mut dyn Write,
    ) -> Result<usize>
    {
        if !self.options.include_names {
            return Ok(0);
        }
        let mut lines = Vec::new();
        let mut visit = |symbol: &Symbol| lines.extend(self.render_symbol(symbol, frame, context));
        match kind {
            FrameKind::Physical => self.provider.locals_at(pc, &mut visit),
            FrameKind::Inline { context: inline } => {
                if !self.provider.inline_locals_at(pc, inline, &mut visit) {
                    debug!(%pc, context = inline, "inline scope unavailable");
                }
            }
        }
        write_lines(sink, &lines)
    }

    /// Render one variable line, or `None` if the symbol is not shown.
    pub fn render_symbol(&self, symbol: &Symbol, frame: &StackFrame, context: &RegisterContext) -> Option<String>
    {
        if !self.options.include_names || !symbol.is_local() || symbol.is_null() {
            return None;
        }

        let name = if self.options.include_types {
            TypeDecorator::new(self.provider).declare(&symbol.name, symbol.module_base, symbol.type_id)
        } else {
            symbol.name.clone()
        };
        let mut line = format!("  {name}");

        match classify(symbol, frame, context) {
            Location::Relative { base } if self.options.include_register_relative => match base {
                None => {
                    let _ = write!(line, " [register '{}']", symbol.register);
                }
                Some((register, value)) => {
                    let offset = symbol.address as i64;
                    if offset < 0 {
                        let _ = write!(line, " [{register}-{:x}]", offset.unsigned_abs());
                    } else {
                        let _ = write!(line, " [{register}+{offset:x}]");
                    }
                    let address = Address::from(value).offset(offset);
                    if let Some(text) = self.read_value(address, symbol.size, &name) {
                        let _ = write!(line, " = {text}");
                    }
                }
            },
            Location::Register if self.options.include_register_only => match context.describe(symbol.register) {
                Some(register) => {
                    let _ = write!(line, " ({}) = 0x{:x}", register.name, register.value);
                }
                None => {
                    let _ = write!(line, " (register '{}')", symbol.register);
                }
            },
            Location::Unknown if self.options.include_register_only => {
                let _ = write!(line, " Flags: {:x}", symbol.flags.bits());
            }
            _ => {}
        }

        Some(line)
    }

    /// Read and format a value by size; `None` for unsupported sizes or failed reads.
    fn read_value(&self, address: Address, size: u32, declared: &str) -> Option<String>
    {
        let width = match size {
            1 | 2 | 4 | 8 => size as usize,
            0 => 8,
            _ => return None,
        };

        let mut buffer = [0u8; 8];
        if let Err(err) = self.memory.read(address, &mut buffer[..width]) {
            debug!("value unavailable: {err}");
            return None;
        }
        let word = u64::from_le_bytes(buffer);

        Some(match size {
            1 => {
                let byte = buffer[0];
                if (0x20..=0x7e).contains(&byte) {
                    format!("'{}'", byte as char)
                } else {
                    byte.to_string()
                }
            }
            2 => (word as u16).to_string(),
            4 => format!("0x{:x}", word as u32),
            8 if declared.starts_with("double") => format_double(f64::from_bits(word)),
            _ => format!("0x{:x}", word as i64),
        })
    }
}

/// Format like C's `%g`: six significant digits, trailing zeros dropped,
/// exponent form outside `[1e-4, 1e6)`.
fn format_double(value: f64) -> String
{
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.into();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.into();
    }

    let scientific = format!("{value:.5e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..6).contains(&exponent) {
        let fixed = format!("{value:.*}", (5 - exponent) as usize);
        trim_fraction(&fixed).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    }
}

fn trim_fraction(digits: &str) -> &str
{
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

fn write_lines(sink: &mut dyn Write, lines: &[String]) -> Result<usize>
{
    for line in lines {
        writeln!(sink, "{line}")?;
    }
    Ok(lines.len())
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::snapshot::{MemoryBlock, Snapshot, TypeRecord};
    use crate::types::type_graph::base_type;
    use crate::types::X86_64Register;

    const STACK: u64 = 0x7ff0_0000;

    fn snapshot() -> Snapshot
    {
        let mut bytes = vec![0u8; 0x1000];
        bytes[0x10..0x14].copy_from_slice(&0x2au32.to_le_bytes());
        bytes[0x20] = b'A';
        bytes[0x21] = 7;
        bytes[0x22..0x24].copy_from_slice(&1234u16.to_le_bytes());
        bytes[0x28..0x30].copy_from_slice(&0.5f64.to_le_bytes());
        bytes[0x30..0x38].copy_from_slice(&(-2i64).to_le_bytes());
        Snapshot {
            types: vec![
                TypeRecord {
                    id: 1,
                    tag: Some(16),
                    base_type: Some(base_type::INT),
                    length: Some(4),
                    ..TypeRecord::default()
                },
                TypeRecord {
                    id: 2,
                    tag: Some(16),
                    base_type: Some(base_type::FLOAT),
                    length: Some(8),
                    ..TypeRecord::default()
                },
            ],
            memory: vec![MemoryBlock {
                address: Address::from(STACK),
                bytes,
            }],
            ..Snapshot::default()
        }
    }

    fn frame() -> StackFrame
    {
        StackFrame {
            pc: Address::from(0x1400_1000),
            fp: Address::from(STACK + 0x20),
            sp: Address::from(STACK),
            cfa: Address::from(STACK + 0x30),
        }
    }

    fn context() -> RegisterContext
    {
        let mut ctx = RegisterContext::new(Address::from(0x1400_1000), Address::from(STACK), Address::from(STACK + 0x20));
        ctx.set(X86_64Register::Rsi, 0x7ff6_a1b2_4010);
        ctx
    }

    fn local(name: &str, flags: SymbolFlags, register: u32, offset: i64, size: u32, type_id: u32) -> Symbol
    {
        Symbol {
            name: name.into(),
            type_id,
            flags: SymbolFlags::LOCAL | flags,
            address: offset as u64,
            size,
            register,
            ..Symbol::default()
        }
    }

    fn render(symbol: &Symbol, detail: Detail) -> Option<String>
    {
        let snapshot = snapshot();
        LocalRenderer::new(&snapshot, &snapshot, detail.into()).render_symbol(symbol, &frame(), &context())
    }

    const RSP: u32 = 335;
    const RBP: u32 = 334;
    const ESI: u32 = 23;

    #[test]
    fn test_register_relative_int()
    {
        let symbol = local("count", SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int count [rsp+10] = 0x2a");
    }

    #[test]
    fn test_negative_offset_from_frame_base()
    {
        let symbol = local("count", SymbolFlags::FRAME_RELATIVE, 0, -0x10, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int count [frame-10] = 0x2a");
    }

    #[test]
    fn test_rbp_relative_uses_frame_pointer_register()
    {
        let symbol = local("count", SymbolFlags::REGISTER_RELATIVE, RBP, -0x10, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int count [rbp-10] = 0x2a");
    }

    // The value width follows the symbol's size, not its declared type.
    #[test_case(0x20, 1, "  int c [rsp+20] = 'A'" ; "printable char")]
    #[test_case(0x21, 1, "  int c [rsp+21] = 7" ; "unprintable char")]
    #[test_case(0x22, 2, "  int c [rsp+22] = 1234" ; "short")]
    #[test_case(0x30, 8, "  int c [rsp+30] = 0xfffffffffffffffe" ; "qword")]
    #[test_case(0x30, 0, "  int c [rsp+30] = 0xfffffffffffffffe" ; "unknown size reads a qword")]
    #[test_case(0x30, 3, "  int c [rsp+30]" ; "odd size has no value")]
    fn test_value_by_size(offset: i64, size: u32, expected: &str)
    {
        let symbol = local("c", SymbolFlags::REGISTER_RELATIVE, RSP, offset, size, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), expected);
    }

    #[test_case(0.5, "0.5" ; "fraction")]
    #[test_case(1.0 / 3.0, "0.333333" ; "six significant digits")]
    #[test_case(-2.5, "-2.5" ; "negative")]
    #[test_case(100000.0, "100000" ; "largest fixed")]
    #[test_case(1234567.0, "1.23457e+06" ; "large uses exponent")]
    #[test_case(999999.7, "1e+06" ; "rounding carries into exponent")]
    #[test_case(0.0001, "0.0001" ; "smallest fixed")]
    #[test_case(0.00001234, "1.234e-05" ; "small uses exponent")]
    #[test_case(0.0, "0" ; "zero")]
    #[test_case(f64::INFINITY, "inf" ; "infinity")]
    fn test_format_double(value: f64, expected: &str)
    {
        assert_eq!(format_double(value), expected);
    }

    #[test]
    fn test_missing_type_record_shows_tag_zero()
    {
        let symbol = local("m", SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 99);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  tag: 0 m [rsp+10] = 0x2a");
        assert_eq!(render(&symbol, Detail::Names).unwrap(), "  m");
    }

    #[test]
    fn test_double_by_declared_name()
    {
        let symbol = local("ratio", SymbolFlags::REGISTER_RELATIVE, RSP, 0x28, 8, 2);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  double ratio [rsp+28] = 0.5");
    }

    #[test]
    fn test_failed_read_omits_value()
    {
        let symbol = local("gone", SymbolFlags::REGISTER_RELATIVE, RSP, 0x2000, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int gone [rsp+2000]");
    }

    #[test]
    fn test_unknown_registers()
    {
        let relative = local("a", SymbolFlags::REGISTER_RELATIVE, 9999, 8, 4, 1);
        let held = local("b", SymbolFlags::REGISTER, 9999, 0, 4, 1);
        assert_eq!(render(&relative, Detail::Full).unwrap(), "  int a [register '9999']");
        assert_eq!(render(&held, Detail::Full).unwrap(), "  int b (register '9999')");
    }

    #[test]
    fn test_register_held_value()
    {
        let symbol = local("n", SymbolFlags::REGISTER, ESI, 0, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int n (esi) = 0xa1b24010");
    }

    #[test]
    fn test_unlocated_prints_flags()
    {
        let symbol = local("k", SymbolFlags::CONSTANT, 0, 0, 4, 1);
        assert_eq!(render(&symbol, Detail::Full).unwrap(), "  int k Flags: 180");
    }

    #[test]
    fn test_non_local_and_null_are_skipped()
    {
        let mut global = local("g", SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 1);
        global.flags.remove(SymbolFlags::LOCAL);
        let placeholder = local("p", SymbolFlags::NULL | SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 1);
        assert_eq!(render(&global, Detail::Full), None);
        assert_eq!(render(&placeholder, Detail::Full), None);
    }

    #[test_case(Detail::StackOnly, None)]
    #[test_case(Detail::Names, Some("  count"))]
    #[test_case(Detail::NamesAndTypes, Some("  int count"))]
    #[test_case(Detail::Unoptimised, Some("  int count [rsp+10] = 0x2a"))]
    #[test_case(Detail::Full, Some("  int count [rsp+10] = 0x2a"))]
    fn test_detail_levels_memory_variable(detail: Detail, expected: Option<&str>)
    {
        let symbol = local("count", SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 1);
        assert_eq!(render(&symbol, detail).as_deref(), expected);
    }

    #[test]
    fn test_unoptimised_leaves_register_variables_bare()
    {
        let symbol = local("n", SymbolFlags::REGISTER, ESI, 0, 4, 1);
        assert_eq!(render(&symbol, Detail::Unoptimised).unwrap(), "  int n");
    }

    #[test]
    fn test_detail_parsing()
    {
        assert_eq!("Names_And_Types".parse::<Detail>(), Ok(Detail::NamesAndTypes));
        assert_eq!("unoptimized".parse::<Detail>(), Ok(Detail::Unoptimised));
        assert!("verbose".parse::<Detail>().unwrap_err().contains("stack-only"));
        for detail in Detail::ALL {
            assert_eq!(detail.to_string().parse::<Detail>(), Ok(detail));
        }
    }

    #[test]
    fn test_render_frame_counts_lines()
    {
        let mut snapshot = snapshot();
        snapshot.scopes.push(crate::snapshot::ScopeRecord {
            begin: Address::from(0x1400_0f00),
            end: Address::from(0x1400_1100),
            locals: vec![
                local("count", SymbolFlags::REGISTER_RELATIVE, RSP, 0x10, 4, 1),
                Symbol {
                    name: "global".into(),
                    ..Symbol::default()
                },
            ],
        });
        let renderer = LocalRenderer::new(&snapshot, &snapshot, Detail::Full.into());
        let mut out = Vec::new();
        assert_eq!(renderer.render_frame(&frame(), &context(), &mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "  int count [rsp+10] = 0x2a\n");
    }

    #[test]
    fn test_render_inline_uses_inline_scope()
    {
        let mut snapshot = snapshot();
        snapshot.inline_sites.push(crate::snapshot::InlineSite {
            address: Address::from(0x1400_1000),
            first_context: 3,
            frames: vec![
                crate::snapshot::InlineFrameRecord {
                    name: "helper".into(),
                    start: Address::from(0x1400_0ff0),
                    line: None,
                    locals: Some(vec![local("c", SymbolFlags::REGISTER_RELATIVE, RSP, 0x20, 1, 1)]),
                },
                crate::snapshot::InlineFrameRecord {
                    name: "clamp".into(),
                    start: Address::from(0x1400_1000),
                    line: None,
                    locals: None,
                },
            ],
        });
        let renderer = LocalRenderer::new(&snapshot, &snapshot, Detail::Full.into());
        let cursor = |context| InlineFrameCursor {
            pc: Address::from(0x1400_1000),
            context,
            ordinal: context - 3,
        };

        let mut out = Vec::new();
        assert_eq!(renderer.render_inline(&cursor(3), &frame(), &context(), &mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "  int c [rsp+20] = 'A'\n");

        // No scope for the second inline frame: nothing is written.
        let mut out = Vec::new();
        assert_eq!(renderer.render_inline(&cursor(4), &frame(), &context(), &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }
}
