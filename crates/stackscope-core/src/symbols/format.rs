//! Address → `0xADDR symbol + off   file(line) + N bytes`.

use std::fmt::Write;

use crate::provider::SymbolProvider;
use crate::types::{Address, LineInfo, SymbolHit, SymbolName};

/// Renders addresses against the current state of a [`SymbolProvider`].
///
/// Formatting is a pure function of the provider's state: the same address
/// always renders the same string. Each segment after the raw address is
/// optional and silently dropped when the provider has nothing for it.
pub struct AddressFormatter<'a, P: ?Sized>
{
    provider: &'a P,
}

impl<'a, P: SymbolProvider + ?Sized> AddressFormatter<'a, P>
{
    pub fn new(provider: &'a P) -> Self
    {
        Self { provider }
    }

    /// Format a physical frame address.
    ///
    /// ```text
    /// 0x00007FF6A1B21234 process + 52   c:\src\test.cpp(71) + 3 bytes
    /// ```
    pub fn format(&self, address: Address) -> String
    {
        render(address, self.provider.symbol_at(address), self.provider.line_at(address))
    }

    /// Format an address inside inline frame `context`.
    pub fn format_inline(&self, address: Address, context: u32) -> String
    {
        render(
            address,
            self.provider.inline_symbol_at(address, context),
            self.provider.inline_line_at(address, context),
        )
    }
}

fn render(address: Address, symbol: Option<SymbolHit>, line: Option<LineInfo>) -> String
{
    let mut out = address.to_string();

    if let Some(hit) = symbol {
        let _ = write!(out, " {}", SymbolName::new(hit.symbol.name));
        // The displacement is stored unsigned; a huge value is a negative one.
        let displacement = hit.displacement as i64;
        if displacement < 0 {
            let _ = write!(out, " - {}", displacement.unsigned_abs());
        } else if displacement > 0 {
            let _ = write!(out, " + {displacement}");
        }
    }

    if let Some(line) = line {
        let _ = write!(out, "   {}({})", line.file, line.line);
        if line.displacement != 0 {
            let plural = if line.displacement == 1 { "" } else { "s" };
            let _ = write!(out, " + {} byte{plural}", line.displacement);
        }
    }

    out
}
