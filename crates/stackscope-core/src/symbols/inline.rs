//! Expansion of inline frames nested at one physical program counter.

use tracing::trace;

use crate::provider::SymbolProvider;
use crate::types::{Address, InlineFrameCursor};

/// Enumerates the logical frames the compiler merged into a physical frame.
pub struct InlineFrameExpander<'a, P: ?Sized>
{
    provider: &'a P,
}

impl<'a, P: SymbolProvider + ?Sized> InlineFrameExpander<'a, P>
{
    pub fn new(provider: &'a P) -> Self
    {
        Self { provider }
    }

    /// Inline frames at `pc`, innermost first.
    ///
    /// The provider reports the inline depth and the first context id; the
    /// remaining ids are sequential. A depth without a first context (the
    /// provider could not build the inline trace) expands to nothing.
    pub fn expand(&self, pc: Address) -> Vec<InlineFrameCursor>
    {
        let depth = self.provider.inline_frame_count(pc);
        if depth == 0 {
            return Vec::new();
        }
        let Some(first) = self.provider.first_inline_context(pc) else {
            trace!(%pc, depth, "inline depth reported without a starting context");
            return Vec::new();
        };

        (0..depth)
            .map(|ordinal| InlineFrameCursor {
                pc,
                context: first.wrapping_add(ordinal),
                ordinal,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests
{
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{LineInfo, Symbol, SymbolHit, TypeInfo, TypeQuery};

    /// Reports a fixed inline depth and starting context for every address.
    struct Site
    {
        depth: u32,
        first: Option<u32>,
    }

    impl SymbolProvider for Site
    {
        fn symbol_at(&self, _: Address) -> Option<SymbolHit>
        {
            None
        }

        fn line_at(&self, _: Address) -> Option<LineInfo>
        {
            None
        }

        fn inline_symbol_at(&self, _: Address, _: u32) -> Option<SymbolHit>
        {
            None
        }

        fn inline_line_at(&self, _: Address, _: u32) -> Option<LineInfo>
        {
            None
        }

        fn type_info(&self, _: Address, _: u32, _: TypeQuery) -> Option<TypeInfo>
        {
            None
        }

        fn locals_at(&self, _: Address, _: &mut dyn FnMut(&Symbol)) {}

        fn inline_locals_at(&self, _: Address, _: u32, _: &mut dyn FnMut(&Symbol)) -> bool
        {
            false
        }

        fn inline_frame_count(&self, _: Address) -> u32
        {
            self.depth
        }

        fn first_inline_context(&self, _: Address) -> Option<u32>
        {
            self.first
        }
    }

    fn expand(depth: u32, first: Option<u32>) -> Vec<InlineFrameCursor>
    {
        let site = Site { depth, first };
        InlineFrameExpander::new(&site).expand(Address::from(0x1400_2034))
    }

    #[test]
    fn test_no_inline_frames()
    {
        assert!(expand(0, Some(7)).is_empty());
    }

    #[test]
    fn test_depth_without_first_context_expands_to_nothing()
    {
        assert!(expand(3, None).is_empty());
    }

    #[test]
    fn test_contexts_follow_first_context()
    {
        let cursors = expand(3, Some(7));
        let contexts: Vec<u32> = cursors.iter().map(|cursor| cursor.context).collect();
        let ordinals: Vec<u32> = cursors.iter().map(|cursor| cursor.ordinal).collect();
        assert_eq!(contexts, vec![7, 8, 9]);
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert!(cursors.iter().all(|cursor| cursor.pc == Address::from(0x1400_2034)));
    }
}
