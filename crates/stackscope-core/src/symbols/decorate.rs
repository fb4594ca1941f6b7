//! C-style declarator reconstruction from a provider's type graph.
//!
//! The decorator starts from a bare variable name and walks the `→child` edges
//! of its type, wrapping the name one step at a time: pointers prepend `*`,
//! arrays and function types append a suffix (parenthesising a leading `*` first
//! so the suffix binds to the pointee), base and user-defined types prepend
//! their spelling and stop. The result reads like the declaration in source:
//!
//! ```text
//! Pointer → Array[4] → int      x   =>  int (*x)[4]
//! Pointer → FunctionType → void f   =>  void (*f)()
//! Array[3] → Pointer → char     p   =>  char *p[3]
//! ```

use tracing::trace;

use crate::provider::SymbolProvider;
use crate::types::type_graph::base_type;
use crate::types::{Address, TypeInfo, TypeQuery, TypeTag};

/// Recursion bound for the type walk. Symbol formats do not produce cycles,
/// but a corrupt database must not overflow the stack.
pub const MAX_TYPE_DEPTH: usize = 64;

/// Builds declarator strings by querying a [`SymbolProvider`].
pub struct TypeDecorator<'a, P: ?Sized>
{
    provider: &'a P,
}

impl<'a, P: SymbolProvider + ?Sized> TypeDecorator<'a, P>
{
    pub fn new(provider: &'a P) -> Self
    {
        Self { provider }
    }

    /// Return `name` decorated with the type `(module_base, type_id)`.
    pub fn declare(&self, name: &str, module_base: Address, type_id: u32) -> String
    {
        let mut declarator = name.to_owned();
        self.decorate(&mut declarator, module_base, type_id);
        declarator
    }

    /// Decorate `name` in place with the type `(module_base, type_id)`.
    pub fn decorate(&self, name: &mut String, module_base: Address, type_id: u32)
    {
        self.decorate_at(name, module_base, type_id, 0);
    }

    fn decorate_at(&self, name: &mut String, module_base: Address, type_id: u32, depth: usize)
    {
        if depth >= MAX_TYPE_DEPTH {
            trace!(type_id, "type graph deeper than {MAX_TYPE_DEPTH}, stopping");
            return;
        }

        let tag = match self.query(module_base, type_id, TypeQuery::Tag) {
            Some(TypeInfo::Tag(tag)) => tag,
            _ => TypeTag::Other(0),
        };

        let recurse = match tag {
            TypeTag::UserDefined => {
                if let Some(TypeInfo::Name(type_name)) = self.query(module_base, type_id, TypeQuery::Name) {
                    name.insert(0, ' ');
                    name.insert_str(0, &type_name);
                }
                false
            }
            TypeTag::BaseType => {
                let code = match self.query(module_base, type_id, TypeQuery::BaseType) {
                    Some(TypeInfo::BaseType(code)) => code,
                    _ => 0,
                };
                let length = match self.query(module_base, type_id, TypeQuery::Length) {
                    Some(TypeInfo::Length(length)) => length,
                    _ => 0,
                };
                name.insert(0, ' ');
                name.insert_str(0, &base_type_name(code, length));
                false
            }
            TypeTag::Pointer => {
                name.insert(0, '*');
                true
            }
            TypeTag::FunctionType => {
                parenthesize_pointer(name);
                name.push_str("()");
                true
            }
            TypeTag::Array => {
                parenthesize_pointer(name);
                let count = match self.query(module_base, type_id, TypeQuery::Count) {
                    Some(TypeInfo::Count(count)) => count,
                    _ => 0,
                };
                name.push('[');
                if count != 0 {
                    name.push_str(&count.to_string());
                }
                name.push(']');
                true
            }
            TypeTag::Function | TypeTag::Data => true,
            TypeTag::BaseClass => false,
            TypeTag::Other(code) => {
                name.insert_str(0, &format!("tag: {code} "));
                false
            }
        };

        if recurse {
            if let Some(TypeInfo::ChildType(child)) = self.query(module_base, type_id, TypeQuery::ChildType) {
                self.decorate_at(name, module_base, child, depth + 1);
            }
        }
    }

    fn query(&self, module_base: Address, type_id: u32, query: TypeQuery) -> Option<TypeInfo>
    {
        self.provider.type_info(module_base, type_id, query)
    }
}

/// `*x` becomes `(*x)` so that a following `[N]` or `()` applies to the pointee.
fn parenthesize_pointer(name: &mut String)
{
    if name.starts_with('*') {
        name.insert(0, '(');
        name.push(')');
    }
}

/// Spelling of a `(BasicType code, byte length)` pair.
///
/// Pairs outside the table produce `pdb type: <code>/<length>` so the raw
/// values show up in the output instead of a failure.
pub fn base_type_name(code: u32, length: u64) -> String
{
    const TABLE: &[(u32, u64, &str)] = &[
        (base_type::NO_TYPE, 0, "(null)"),
        (base_type::VOID, 0, "void"),
        (base_type::CHAR, 1, "char"),
        (base_type::WCHAR, 2, "wchar_t"),
        (base_type::INT, 1, "signed char"),
        (base_type::INT, 2, "short"),
        (base_type::INT, 4, "int"),
        (base_type::INT, 8, "__int64"),
        (base_type::UINT, 1, "unsigned char"),
        (base_type::UINT, 2, "unsigned short"),
        (base_type::UINT, 4, "unsigned int"),
        (base_type::UINT, 8, "unsigned __int64"),
        (base_type::FLOAT, 4, "float"),
        (base_type::FLOAT, 8, "double"),
        (base_type::FLOAT, 10, "long double"),
        (base_type::BOOL, 1, "bool"),
        (base_type::LONG, 4, "long"),
        (base_type::ULONG, 4, "unsigned long"),
        (base_type::HRESULT, 4, "HRESULT"),
        (base_type::CHAR8, 1, "char8_t"),
        (base_type::CHAR16, 2, "char16_t"),
        (base_type::CHAR32, 4, "char32_t"),
    ];

    TABLE
        .iter()
        .find(|(c, l, _)| *c == code && *l == length)
        .map_or_else(|| format!("pdb type: {code}/{length}"), |(_, _, name)| (*name).to_owned())
}
