//! Type-graph node tags and queries.
//!
//! A module's type graph lives in the symbol provider and is addressed by
//! `(module base, type id)`. The engine never materialises it; it asks one
//! question at a time through [`TypeQuery`].

/// Kind of a type-graph node, numbered as PDB `SymTagEnum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag
{
    /// Function symbol wrapper; transparent to declarators.
    Function,
    /// Data symbol wrapper; transparent to declarators.
    Data,
    /// Struct, class or union.
    UserDefined,
    FunctionType,
    Pointer,
    Array,
    BaseType,
    BaseClass,
    /// Any other tag (enums, typedefs, ...), kept with its raw code.
    Other(u32),
}

impl TypeTag
{
    /// Decode a raw `SymTagEnum` value.
    pub const fn from_code(code: u32) -> Self
    {
        match code {
            5 => TypeTag::Function,
            7 => TypeTag::Data,
            11 => TypeTag::UserDefined,
            13 => TypeTag::FunctionType,
            14 => TypeTag::Pointer,
            15 => TypeTag::Array,
            16 => TypeTag::BaseType,
            18 => TypeTag::BaseClass,
            other => TypeTag::Other(other),
        }
    }

    /// The raw `SymTagEnum` value.
    pub const fn code(self) -> u32
    {
        match self {
            TypeTag::Function => 5,
            TypeTag::Data => 7,
            TypeTag::UserDefined => 11,
            TypeTag::FunctionType => 13,
            TypeTag::Pointer => 14,
            TypeTag::Array => 15,
            TypeTag::BaseType => 16,
            TypeTag::BaseClass => 18,
            TypeTag::Other(code) => code,
        }
    }
}

/// One question about a type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeQuery
{
    Tag,
    Name,
    /// Raw `BasicType` code of a base type.
    BaseType,
    /// Size in bytes.
    Length,
    /// Element count of an array.
    Count,
    /// The `→child` edge: pointee, element, return or underlying type.
    ChildType,
}

/// Answer to a [`TypeQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo
{
    Tag(TypeTag),
    Name(String),
    BaseType(u32),
    Length(u64),
    Count(u32),
    ChildType(u32),
}

/// `BasicType` codes used by the base-type name table.
pub mod base_type
{
    pub const NO_TYPE: u32 = 0;
    pub const VOID: u32 = 1;
    pub const CHAR: u32 = 2;
    pub const WCHAR: u32 = 3;
    pub const INT: u32 = 6;
    pub const UINT: u32 = 7;
    pub const FLOAT: u32 = 8;
    pub const BCD: u32 = 9;
    pub const BOOL: u32 = 10;
    pub const LONG: u32 = 13;
    pub const ULONG: u32 = 14;
    pub const CURRENCY: u32 = 25;
    pub const HRESULT: u32 = 31;
    pub const CHAR16: u32 = 32;
    pub const CHAR32: u32 = 33;
    pub const CHAR8: u32 = 34;
}
