//! # Symbols
//!
//! Everything that turns provider answers into text:
//!
//! - [`AddressFormatter`]: one address, with symbol, displacement and line
//! - [`InlineFrameExpander`]: logical frames hidden inside a physical one
//! - [`TypeDecorator`]: C declarator strings from the type graph

pub mod decorate;
pub mod format;
pub mod inline;

pub use decorate::{base_type_name, TypeDecorator, MAX_TYPE_DEPTH};
pub use format::AddressFormatter;
pub use inline::InlineFrameExpander;
