//! Target address type.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Strongly typed address in the *target* process
///
/// This wrapper around `u64` keeps addresses in the debugged process apart from
/// sizes, offsets and values read out of that process. Nothing here is ever
/// dereferenced locally.
///
/// ## Display
///
/// Addresses render the way the trace prints them: `0x` followed by sixteen
/// uppercase hex digits.
///
/// ```rust
/// use stackscope_core::types::Address;
///
/// let addr = Address::from(0x7ff6_1234_0000);
/// assert_eq!(addr.to_string(), "0x00007FF612340000");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// A frame whose program counter is null ends the walk.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// ```rust
    /// use stackscope_core::types::Address;
    ///
    /// const STACK_TOP: Address = Address::new(0x7fff00000000);
    /// assert_eq!(STACK_TOP.value(), 0x7fff00000000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Returns `true` for the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use stackscope_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Apply a signed displacement, wrapping like the target's own pointer arithmetic
    ///
    /// ```rust
    /// use stackscope_core::types::Address;
    ///
    /// let frame = Address::from(0x1000);
    /// assert_eq!(frame.offset(-8), Address::from(0xff8));
    /// assert_eq!(frame.offset(0x10), Address::from(0x1010));
    /// ```
    pub fn offset(self, displacement: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(displacement))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
