//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::codec::{format_hex, parse_hex};
use crate::error::StackmarkError;

/// Strongly typed absolute virtual-memory address
///
/// A raw return address (or image base) is only meaningful inside the process
/// that captured it, under the address-space layout that was live at capture
/// time. This wrapper keeps such values from mixing with sizes and slides.
///
/// `Display` and `FromStr` go through the [`codec`](crate::codec) so the text
/// form is always the canonical `0x`-prefixed lowercase hex.
///
/// ## Example
///
/// ```rust
/// use stackmark_core::types::Address;
///
/// let addr = Address::new(0x1000);
/// let next_addr = addr + 0x100;
/// assert_eq!(next_addr.value(), 0x1100);
/// assert_eq!(next_addr.to_string(), "0x1100");
/// assert_eq!("0x1100".parse::<Address>().unwrap(), next_addr);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    pub const fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Apply a loader slide, wrapping on overflow.
    ///
    /// Slides are signed; two's complement wrapping gives the right answer for
    /// negative slides as well.
    ///
    /// ```rust
    /// use stackmark_core::types::Address;
    ///
    /// assert_eq!(Address::new(0x1_0000_0000).slid_by(0x4000).value(), 0x1_0000_4000);
    /// assert_eq!(Address::new(0x5000).slid_by(-0x1000).value(), 0x4000);
    /// ```
    pub const fn slid_by(self, slide: i64) -> Self
    {
        Address(self.0.wrapping_add_signed(slide))
    }

    /// Add an offset to this address, checking for overflow
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<usize> for Address
{
    fn from(value: usize) -> Self
    {
        Address(value as u64)
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
        f.write_str(&format_hex(self.0))
    }
}

impl FromStr for Address
{
    type Err = StackmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        parse_hex(s)
            .map(Address)
            .ok_or_else(|| StackmarkError::InvalidArgument(format!("not a hex address: {s:?}")))
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
