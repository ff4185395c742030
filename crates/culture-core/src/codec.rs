//! Trait codec: packing and unpacking of culture values.
//!
//! A culture is a vector of [`FEATURE_COUNT`] discrete traits, each holding
//! a value in `[0, 15]`. The traits are packed four bits apiece into the low
//! 24 bits of a `u32`, slot 0 in the least significant nibble.
//!
//! ```text
//!  bits: 23..20 19..16 15..12 11..8  7..4   3..0
//!  slot:   5      4      3      2     1      0
//! ```
//!
//! The all-ones value [`Culture::EMPTY`] (`0xFFFFFF`) is reserved to mark an
//! unpopulated grid cell.

use std::fmt;

/// Number of trait slots in a culture value.
pub const FEATURE_COUNT: usize = 6;

/// Number of bits per trait slot.
pub const TRAIT_BITS: u32 = 4;

/// Largest value a single trait can hold.
pub const MAX_TRAIT: u8 = 0xF;

/// Per-slot clearing masks. Entry `i` zeroes exactly the four bits of slot `i`
/// and keeps every other slot of the 24-bit culture.
const SLOT_MASKS: [u32; FEATURE_COUNT] =
    [0xFF_FFF0, 0xFF_FF0F, 0xFF_F0FF, 0xFF_0FFF, 0xF0_FFFF, 0x0F_FFFF];

/// Bit offset of `slot`, or `None` when the shift would leave the word.
fn slot_shift(slot: usize) -> Option<u32> {
    u32::try_from(slot)
        .ok()
        .and_then(|s| s.checked_mul(TRAIT_BITS))
        .filter(|shift| *shift < u32::BITS)
}

/// Return the trait stored at `slot` of `value`.
///
/// Computed as `(value >> (4 * slot)) & 0xF`. Bits above the packed
/// traits are ignored; a slot whose offset lies beyond the 32-bit word
/// yields 0.
pub fn extract(value: u32, slot: usize) -> u8 {
    let Some(shift) = slot_shift(slot) else {
        return 0;
    };
    // Masked to four bits, so the narrowing is lossless.
    #[allow(clippy::cast_possible_truncation)]
    let trait_value = (value.checked_shr(shift).unwrap_or(0) & u32::from(MAX_TRAIT)) as u8;
    trait_value
}

/// Return `value` with the trait at `slot` overwritten by `trait_value`.
///
/// Only the four bits of `slot` change. `trait_value` is masked to four
/// bits. A slot outside `[0, FEATURE_COUNT)` leaves `value` unchanged.
pub fn replace(value: u32, trait_value: u8, slot: usize) -> u32 {
    let (Some(mask), Some(shift)) = (SLOT_MASKS.get(slot), slot_shift(slot)) else {
        return value;
    };
    let inserted = u32::from(trait_value & MAX_TRAIT)
        .checked_shl(shift)
        .unwrap_or(0);
    (value & mask) | inserted
}

// ---------------------------------------------------------------------------
// Culture
// ---------------------------------------------------------------------------

/// An agent's packed trait vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Culture(u32);

impl Culture {
    /// Sentinel for an unpopulated cell: every slot holds 15.
    pub const EMPTY: Self = Self(0xFF_FFFF);

    /// Wrap a raw packed value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw packed value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the empty-cell sentinel.
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    /// Trait at `slot`.
    pub fn trait_at(self, slot: usize) -> u8 {
        extract(self.0, slot)
    }

    /// Copy of this culture with `slot` set to `trait_value`.
    #[must_use]
    pub fn with_trait(self, slot: usize, trait_value: u8) -> Self {
        Self(replace(self.0, trait_value, slot))
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

impl From<u32> for Culture {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}
