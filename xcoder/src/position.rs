//! Bit-range descriptors
//!
//! A [`PositionFragment`] names one contiguous run of bits inside a buffer of
//! 32-bit words. Fragments never cross a word boundary; fields that do are
//! described by several fragments.

use serde::{Deserialize, Serialize};

use crate::error::{GedError, Result};
use crate::DWORD_BITS;

const MAX_VALUE_TABLE: [u64; 65] = build_max_value_table();

const fn build_max_value_table() -> [u64; 65] {
    let mut table = [0u64; 65];
    let mut i = 1;
    while i < 64 {
        table[i] = (1u64 << i) - 1;
        i += 1;
    }
    table[64] = u64::MAX;
    table
}

/// Largest value representable in `bits` bits. `bits` must not exceed 64.
#[inline(always)]
pub const fn bits_to_max_value(bits: u32) -> u64 {
    assert!(bits <= 64, "bit count exceeds 64");
    MAX_VALUE_TABLE[bits as usize]
}

/// Number of distinct values representable in `bits` bits. `bits` must be below 64.
#[inline(always)]
pub const fn bits_to_num_of_values(bits: u32) -> u64 {
    assert!(bits < 64, "bit count exceeds 63");
    1u64 << bits
}

/// Sign-extends `value` treating `high_bit` as its sign bit.
#[inline(always)]
pub const fn sign_extend(value: u64, high_bit: u32) -> u64 {
    if high_bit >= 63 {
        return value;
    }
    let shift = 63 - high_bit;
    (((value << shift) as i64) >> shift) as u64
}

/// One contiguous bit range within a word buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FragmentRepr", into = "FragmentRepr")]
pub struct PositionFragment {
    low_bit: u8,
    high_bit: u8,
    dword: u8,
    /// Right shift from buffer bits to value bits; negative shifts left.
    shift: i8,
    /// In-word extraction mask.
    mask: u32,
}

impl PositionFragment {
    /// Fragment holding the low bits of a value.
    pub const fn new(low_bit: u8, high_bit: u8) -> Self {
        Self::at_offset(low_bit, high_bit, 0)
    }

    /// Fragment whose `low_bit` carries bit `value_offset` of the value.
    pub const fn at_offset(low_bit: u8, high_bit: u8, value_offset: u8) -> Self {
        match Self::checked(low_bit, high_bit, value_offset) {
            Some(fragment) => fragment,
            None => panic!("malformed position fragment"),
        }
    }

    pub fn try_at_offset(low_bit: u8, high_bit: u8, value_offset: u8) -> Result<Self> {
        Self::checked(low_bit, high_bit, value_offset).ok_or_else(|| {
            GedError::MalformedTable(format!(
                "bad position fragment {low_bit}:{high_bit} (value offset {value_offset})"
            ))
        })
    }

    const fn checked(low_bit: u8, high_bit: u8, value_offset: u8) -> Option<Self> {
        if high_bit < low_bit || low_bit / 32 != high_bit / 32 {
            return None;
        }
        let size = (high_bit - low_bit) as u32 + 1;
        if value_offset as u32 + size > 64 {
            return None;
        }
        let in_word = (low_bit % 32) as u32;
        let shift = in_word as i16 - value_offset as i16;
        let mask = (bits_to_max_value(size) as u32) << in_word;
        Some(Self { low_bit, high_bit, dword: low_bit / 32, shift: shift as i8, mask })
    }

    pub const fn low_bit(&self) -> u32 {
        self.low_bit as u32
    }

    pub const fn high_bit(&self) -> u32 {
        self.high_bit as u32
    }

    pub const fn dword(&self) -> usize {
        self.dword as usize
    }

    pub const fn shift(&self) -> i32 {
        self.shift as i32
    }

    pub const fn mask(&self) -> u32 {
        self.mask
    }

    pub const fn size(&self) -> u32 {
        self.high_bit() - self.low_bit() + 1
    }

    /// Value bit carried by `low_bit`.
    pub const fn value_offset(&self) -> u32 {
        ((self.low_bit() % DWORD_BITS) as i32 - self.shift()) as u32
    }

    pub const fn max_value(&self) -> u64 {
        bits_to_max_value(self.size())
    }

    /// Value bits covered by this fragment.
    pub const fn value_mask(&self) -> u64 {
        self.max_value() << self.value_offset()
    }

    /// Reads this fragment's bits, placed at their value position.
    #[inline]
    pub fn extract(&self, words: &[u32]) -> u64 {
        let bits = (words[self.dword()] & self.mask) as u64;
        if self.shift >= 0 {
            bits >> self.shift
        } else {
            bits << -self.shift()
        }
    }

    /// Stores the value bits this fragment covers, leaving every other bit intact.
    #[inline]
    pub fn insert(&self, words: &mut [u32], value: u64) {
        let placed = if self.shift >= 0 { value << self.shift } else { value >> -self.shift() };
        let word = &mut words[self.dword()];
        *word = (*word & !self.mask) | (placed as u32 & self.mask);
    }
}

#[derive(Serialize, Deserialize)]
struct FragmentRepr {
    low_bit: u8,
    high_bit: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    value_offset: u8,
}

fn is_zero(value: &u8) -> bool {
    *value == 0
}

impl TryFrom<FragmentRepr> for PositionFragment {
    type Error = GedError;

    fn try_from(repr: FragmentRepr) -> Result<Self> {
        Self::try_at_offset(repr.low_bit, repr.high_bit, repr.value_offset)
    }
}

impl From<PositionFragment> for FragmentRepr {
    fn from(fragment: PositionFragment) -> Self {
        FragmentRepr {
            low_bit: fragment.low_bit,
            high_bit: fragment.high_bit,
            value_offset: fragment.value_offset() as u8,
        }
    }
}
