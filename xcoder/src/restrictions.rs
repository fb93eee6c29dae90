//! Value-domain restrictions
//!
//! Restrictions turn the raw bits of a field into the value callers see
//! (padding, enumerations, variable-width typing) and guard writes against
//! values the hardware cannot represent. Decoding never rejects a value because
//! of a `Value`, `Range` or `Mask` restriction; those only guard writes.

use serde::{Deserialize, Serialize};

use crate::decoding_table::FieldData;
use crate::error::{GedError, Result};
use crate::position::{bits_to_max_value, sign_extend};
use crate::table::TableId;

/// How a field value is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    /// Raw bits, no sign extension or restriction handling.
    Encoded,
    /// Fully decoded value.
    #[default]
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Restriction {
    Value {
        value: u32,
    },
    Range {
        min: i64,
        max: i64,
    },
    /// Bits under `mask` must be zero.
    Mask {
        mask: u32,
    },
    /// Bits under `mask` are implicit and always equal `value`.
    Padding {
        value: u32,
        mask: u32,
    },
    /// Variable-width field. With `duplicate` the stored value is the
    /// `bits`-wide value repeated twice.
    FieldType {
        bits: u8,
        signed: bool,
        #[serde(default)]
        duplicate: bool,
    },
    Enum {
        table: TableId,
    },
}

/// Raw value to enumerated value, `None` for illegal encodings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumTable {
    entries: Vec<Option<u32>>,
}

impl EnumTable {
    pub fn new(entries: Vec<Option<u32>>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, raw: u64) -> Option<u32> {
        let index = usize::try_from(raw).ok()?;
        self.entries.get(index).copied().flatten()
    }

    /// First raw value mapping to `value`.
    pub fn reverse_lookup(&self, value: u64) -> Option<u64> {
        self.entries.iter().position(|entry| entry.map(u64::from) == Some(value)).map(|i| i as u64)
    }
}

/// Width of the value a field holds: the variable width when typed, else its bit size.
pub fn field_width(data: &FieldData) -> u32 {
    match data.restrictions.first() {
        Some(Restriction::FieldType { bits, .. }) => *bits as u32,
        _ => data.bit_size as u32,
    }
}

/// Turns raw field bits into the processed value.
///
/// `signed` is the signedness of the caller's numeric type.
pub(crate) fn decode_value(
    data: &FieldData,
    enums: &[EnumTable],
    raw: u64,
    signed: bool,
) -> Result<u64> {
    let value = match data.restrictions.first() {
        Some(Restriction::FieldType { bits, signed: true, .. }) if *bits > 0 => {
            sign_extend(raw, *bits as u32 - 1)
        }
        _ if signed && field_width(data) > 0 => sign_extend(raw, field_width(data) - 1),
        _ => raw,
    };
    decode(data, enums, value)
}

fn decode(data: &FieldData, enums: &[EnumTable], mut value: u64) -> Result<u64> {
    for restriction in &data.restrictions {
        match *restriction {
            Restriction::Padding { value: padding, .. } => value |= padding as u64,
            Restriction::Enum { table } => {
                let table = enums.get(table.as_usize()).ok_or(GedError::InvalidValue)?;
                value = table.lookup(value).ok_or(GedError::InvalidValue)? as u64;
            }
            Restriction::FieldType { bits, signed, .. } => {
                if !(signed && (value as i64) < 0) {
                    value &= bits_to_max_value(bits as u32);
                }
            }
            Restriction::Value { .. } | Restriction::Range { .. } | Restriction::Mask { .. } => {}
        }
    }
    Ok(value)
}

/// Validates `value` for a write and returns the raw bits to store.
pub(crate) fn encode_value(
    data: &FieldData,
    enums: &[EnumTable],
    value: u64,
    signed: bool,
    value_type: ValueType,
) -> Result<u64> {
    let bit_size = data.bit_size as u32;
    if value_type == ValueType::Encoded || data.restrictions.is_empty() {
        return fit(value, bit_size, signed);
    }

    if let Some(Restriction::Enum { table }) = data.restrictions.first() {
        let table = enums.get(table.as_usize()).ok_or(GedError::InvalidValue)?;
        let raw = table.reverse_lookup(value).ok_or(GedError::InvalidValue)?;
        return fit(raw, bit_size, false);
    }

    let mut raw = value;
    let mut typed = false;
    // One content restriction plus one type modifier at most.
    for restriction in data.restrictions.iter().take(2) {
        match *restriction {
            Restriction::Value { value: expected } => {
                if raw != expected as u64 {
                    return Err(GedError::InvalidValue);
                }
            }
            Restriction::Range { min, max } => {
                let numeric = if signed { raw as i64 as i128 } else { raw as i128 };
                if numeric < min as i128 || numeric > max as i128 {
                    return Err(GedError::InvalidValue);
                }
            }
            Restriction::Mask { mask } => {
                if raw & mask as u64 != 0 {
                    return Err(GedError::InvalidValue);
                }
            }
            Restriction::Padding { value: padding, mask } => {
                if raw & mask as u64 != padding as u64 {
                    return Err(GedError::InvalidValue);
                }
            }
            Restriction::FieldType { bits, signed: field_signed, duplicate } => {
                let bits = bits as u32;
                raw = fit(raw, bits, signed || field_signed)?;
                if duplicate {
                    raw |= raw.checked_shl(bits).ok_or(GedError::InvalidValue)?;
                }
                typed = true;
            }
            Restriction::Enum { .. } => return Err(GedError::InvalidValue),
        }
    }

    if typed {
        if raw > bits_to_max_value(bit_size) {
            return Err(GedError::InvalidValue);
        }
        Ok(raw)
    } else {
        fit(raw, bit_size, signed)
    }
}

/// Trims `value` to `bits` bits, failing when that would lose information.
fn fit(value: u64, bits: u32, signed: bool) -> Result<u64> {
    let max = bits_to_max_value(bits);
    if value <= max {
        return Ok(value);
    }
    if signed && bits > 0 && (value as i64) < 0 && sign_extend(value & max, bits - 1) == value {
        return Ok(value & max);
    }
    Err(GedError::InvalidValue)
}
