use itertools::Itertools;

use super::{Format, Instruction};
use crate::decoding_table::{FieldData, FieldLocation};
use crate::error::{GedError, Result};
use crate::FieldId;

/// One run of instruction bits holding part of a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitLocation {
    pub low_bit: u32,
    pub length: u32,
}

impl BitLocation {
    /// `length` in the upper 16 bits, `low_bit` in the lower 16.
    pub const fn packed(&self) -> u32 {
        (self.length << 16) | self.low_bit
    }
}

/// Value bits `from_low..=from_high` of a field and where they are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MappedFragment {
    from_low: u32,
    from_high: u32,
    /// Instruction bits, or `None` for bits implied by the tables.
    to: Option<(u32, u32)>,
    /// Value of implied bits.
    #[cfg_attr(not(feature = "validation"), allow(dead_code))]
    value: u64,
}

impl MappedFragment {
    fn len(&self) -> u32 {
        self.from_high - self.from_low + 1
    }
}

/// Records one implied fragment per run of padding bits. Returns whether the
/// field has padding.
#[cfg(feature = "validation")]
fn record_padding(data: &FieldData, fragments: &mut Vec<MappedFragment>) -> bool {
    use crate::position::bits_to_max_value;
    use crate::restrictions::Restriction;
    use crate::DWORD_BITS;

    let Some(Restriction::Padding { value, mask }) = data.restrictions.first() else {
        return false;
    };
    let mut bit = 0;
    while bit < DWORD_BITS {
        if (mask >> bit) & 1 == 0 {
            bit += 1;
            continue;
        }
        let low = bit;
        while bit < DWORD_BITS && (mask >> bit) & 1 == 1 {
            bit += 1;
        }
        fragments.push(MappedFragment {
            from_low: low,
            from_high: bit - 1,
            to: None,
            value: ((*value >> low) as u64) & bits_to_max_value(bit - low),
        });
    }
    true
}

/// Records the field's explicit positions. Returns whether the whole field
/// is a fixed value.
fn record_position(data: &FieldData, fragments: &mut Vec<MappedFragment>) -> bool {
    if let FieldLocation::Fixed(value) = data.location {
        fragments.push(MappedFragment {
            from_low: 0,
            from_high: (data.bit_size as u32).saturating_sub(1),
            to: None,
            value: value as u64,
        });
        return true;
    }
    fragments.extend(data.fragments().iter().map(|position| {
        let from_low = position.value_offset();
        MappedFragment {
            from_low,
            from_high: from_low + position.size() - 1,
            to: Some((position.low_bit(), position.high_bit())),
            value: 0,
        }
    }));
    false
}

/// Sorts by value bit and joins fragments that continue each other in both
/// the value and the instruction.
fn merge(mut fragments: Vec<MappedFragment>) -> Vec<MappedFragment> {
    fragments.sort_by_key(|fragment| fragment.from_low);
    fragments
        .into_iter()
        .coalesce(|current, next| match (current.to, next.to) {
            (Some((to_low, to_high)), Some((next_low, next_high)))
                if current.from_high + 1 == next.from_low && to_high + 1 == next_low =>
            {
                Ok(MappedFragment {
                    from_high: next.from_high,
                    to: Some((to_low, next_high)),
                    ..current
                })
            }
            _ => Err((current, next)),
        })
        .collect()
}

#[cfg(feature = "validation")]
fn binary(value: u64, bits: u32) -> String {
    let value = value & crate::position::bits_to_max_value(bits);
    format!("{value:0width$b}", width = bits as usize)
}

impl Instruction<'_> {
    /// Native bit runs holding the field, lowest value bits first. Fixed
    /// parts of the field have no location and are left out.
    pub fn query_field_bit_location(&mut self, field: FieldId) -> Result<Vec<BitLocation>> {
        self.ensure_native()?;
        let data = self.field_data(Format::Native, field).ok_or(GedError::InvalidField)?;
        let mut fragments = Vec::new();
        record_position(data, &mut fragments);
        Ok(merge(fragments)
            .into_iter()
            .filter_map(|fragment| {
                let (low_bit, _) = fragment.to?;
                Some(BitLocation { low_bit, length: fragment.len() })
            })
            .collect())
    }

    /// Table of the field's value bits and where each run comes from, using
    /// the compact layout when the compact buffer is valid.
    ///
    /// ```text
    /// Field Src0Reg, width: 8 bits, raw value: 0x5a (01011010b)
    /// 0:3 = 40:43 (1010b)
    /// 4:7 = 52:55 (0101b)
    /// ```
    #[cfg(feature = "validation")]
    pub fn describe_field_bit_location(&mut self, field: FieldId) -> Result<String> {
        const IMPLICIT: &str = "Implicit";

        self.ensure_native()?;
        let format = if self.is_compact_valid() { Format::Compact } else { Format::Native };
        let data = self.field_data(format, field).ok_or(GedError::InvalidField)?;
        let name = self.model.field_name(field).ok_or(GedError::InvalidField)?;

        let mut fragments = Vec::new();
        let mut implicit = record_padding(data, &mut fragments);
        implicit |= record_position(data, &mut fragments);
        let fragments = merge(fragments);

        let max_bit = fragments.last().map_or(0, |fragment| fragment.from_high);
        let spacing = max_bit.to_string().len() * 2 + 1;
        let to_spacing = if implicit { IMPLICIT.len() } else { spacing };
        let raw = self.read(format, field, crate::ValueType::Encoded, false)?;
        let bits = data.bit_size as u32;

        let mut lines = vec![format!(
            "Field {name}, width: {bits} {}, raw value: {raw:#x} ({}b)",
            if bits == 1 { "bit" } else { "bits" },
            binary(raw, bits)
        )];
        for fragment in &fragments {
            let from = format!("{}:{}", fragment.from_low, fragment.from_high);
            let line = match fragment.to {
                None => {
                    let digits = binary(fragment.value, fragment.len());
                    format!("{from:<spacing$} = {IMPLICIT} ({digits}b)")
                }
                Some((to_low, to_high)) => {
                    let to = format!("{to_low}:{to_high}");
                    let value = raw >> fragment.from_low;
                    let digits = binary(value, fragment.len());
                    format!("{from:<spacing$} = {to:<to_spacing$} ({digits}b)")
                }
            };
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    /// Prints [`describe_field_bit_location`](Self::describe_field_bit_location)
    /// to standard output.
    #[cfg(feature = "validation")]
    pub fn print_field_bit_location(&mut self, field: FieldId) -> Result<()> {
        match self.describe_field_bit_location(field) {
            Ok(text) => {
                println!("{text}");
                Ok(())
            }
            Err(GedError::InvalidField) => {
                let name = self.model.field_name(field).unwrap_or("<unknown>");
                println!("Field {name} is invalid for the current instruction.");
                Err(GedError::InvalidField)
            }
            Err(err) => Err(err),
        }
    }
}
