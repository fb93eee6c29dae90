//! Compact-to-native mapping tables
//!
//! For every field present in the compact format, the mapping table says how
//! its compact bits expand into native bits. A value mapping copies the bits
//! directly; an index mapping treats them as an index into a compaction table
//! whose entry holds the native bits.

use serde::{Deserialize, Serialize};

use crate::position::{bits_to_max_value, PositionFragment};
use crate::table::{Chained, Table, TableId};
use crate::{FieldId, DWORD_BITS};

pub type MappingTable = Table<MappingEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingEntry {
    /// The compact value is copied into the native position.
    Value { target: MappingTarget },
    /// The compact value indexes `table`; the entry is copied into the native position.
    Index { target: MappingTarget, table: TableId },
    /// Present in the compact format but without native counterpart.
    NoMapping,
    NextTable { key: FieldId, table: TableId },
    NotSupported,
}

impl Chained for MappingEntry {
    fn next_table(&self) -> Option<(FieldId, TableId)> {
        match self {
            MappingEntry::NextTable { key, table } => Some((*key, *table)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTarget {
    /// Source bits under `source_mask` land at `to`, low bit first.
    Consecutive { to: PositionFragment, source_mask: u32 },
    Fragmented(Vec<MappingFragment>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingFragment {
    pub to: PositionFragment,
    pub source: FragmentSource,
}

/// Where the bits of one native fragment come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentSource {
    /// Bits `from` of the source land bit for bit on `to`.
    OneToOne { from: PositionFragment },
    /// The `from` chunk is repeated across the whole of `to`.
    Replicate { from: PositionFragment },
    /// `to` always holds `value`.
    Fixed { value: u32 },
}

/// Wide native values addressed by a compact index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactionTable {
    entries: Vec<u64>,
}

impl CompactionTable {
    pub fn new(entries: Vec<u64>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    pub fn get(&self, index: u64) -> Option<u64> {
        self.entries.get(usize::try_from(index).ok()?).copied()
    }

    /// Indexes whose entry matches `value` once the bits in `ignore` are disregarded.
    pub fn matching(
        &self,
        value: u64,
        ignore: u64,
        limit: usize,
    ) -> impl Iterator<Item = u64> + '_ {
        let wanted = value | ignore;
        self.entries
            .iter()
            .take(limit)
            .enumerate()
            .filter(move |(_, entry)| (**entry | ignore) == wanted)
            .map(|(index, _)| index as u64)
    }
}

/// The 32-bit half of a 64-bit source that `from` addresses.
fn source_word(source: u64, from: &PositionFragment) -> u32 {
    (source >> (DWORD_BITS as usize * from.dword())) as u32
}

/// Right shift for positive `shift`, left shift otherwise; bits shifted past the word are lost.
fn shift_signed(value: u32, shift: i32) -> u32 {
    if shift >= 0 {
        value.checked_shr(shift as u32).unwrap_or(0)
    } else {
        value.checked_shl(shift.unsigned_abs()).unwrap_or(0)
    }
}

impl MappingFragment {
    /// Native bits for this fragment, already placed under `to`'s mask.
    pub fn scatter(&self, source: u64) -> u32 {
        let to = &self.to;
        let value = match &self.source {
            FragmentSource::OneToOne { from } => {
                let bits = source_word(source, from) & from.mask();
                shift_signed(bits, from.shift() - to.shift())
            }
            FragmentSource::Replicate { from } => {
                let bits = source_word(source, from) & from.mask();
                let chunk = (bits >> (from.low_bit() % DWORD_BITS)) as u64;
                let repeats = to.size() / from.size();
                let replicated =
                    (0..repeats).fold(0u64, |acc, i| acc | (chunk << (i * from.size())));
                (replicated << (to.low_bit() % DWORD_BITS)) as u32
            }
            FragmentSource::Fixed { value } => value << (to.low_bit() % DWORD_BITS),
        };
        value & to.mask()
    }

    /// Source bits recovered from native `words`, placed where `scatter` reads them.
    ///
    /// Returns `None` when the native bits cannot have come from this fragment:
    /// a fixed fragment with another non-zero value, or a replicated fragment that is
    /// not a true repetition. With `strict` unset those checks are skipped.
    pub fn gather(&self, words: &[u32], strict: bool) -> Option<u64> {
        let to = &self.to;
        let bits = words[to.dword()] & to.mask();
        match &self.source {
            FragmentSource::OneToOne { from } => {
                let value = shift_signed(bits, to.shift() - from.shift()) & from.mask();
                Some((value as u64) << (DWORD_BITS as usize * from.dword()))
            }
            FragmentSource::Replicate { from } => {
                let value = (bits >> (to.low_bit() % DWORD_BITS)) as u64;
                let chunk_mask = bits_to_max_value(from.size());
                let chunk = value & chunk_mask;
                let repeats = to.size() / from.size();
                let repeated = |i: u32| (value >> (i * from.size())) & chunk_mask == chunk;
                if strict && !(0..repeats).all(repeated) {
                    return None;
                }
                let placed = ((chunk as u32) << (from.low_bit() % DWORD_BITS)) & from.mask();
                Some((placed as u64) << (DWORD_BITS as usize * from.dword()))
            }
            FragmentSource::Fixed { value } => {
                if strict && bits != 0 && bits >> (to.low_bit() % DWORD_BITS) != *value {
                    return None;
                }
                Some(0)
            }
        }
    }
}

impl MappingTarget {
    /// Native `(dword, mask, bits)` updates produced by a source value.
    pub fn scatter(&self, source: u64) -> Vec<(usize, u32, u32)> {
        match self {
            MappingTarget::Consecutive { to, source_mask } => {
                let bits = ((source as u32 & source_mask) as u64) << (to.low_bit() % DWORD_BITS);
                vec![(to.dword(), to.mask(), bits as u32 & to.mask())]
            }
            MappingTarget::Fragmented(fragments) => fragments
                .iter()
                .map(|fragment| (fragment.to.dword(), fragment.to.mask(), fragment.scatter(source)))
                .collect(),
        }
    }

    /// Source value recovered from native `words`.
    pub fn gather(&self, words: &[u32], strict: bool) -> Option<u64> {
        match self {
            MappingTarget::Consecutive { to, source_mask } => {
                let value = (words[to.dword()] & to.mask()) >> (to.low_bit() % DWORD_BITS);
                if strict && value & !source_mask != 0 {
                    return None;
                }
                Some(value as u64)
            }
            MappingTarget::Fragmented(fragments) => fragments
                .iter()
                .try_fold(0u64, |value, fragment| Some(value | fragment.gather(words, strict)?)),
        }
    }

    /// Native fragments written by this target.
    pub fn destinations(&self) -> Vec<PositionFragment> {
        match self {
            MappingTarget::Consecutive { to, .. } => vec![*to],
            MappingTarget::Fragmented(fragments) => {
                fragments.iter().map(|fragment| fragment.to).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_target() {
        let target =
            MappingTarget::Consecutive { to: PositionFragment::new(40, 47), source_mask: 0xff };
        assert_eq!(target.scatter(0x1_5a), vec![(1, 0x0000_ff00, 0x0000_5a00)]);
        assert_eq!(target.gather(&[0, 0x0000_5a00, 0, 0], true), Some(0x5a));
    }

    #[test]
    fn test_one_to_one_from_upper_half() {
        // Bits 32..35 of a compaction entry land on native bits 96..99
        let fragment = MappingFragment {
            to: PositionFragment::new(96, 99),
            source: FragmentSource::OneToOne { from: PositionFragment::new(32, 35) },
        };
        let source = 0x0000_0009_0000_0000u64;
        assert_eq!(fragment.scatter(source), 0x9);
        assert_eq!(fragment.gather(&[0, 0, 0, 0x9], true), Some(source));
    }

    #[test]
    fn test_one_to_one_moves_bits() {
        // Source bits 0..3 land on native bits 20..23
        let fragment = MappingFragment {
            to: PositionFragment::new(20, 23),
            source: FragmentSource::OneToOne { from: PositionFragment::new(0, 3) },
        };
        assert_eq!(fragment.scatter(0xc), 0x00c0_0000);
        assert_eq!(fragment.gather(&[0x00c0_0000], true), Some(0xc));
    }

    #[test]
    fn test_replicate() {
        // A 2-bit source chunk fills an 8-bit native field
        let fragment = MappingFragment {
            to: PositionFragment::new(8, 15),
            source: FragmentSource::Replicate { from: PositionFragment::new(4, 5) },
        };
        assert_eq!(fragment.scatter(0b10 << 4), 0xaa00);
        assert_eq!(fragment.gather(&[0xaa00], true), Some(0b10 << 4));
        assert_eq!(fragment.gather(&[0xab00], true), None);
        assert_eq!(fragment.gather(&[0xab00], false), Some(0b11 << 4));
    }

    #[test]
    fn test_fixed() {
        let fragment = MappingFragment {
            to: PositionFragment::new(4, 6),
            source: FragmentSource::Fixed { value: 0x5 },
        };
        assert_eq!(fragment.scatter(0xffff), 0x50);
        assert_eq!(fragment.gather(&[0x50], true), Some(0));
        assert_eq!(fragment.gather(&[0x40], true), None);
        // Cleared native bits are accepted as well
        assert_eq!(fragment.gather(&[0x0], true), Some(0));
    }

    #[test]
    fn test_compaction_table_matching() {
        let table = CompactionTable::new(vec![0x10, 0x11, 0x21, 0x11]);
        assert_eq!(table.matching(0x11, 0, 4).collect::<Vec<_>>(), vec![1, 3]);
        // Ignoring bit 0 also accepts 0x10
        assert_eq!(table.matching(0x11, 0x1, 4).collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(table.matching(0x11, 0, 2).collect::<Vec<_>>(), vec![1]);
        assert_eq!(table.get(2), Some(0x21));
        assert_eq!(table.get(4), None);
    }
}
