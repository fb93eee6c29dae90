//! Field decoding tables
//!
//! A decoding table maps every field of a model to an entry. Terminal entries
//! give the field's bit position (one or more fragments) or a fixed value;
//! `NextTable` entries defer to a child table selected by another field's raw
//! value.

use serde::{Deserialize, Serialize};

use crate::error::{GedError, Result};
use crate::position::PositionFragment;
use crate::restrictions::Restriction;
use crate::table::{Chained, Table, TableId};
use crate::FieldId;

pub type DecodingTable = Table<FieldEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldEntry {
    Explicit(FieldData),
    NextTable { key: FieldId, table: TableId },
    NotSupported,
}

impl Chained for FieldEntry {
    fn next_table(&self) -> Option<(FieldId, TableId)> {
        match self {
            FieldEntry::NextTable { key, table } => Some((*key, *table)),
            _ => None,
        }
    }
}

impl FieldEntry {
    pub fn data(&self) -> Option<&FieldData> {
        match self {
            FieldEntry::Explicit(data) => Some(data),
            _ => None,
        }
    }
}

/// Where a field lives and how its value is constrained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldData {
    pub bit_size: u8,
    pub location: FieldLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLocation {
    Consecutive(PositionFragment),
    /// An empty list is a field made only of padding.
    Fragmented(Vec<PositionFragment>),
    Fixed(u32),
}

impl FieldData {
    pub fn consecutive(bit_size: u8, position: PositionFragment) -> Self {
        Self { bit_size, location: FieldLocation::Consecutive(position), restrictions: Vec::new() }
    }

    pub fn fragmented(bit_size: u8, fragments: Vec<PositionFragment>) -> Self {
        Self { bit_size, location: FieldLocation::Fragmented(fragments), restrictions: Vec::new() }
    }

    pub fn fixed(bit_size: u8, value: u32) -> Self {
        Self { bit_size, location: FieldLocation::Fixed(value), restrictions: Vec::new() }
    }

    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Position fragments, empty for fixed values.
    pub fn fragments(&self) -> &[PositionFragment] {
        match &self.location {
            FieldLocation::Consecutive(position) => std::slice::from_ref(position),
            FieldLocation::Fragmented(fragments) => fragments,
            FieldLocation::Fixed(_) => &[],
        }
    }

    /// Raw field value read from `words`.
    pub fn extract(&self, words: &[u32]) -> u64 {
        match &self.location {
            FieldLocation::Fixed(value) => *value as u64,
            _ => self.fragments().iter().fold(0, |value, fragment| value | fragment.extract(words)),
        }
    }

    /// Writes a raw value. Fixed fields accept only their own value.
    pub fn store(&self, words: &mut [u32], raw: u64) -> Result<()> {
        match &self.location {
            FieldLocation::Fixed(value) if *value as u64 == raw => Ok(()),
            FieldLocation::Fixed(_) => Err(GedError::InvalidValue),
            _ => {
                for fragment in self.fragments() {
                    fragment.insert(words, raw);
                }
                Ok(())
            }
        }
    }
}
