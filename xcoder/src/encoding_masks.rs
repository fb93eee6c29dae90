//! Reserved-bit enforcement
//!
//! Each opcode may list groups of OR/AND masks that force must-be-one and
//! must-be-zero bits. A group may depend on other fields through a table chain.

use serde::{Deserialize, Serialize};

use crate::table::{Chained, Table, TableId};
use crate::FieldId;

pub type MasksTable = Table<MasksEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MasksEntry {
    /// One word per buffer dword.
    Masks { or: Vec<u32>, and: Vec<u32> },
    NextTable { key: FieldId, table: TableId },
    /// Ends a top-level group list; skipped when reached through a chain.
    NoMasks,
}

impl Chained for MasksEntry {
    fn next_table(&self) -> Option<(FieldId, TableId)> {
        match self {
            MasksEntry::NextTable { key, table } => Some((*key, *table)),
            _ => None,
        }
    }
}

impl MasksEntry {
    /// `word = (word | or) & and` for every dword.
    pub fn apply(&self, words: &mut [u32]) {
        if let MasksEntry::Masks { or, and } = self {
            for ((word, or), and) in words.iter_mut().zip(or).zip(and) {
                *word = (*word | or) & and;
            }
        }
    }
}

/// Groups of a top-level masks table, up to the terminating `NoMasks`.
pub fn groups(table: &MasksTable) -> impl Iterator<Item = &MasksEntry> {
    table.entries().iter().take_while(|entry| !matches!(entry, MasksEntry::NoMasks))
}
