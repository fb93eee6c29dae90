//! Table arenas and dependency-chain resolution
//!
//! Decoding, compaction-mapping and encoding-mask tables share one shape: a
//! flat array of entries where an entry may defer to a child table indexed by
//! the raw value of another field. Tables of each kind live in an arena owned by
//! the model and refer to each other by [`TableId`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::FieldId;

/// Index of a table within its arena.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub u32);

impl TableId {
    pub const fn new(id: u32) -> Self {
        TableId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<TableId> for usize {
    fn from(id: TableId) -> Self {
        id.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entries that may continue into a dependent table.
pub trait Chained {
    /// The dependee field and child table, when this entry is a link.
    fn next_table(&self) -> Option<(FieldId, TableId)>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table<E> {
    entries: Vec<E>,
}

impl<E> Table<E> {
    pub fn new(entries: Vec<E>) -> Self {
        Self { entries }
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<E> FromIterator<E> for Table<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Follows `NextTable` links from `entry` until a terminal entry is reached.
///
/// `key` returns the raw value of a dependee field, or `None` when that field
/// cannot be decoded for the current instruction. Both a missing key and a key
/// outside the child table end the walk with `None`.
pub fn resolve<'t, E: Chained>(
    arena: &'t [Table<E>],
    mut entry: &'t E,
    mut key: impl FnMut(FieldId) -> Option<u64>,
) -> Option<&'t E> {
    // Chains are acyclic once the model is validated, so no walk is longer than the arena.
    for _ in 0..=arena.len() {
        let Some((dependee, child)) = entry.next_table() else {
            return Some(entry);
        };
        let index = usize::try_from(key(dependee)?).ok()?;
        entry = arena.get(child.as_usize())?.get(index)?;
    }
    tracing::warn!("table chain did not terminate");
    None
}
