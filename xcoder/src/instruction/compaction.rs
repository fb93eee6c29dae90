//! Conversion between the native and compact formats
//!
//! Expanding a compact instruction walks every compact field and writes its
//! native bits through the mapping table. A mapping can depend on native
//! fields that are only known once other fields have been expanded, so
//! fields whose dependencies are still unwritten are retried after the rest.
//!
//! Compacting runs the mapping backwards: value-mapped fields are gathered
//! from the native bits directly, index-mapped fields are looked up in their
//! compaction table.

use super::{Format, Instruction, KeyReader};
use crate::decoding_table::{FieldData, FieldEntry};
use crate::error::{GedError, Result};
use crate::mapping_table::{MappingEntry, MappingTarget};
use crate::model::{CompactTables, ModelData};
use crate::position::{bits_to_max_value, bits_to_num_of_values};
use crate::table::TableId;
use crate::{FieldId, COMPACT_CONTROL_MASK, COMPACT_INS_DWORDS, NATIVE_INS_DWORDS};

/// Every compact encoding of one native instruction
pub(crate) struct CompactionPlan<'m> {
    /// Value-mapped fields and the compaction-control bit.
    pub(crate) template: [u32; COMPACT_INS_DWORDS],
    /// One entry per index-mapped field, in field order.
    pub(crate) choices: Vec<IndexChoice<'m>>,
}

/// Compaction table indexes that reproduce a field's native bits
pub(crate) struct IndexChoice<'m> {
    data: &'m FieldData,
    /// Never empty.
    pub(crate) indexes: Vec<u64>,
}

impl IndexChoice<'_> {
    pub(crate) fn store(&self, words: &mut [u32], index: u64) -> Result<()> {
        self.data.store(words, index).map_err(|_| GedError::NoCompactForm)
    }
}

impl<'m> CompactionPlan<'m> {
    /// The encoding using the first matching index of every field.
    pub(crate) fn first(&self) -> Result<[u32; COMPACT_INS_DWORDS]> {
        let mut words = self.template;
        for choice in &self.choices {
            choice.store(&mut words, choice.indexes[0])?;
        }
        Ok(words)
    }
}

/// Fields with an entry in the top-level compact decoding table.
fn compact_fields(model: &ModelData, decoding: TableId) -> impl Iterator<Item = FieldId> + '_ {
    let entries = model
        .decoding_tables
        .get(decoding.as_usize())
        .map(|table| table.entries())
        .unwrap_or_default();
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| !matches!(entry, FieldEntry::NotSupported))
        .map(|(field, _)| field as FieldId)
        .take_while(move |field| *field < model.num_fields())
}

/// Native buffer under construction from a compact one
struct Decompaction<'m> {
    model: &'m ModelData,
    native_decoding: TableId,
    tables: &'m CompactTables,
    compact: [u32; COMPACT_INS_DWORDS],
    native: [u32; NATIVE_INS_DWORDS],
    /// Bits not written yet.
    unwritten: [u32; NATIVE_INS_DWORDS],
}

impl<'m> Decompaction<'m> {
    fn new(
        model: &'m ModelData,
        native_decoding: TableId,
        tables: &'m CompactTables,
        compact: [u32; COMPACT_INS_DWORDS],
    ) -> Self {
        Self {
            model,
            native_decoding,
            tables,
            compact,
            native: [0; NATIVE_INS_DWORDS],
            unwritten: [!0; NATIVE_INS_DWORDS],
        }
    }

    /// Expands one compact field. `Ok(false)` means the field depends on
    /// native bits that are not written yet.
    fn map_field(&mut self, field: FieldId) -> Result<bool> {
        let model = self.model;
        let (target, source) = {
            let reader = KeyReader::new(model, self.native_decoding, &self.native)
                .with_unwritten(&self.unwritten);
            let mapping = reader.entry(&model.mapping_tables, self.tables.mapping, field as usize);
            let Some(entry) = mapping else {
                return Ok(false);
            };
            let (target, table): (&MappingTarget, Option<TableId>) = match entry {
                MappingEntry::NoMapping => return Ok(true),
                MappingEntry::Value { target } => (target, None),
                MappingEntry::Index { target, table } => (target, Some(*table)),
                MappingEntry::NextTable { .. } | MappingEntry::NotSupported => return Ok(false),
            };
            let Some(data) = reader.field_data(self.tables.decoding, field) else {
                return Ok(false);
            };
            let value = data.extract(&self.compact);
            let source = match table {
                None => value,
                Some(table) => {
                    let entry = model
                        .compaction_tables
                        .get(table.as_usize())
                        .and_then(|compaction| compaction.get(value));
                    entry.ok_or_else(|| {
                        tracing::warn!(
                            "index {value} of field {field} is outside compaction table {table}"
                        );
                        GedError::BadCompactEncoding { unresolved: vec![field] }
                    })?
                }
            };
            (target, source)
        };

        for (dword, mask, bits) in target.scatter(source) {
            self.native[dword] = (self.native[dword] & !mask) | bits;
            self.unwritten[dword] &= !mask;
        }
        Ok(true)
    }
}

impl<'m> Instruction<'m> {
    /// Rebuilds the native buffer from the compact one.
    pub(crate) fn build_native_from_compact(&mut self) -> Result<()> {
        let model = self.model;
        let tables = self.tables.compact.as_ref().ok_or(GedError::NoCompactForm)?;
        let mut state = Decompaction::new(model, self.tables.native_decoding, tables, self.compact);

        let mut pending: Vec<FieldId> = compact_fields(model, tables.decoding).collect();
        while !pending.is_empty() {
            let mut deferred = Vec::new();
            for &field in &pending {
                if !state.map_field(field)? {
                    deferred.push(field);
                }
            }
            if deferred.len() == pending.len() {
                let unwritten = super::hex_words(&state.unwritten);
                tracing::warn!(
                    "unable to map fields {deferred:?} of {}, probably due to a dependency cycle \
                     (unwritten bits {unwritten})",
                    self.mnemonic()
                );
                return Err(GedError::BadCompactEncoding { unresolved: deferred });
            }
            if !deferred.is_empty() {
                let name = self.mnemonic();
                tracing::trace!("deferring fields {deferred:?} of {name} to the next pass");
            }
            pending = deferred;
        }

        let mut native = state.native;
        native[0] &= !COMPACT_CONTROL_MASK;
        self.native = native;
        self.status.mark_valid(Format::Native);
        Ok(())
    }

    /// Builds the compact buffer from the native one, choosing the first
    /// matching compaction entry for every index-mapped field.
    pub(crate) fn build_compact_from_native(&mut self) -> Result<()> {
        let plan = self.compaction_plan()?;
        self.compact = plan.first()?;
        self.status.mark_valid(Format::Compact);
        Ok(())
    }

    /// Collects what every compact encoding of the native buffer shares and
    /// where they differ. Fails with `NoCompactForm` when there is none.
    pub(crate) fn compaction_plan(&self) -> Result<CompactionPlan<'m>> {
        let model = self.model;
        let tables = self.tables.compact.as_ref().ok_or(GedError::NoCompactForm)?;
        let or_mask = self.native_or_mask();
        let reader = self.key_reader();
        let no_form = |field: FieldId, reason: &str| {
            tracing::debug!("{} has no compact form: field {field} {reason}", self.mnemonic());
            GedError::NoCompactForm
        };

        let mut template = [0u32; COMPACT_INS_DWORDS];
        let mut choices = Vec::new();
        for field in compact_fields(model, tables.decoding) {
            let entry = reader
                .entry(&model.mapping_tables, tables.mapping, field as usize)
                .ok_or_else(|| no_form(field, "has no mapping"))?;
            let (target, table) = match entry {
                MappingEntry::NoMapping => continue,
                MappingEntry::Value { target } => (target, None),
                MappingEntry::Index { target, table } => (target, Some(*table)),
                MappingEntry::NextTable { .. } | MappingEntry::NotSupported => {
                    return Err(no_form(field, "is not supported"));
                }
            };
            let data = reader
                .field_data(tables.decoding, field)
                .ok_or_else(|| no_form(field, "has no position"))?;
            let value = target
                .gather(&self.native, true)
                .ok_or_else(|| no_form(field, "cannot be gathered"))?;

            let Some(table) = table else {
                if value > bits_to_max_value(data.bit_size as u32) {
                    return Err(no_form(field, "does not fit"));
                }
                data.store(&mut template, value).map_err(|_| no_form(field, "does not fit"))?;
                continue;
            };

            let ignore = target.gather(&or_mask, false).unwrap_or(0);
            let compaction =
                model.compaction_tables.get(table.as_usize()).ok_or(GedError::NoCompactForm)?;
            let limit = if data.bit_size >= 32 {
                usize::MAX
            } else {
                bits_to_num_of_values(data.bit_size as u32) as usize
            };
            let indexes: Vec<u64> = compaction.matching(value, ignore, limit).collect();
            if indexes.is_empty() {
                let reason = format!("value {value:#x} is not in compaction table {table}");
                return Err(no_form(field, &reason));
            }
            choices.push(IndexChoice { data, indexes });
        }

        template[0] |= COMPACT_CONTROL_MASK;
        Ok(CompactionPlan { template, choices })
    }
}
