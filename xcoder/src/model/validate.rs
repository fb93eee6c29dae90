//! Structural checks run once per model at load time.

use std::collections::{BTreeSet, HashSet};

use crate::decoding_table::{FieldData, FieldEntry, FieldLocation};
use crate::encoding_masks::MasksEntry;
use crate::error::{GedError, Result};
use crate::interpreters::Interpreter;
use crate::mapping_table::{FragmentSource, MappingEntry, MappingTarget};
use crate::model::ModelData;
use crate::position::PositionFragment;
use crate::restrictions::Restriction;
use crate::table::{Chained, Table, TableId};
use crate::{COMPACT_INS_DWORDS, DWORD_BITS, MAX_OPCODES, NATIVE_INS_DWORDS};

/// Bits addressable in a compaction entry or an interpreted base value.
const SOURCE_BITS: u32 = 64;

pub(super) fn validate(model: &ModelData) -> Result<()> {
    let checker = Checker { model };
    checker.run()
}

struct Checker<'a> {
    model: &'a ModelData,
}

impl Checker<'_> {
    fn error(&self, message: impl std::fmt::Display) -> GedError {
        GedError::MalformedTable(format!("model {}: {message}", self.model.name))
    }

    fn run(&self) -> Result<()> {
        let model = self.model;
        if model.fields.is_empty() {
            return Err(self.error("no fields defined"));
        }

        let cyclic = |kind: &str, id: TableId| self.error(format!("{kind} table {id} is cyclic"));
        check_acyclic(&model.decoding_tables).map_err(|id| cyclic("decoding", id))?;
        check_acyclic(&model.mapping_tables).map_err(|id| cyclic("mapping", id))?;
        check_acyclic(&model.masks_tables).map_err(|id| cyclic("masks", id))?;

        let native_bits = (NATIVE_INS_DWORDS as u32) * DWORD_BITS;
        let compact_bits = (COMPACT_INS_DWORDS as u32) * DWORD_BITS;
        let mut opcodes = BTreeSet::new();
        let mut decoding_seen = HashSet::new();
        let mut mapping_seen = HashSet::new();
        let mut masks_seen = HashSet::new();

        for (raw, tables) in &model.opcodes {
            if *raw as usize >= MAX_OPCODES {
                return Err(self.error(format!("raw opcode {raw:#x} out of range")));
            }
            if !opcodes.insert(tables.opcode) {
                return Err(self.error(format!("opcode {} defined twice", tables.opcode)));
            }
            self.decoding(tables.native_decoding, native_bits, &mut decoding_seen)?;
            if let Some(masks) = tables.native_masks {
                self.masks(masks, NATIVE_INS_DWORDS, &mut masks_seen)?;
            }
            if let Some(compact) = &tables.compact {
                self.decoding(compact.decoding, compact_bits, &mut decoding_seen)?;
                self.mapping(compact.mapping, native_bits, &mut mapping_seen)?;
                if let Some(masks) = compact.masks {
                    self.masks(masks, COMPACT_INS_DWORDS, &mut masks_seen)?;
                }
            }
        }

        for pseudo in &model.pseudo_fields {
            self.interpreter(&pseudo.interpreter)?;
        }
        Ok(())
    }

    fn table<'t, E>(&self, arena: &'t [Table<E>], id: TableId, kind: &str) -> Result<&'t Table<E>> {
        arena
            .get(id.as_usize())
            .ok_or_else(|| self.error(format!("{kind} table {id} does not exist")))
    }

    fn field(&self, field: u32) -> Result<()> {
        if field >= self.model.num_fields() {
            return Err(self.error(format!("field {field} does not exist")));
        }
        Ok(())
    }

    fn position(&self, position: &PositionFragment, limit: u32) -> Result<()> {
        if position.high_bit() >= limit {
            return Err(self.error(format!(
                "position {}:{} exceeds {limit} bits",
                position.low_bit(),
                position.high_bit()
            )));
        }
        Ok(())
    }

    fn decoding(&self, id: TableId, limit: u32, seen: &mut HashSet<(TableId, u32)>) -> Result<()> {
        if !seen.insert((id, limit)) {
            return Ok(());
        }
        for entry in self.table(&self.model.decoding_tables, id, "decoding")?.entries() {
            match entry {
                FieldEntry::Explicit(data) => self.field_data(data, limit)?,
                FieldEntry::NextTable { key, table } => {
                    self.field(*key)?;
                    self.decoding(*table, limit, seen)?;
                }
                FieldEntry::NotSupported => {}
            }
        }
        Ok(())
    }

    fn field_data(&self, data: &FieldData, limit: u32) -> Result<()> {
        let bit_size = data.bit_size as u32;
        if bit_size > 64 {
            return Err(self.error(format!("field width {bit_size} exceeds 64 bits")));
        }
        if let FieldLocation::Fixed(value) = data.location {
            if (value as u64) > crate::position::bits_to_max_value(bit_size) {
                return Err(self.error(format!("fixed value {value:#x} exceeds {bit_size} bits")));
            }
        }
        for position in data.fragments() {
            self.position(position, limit)?;
        }
        for restriction in &data.restrictions {
            match restriction {
                Restriction::Enum { table } => {
                    if table.as_usize() >= self.model.enum_tables.len() {
                        return Err(self.error(format!("enum table {table} does not exist")));
                    }
                }
                Restriction::FieldType { bits, duplicate, .. } => {
                    let stored = if *duplicate { 2 * *bits as u32 } else { *bits as u32 };
                    if *bits == 0 || stored > bit_size {
                        return Err(self.error(format!(
                            "field type of {stored} bits in a {bit_size}-bit field"
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn mapping(&self, id: TableId, limit: u32, seen: &mut HashSet<TableId>) -> Result<()> {
        if !seen.insert(id) {
            return Ok(());
        }
        for entry in self.table(&self.model.mapping_tables, id, "mapping")?.entries() {
            match entry {
                MappingEntry::Value { target } => self.target(target, limit)?,
                MappingEntry::Index { target, table } => {
                    self.target(target, limit)?;
                    if table.as_usize() >= self.model.compaction_tables.len() {
                        return Err(self.error(format!("compaction table {table} does not exist")));
                    }
                }
                MappingEntry::NextTable { key, table } => {
                    self.field(*key)?;
                    self.mapping(*table, limit, seen)?;
                }
                MappingEntry::NoMapping | MappingEntry::NotSupported => {}
            }
        }
        Ok(())
    }

    fn target(&self, target: &MappingTarget, limit: u32) -> Result<()> {
        match target {
            MappingTarget::Consecutive { to, .. } => self.position(to, limit),
            MappingTarget::Fragmented(fragments) => {
                for fragment in fragments {
                    self.position(&fragment.to, limit)?;
                    match &fragment.source {
                        FragmentSource::OneToOne { from } => self.position(from, SOURCE_BITS)?,
                        FragmentSource::Replicate { from } => {
                            self.position(from, SOURCE_BITS)?;
                            if fragment.to.size() % from.size() != 0 {
                                return Err(self.error(format!(
                                    "replicated fragment of {} bits does not divide {} bits",
                                    from.size(),
                                    fragment.to.size()
                                )));
                            }
                        }
                        FragmentSource::Fixed { .. } => {}
                    }
                }
                Ok(())
            }
        }
    }

    fn masks(
        &self,
        id: TableId,
        dwords: usize,
        seen: &mut HashSet<(TableId, usize)>,
    ) -> Result<()> {
        if !seen.insert((id, dwords)) {
            return Ok(());
        }
        for entry in self.table(&self.model.masks_tables, id, "masks")?.entries() {
            match entry {
                MasksEntry::Masks { or, and } => {
                    if or.len() != dwords || and.len() != dwords {
                        let message = format!("masks table {id} needs {dwords} words per mask");
                        return Err(self.error(message));
                    }
                }
                MasksEntry::NextTable { key, table } => {
                    self.field(*key)?;
                    self.masks(*table, dwords, seen)?;
                }
                MasksEntry::NoMasks => {}
            }
        }
        Ok(())
    }

    fn interpreter(&self, interpreter: &Interpreter) -> Result<()> {
        match interpreter {
            Interpreter::Position { base, field } => {
                self.field(*base)?;
                self.field_data(field, SOURCE_BITS)
            }
            Interpreter::ReEnum { base, table } => {
                self.field(*base)?;
                if table.as_usize() >= self.model.enum_tables.len() {
                    return Err(self.error(format!("enum table {table} does not exist")));
                }
                Ok(())
            }
            Interpreter::Collect { parts } => {
                for part in parts {
                    self.field(part.field)?;
                    if part.offset >= 64 {
                        let message = format!("collect offset {} exceeds 63", part.offset);
                        return Err(self.error(message));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Finds a table that can reach itself through `NextTable` links.
fn check_acyclic<E: Chained>(arena: &[Table<E>]) -> std::result::Result<(), TableId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit<E: Chained>(
        arena: &[Table<E>],
        marks: &mut [Mark],
        id: usize,
    ) -> std::result::Result<(), TableId> {
        match marks[id] {
            Mark::Done => return Ok(()),
            Mark::Active => return Err(TableId::new(id as u32)),
            Mark::New => {}
        }
        marks[id] = Mark::Active;
        for (_, child) in arena[id].entries().iter().filter_map(E::next_table) {
            // Dangling links are reported by the per-kind checks.
            if child.as_usize() < arena.len() {
                visit(arena, marks, child.as_usize())?;
            }
        }
        marks[id] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::New; arena.len()];
    (0..arena.len()).try_for_each(|id| visit(arena, &mut marks, id))
}
