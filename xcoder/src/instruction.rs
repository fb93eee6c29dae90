//! Instruction encode/decode engine
//!
//! An [`Instruction`] holds one instruction in both formats:
//! - native: 16 bytes, every field at its own position
//! - compact: 8 bytes, available for a subset of field values per opcode
//!
//! Writing a field updates whichever buffers can hold the new value and marks
//! the other one stale. Stale buffers are rebuilt from the fresh one the next
//! time they are read or encoded.

mod compaction;
mod fields;
mod location;
mod masks;
mod status;
#[cfg(feature = "validation")]
mod validation;

pub use location::BitLocation;
pub use status::{BufferState, Status};

use std::fmt;

use crate::decoding_table::{FieldData, FieldLocation};
use crate::error::{GedError, Result};
use crate::model::{ModelData, ModelDatabase, ModelId, OpcodeTables};
use crate::table::{self, Chained, Table, TableId};
use crate::{
    FieldId, COMPACT_CONTROL_MASK, COMPACT_INS_DWORDS, COMPACT_INS_SIZE, NATIVE_INS_DWORDS,
    NATIVE_INS_SIZE, OPCODE_MASK,
};

/// Instruction format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// 16-byte encoding
    Native,
    /// 8-byte encoding
    Compact,
}

impl Format {
    pub const fn size(self) -> usize {
        match self {
            Format::Native => NATIVE_INS_SIZE,
            Format::Compact => COMPACT_INS_SIZE,
        }
    }

    pub const fn dwords(self) -> usize {
        match self {
            Format::Native => NATIVE_INS_DWORDS,
            Format::Compact => COMPACT_INS_DWORDS,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Native => write!(f, "native"),
            Format::Compact => write!(f, "compact"),
        }
    }
}

/// Numeric types a field can be read as or written from
pub trait FieldValue: Copy {
    const SIGNED: bool;

    /// Truncating conversion from the engine's 64-bit representation.
    fn from_raw(raw: u64) -> Self;

    /// Two's-complement widening into the engine's 64-bit representation.
    fn to_raw(self) -> u64;
}

macro_rules! impl_field_value {
    ($ty:ty, $signed:expr, $wide:ty) => {
        impl FieldValue for $ty {
            const SIGNED: bool = $signed;

            #[inline(always)]
            fn from_raw(raw: u64) -> Self {
                raw as $ty
            }

            #[inline(always)]
            fn to_raw(self) -> u64 {
                self as $wide as u64
            }
        }
    };
}

impl_field_value!(u32, false, u64);
impl_field_value!(i32, true, i64);
impl_field_value!(u64, false, u64);
impl_field_value!(i64, true, i64);

/// One instruction of a given model
#[derive(Debug, Clone)]
pub struct Instruction<'m> {
    model_id: ModelId,
    model: &'m ModelData,
    opcode: u8,
    tables: &'m OpcodeTables,
    native: [u32; NATIVE_INS_DWORDS],
    compact: [u32; COMPACT_INS_DWORDS],
    status: Status,
}

impl<'m> Instruction<'m> {
    /// Creates an instruction with the given model-independent opcode and all
    /// other fields zero.
    pub fn init(db: &'m ModelDatabase, model_id: ModelId, opcode: u32) -> Result<Self> {
        let model = db.model(model_id)?;
        let (raw, tables) = lookup_opcode(model, opcode)?;
        let mut instruction = Self {
            model_id,
            model,
            opcode: raw,
            tables,
            native: [0; NATIVE_INS_DWORDS],
            compact: [0; COMPACT_INS_DWORDS],
            status: Status::default(),
        };
        instruction.reset_buffers();
        Ok(instruction)
    }

    /// Decodes raw instruction bytes. Eight bytes suffice when the
    /// compaction-control bit is set, sixteen are needed otherwise.
    pub fn decode(db: &'m ModelDatabase, model_id: ModelId, bytes: &[u8]) -> Result<Self> {
        let model = db.model(model_id)?;
        if bytes.len() < COMPACT_INS_SIZE {
            return Err(GedError::BufferTooShort { needed: COMPACT_INS_SIZE, actual: bytes.len() });
        }
        let word0 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let raw = (word0 & OPCODE_MASK) as u8;
        let tables = model.opcode_tables(raw).ok_or(GedError::OpcodeNotSupported(raw as u32))?;

        let mut instruction = Self {
            model_id,
            model,
            opcode: raw,
            tables,
            native: [0; NATIVE_INS_DWORDS],
            compact: [0; COMPACT_INS_DWORDS],
            status: Status::default(),
        };

        let format =
            if word0 & COMPACT_CONTROL_MASK != 0 { Format::Compact } else { Format::Native };
        tracing::debug!("decoding {} ({format}) for model {}", tables.name, model.name);
        match format {
            Format::Compact => {
                instruction.compact = words_from_le(&bytes[..COMPACT_INS_SIZE]);
                instruction.status.mark_valid(Format::Compact);
                instruction.build_native_from_compact()?;
            }
            Format::Native => {
                if bytes.len() < NATIVE_INS_SIZE {
                    return Err(GedError::BufferTooShort {
                        needed: NATIVE_INS_SIZE,
                        actual: bytes.len(),
                    });
                }
                instruction.native = words_from_le(&bytes[..NATIVE_INS_SIZE]);
                instruction.status.mark_valid(Format::Native);
            }
        }
        instruction.apply_masks(format);
        Ok(instruction)
    }

    /// Changes the opcode. Switching to an opcode with different tables clears
    /// every other field.
    pub fn set_opcode(&mut self, opcode: u32) -> Result<()> {
        let (raw, tables) = lookup_opcode(self.model, opcode)?;
        if raw == self.opcode {
            return Ok(());
        }
        let layout_changed = tables.native_decoding != self.tables.native_decoding
            || tables.compact != self.tables.compact;
        self.opcode = raw;
        self.tables = tables;
        if layout_changed {
            self.reset_buffers();
        } else {
            self.native[0] = (self.native[0] & !OPCODE_MASK) | raw as u32;
            self.compact[0] = (self.compact[0] & !OPCODE_MASK) | raw as u32;
            self.status.clear_encoded();
        }
        Ok(())
    }

    fn reset_buffers(&mut self) {
        self.status.clear();
        self.native = [0; NATIVE_INS_DWORDS];
        self.native[0] = self.opcode as u32;
        self.status.mark_valid(Format::Native);
        self.compact = [0; COMPACT_INS_DWORDS];
        if self.tables.compact.is_some() {
            self.compact[0] = COMPACT_CONTROL_MASK | self.opcode as u32;
            self.status.mark_valid(Format::Compact);
        }
    }

    /// Brings `format` up to date, applies its encoding masks and copies it
    /// into `out` when given.
    pub fn encode(&mut self, format: Format, out: Option<&mut [u8]>) -> Result<()> {
        let state = self.status.get(format);
        if !state.is_encoded() {
            if !state.is_valid() {
                match format {
                    Format::Native => self.build_native_from_compact()?,
                    Format::Compact => self.build_compact_from_native()?,
                }
            }
            self.apply_masks(format);
        }
        if let Some(out) = out {
            let bytes = self.raw_bytes(format);
            if out.len() < bytes.len() {
                return Err(GedError::BufferTooShort { needed: bytes.len(), actual: out.len() });
            }
            out[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(())
    }

    /// Encodes `format` and returns its bytes.
    pub fn to_bytes(&mut self, format: Format) -> Result<Vec<u8>> {
        self.encode(format, None)?;
        Ok(self.raw_bytes(format))
    }

    /// Buffer contents as they are, without bringing them up to date.
    pub fn raw_bytes(&self, format: Format) -> Vec<u8> {
        self.words(format).iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    pub fn words(&self, format: Format) -> &[u32] {
        match format {
            Format::Native => &self.native,
            Format::Compact => &self.compact,
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn model(&self) -> &'m ModelData {
        self.model
    }

    /// Model-independent opcode.
    pub fn opcode(&self) -> u32 {
        self.tables.opcode
    }

    pub fn raw_opcode(&self) -> u8 {
        self.opcode
    }

    pub fn mnemonic(&self) -> &'m str {
        &self.tables.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_native_valid(&self) -> bool {
        self.status.get(Format::Native).is_valid()
    }

    pub fn is_compact_valid(&self) -> bool {
        self.status.get(Format::Compact).is_valid()
    }

    pub fn is_native_encoded(&self) -> bool {
        self.status.get(Format::Native).is_encoded()
    }

    pub fn is_compact_encoded(&self) -> bool {
        self.status.get(Format::Compact).is_encoded()
    }

    /// Neither format has been encoded since the last change.
    pub fn is_modified(&self) -> bool {
        self.status.is_modified()
    }

    /// Whether the instruction is currently encoded in compact form.
    pub fn is_compact(&self) -> bool {
        self.is_compact_encoded()
    }

    /// Size in bytes of the current encoding.
    pub fn instruction_size(&self) -> usize {
        if self.is_compact() {
            COMPACT_INS_SIZE
        } else {
            NATIVE_INS_SIZE
        }
    }

    /// Current encoding as hex, most significant word first.
    pub fn instruction_bytes(&self) -> String {
        let format = if self.is_compact() { Format::Compact } else { Format::Native };
        hex_words(self.words(format))
    }

    fn key_reader(&self) -> KeyReader<'m, '_> {
        KeyReader::new(self.model, self.tables.native_decoding, &self.native)
    }
}

fn lookup_opcode(model: &ModelData, opcode: u32) -> Result<(u8, &OpcodeTables)> {
    let raw = model.raw_opcode(opcode).ok_or(GedError::OpcodeNotSupported(opcode))?;
    let tables = model.opcode_tables(raw).ok_or(GedError::OpcodeNotSupported(opcode))?;
    Ok((raw, tables))
}

fn words_from_le<const N: usize>(bytes: &[u8]) -> [u32; N] {
    std::array::from_fn(|i| {
        u32::from_le_bytes([bytes[4 * i], bytes[4 * i + 1], bytes[4 * i + 2], bytes[4 * i + 3]])
    })
}

/// `0x` followed by the words from high to low, eight digits each.
pub fn hex_words(words: &[u32]) -> String {
    let mut text = String::from("0x");
    for word in words.iter().rev() {
        text.push_str(&format!("{word:08x}"));
    }
    text
}

/// Reads dependee field values out of a native buffer
///
/// During decompaction the native buffer is only partially written; bits
/// still set in `unwritten` are not trusted and fields covering them cannot
/// serve as keys yet.
pub(crate) struct KeyReader<'m, 'b> {
    model: &'m ModelData,
    table: TableId,
    words: &'b [u32],
    unwritten: Option<&'b [u32]>,
}

impl<'m, 'b> KeyReader<'m, 'b> {
    pub(crate) fn new(model: &'m ModelData, table: TableId, words: &'b [u32]) -> Self {
        Self { model, table, words, unwritten: None }
    }

    pub(crate) fn with_unwritten(mut self, unwritten: &'b [u32]) -> Self {
        self.unwritten = Some(unwritten);
        self
    }

    /// Terminal entry of `arena[table][index]`.
    pub(crate) fn entry<E: Chained>(
        &self,
        arena: &'m [Table<E>],
        table: TableId,
        index: usize,
    ) -> Option<&'m E> {
        let first = arena.get(table.as_usize())?.get(index)?;
        self.follow(arena, first)
    }

    pub(crate) fn follow<E: Chained>(&self, arena: &'m [Table<E>], first: &'m E) -> Option<&'m E> {
        table::resolve(arena, first, |key| self.raw(key, 1))
    }

    /// Position data of `field` in a decoding table.
    pub(crate) fn field_data(&self, table: TableId, field: FieldId) -> Option<&'m FieldData> {
        self.entry(&self.model.decoding_tables, table, field as usize)?.data()
    }

    fn raw(&self, field: FieldId, depth: u32) -> Option<u64> {
        if depth > self.model.num_fields() {
            tracing::warn!("field {field} depends on itself through its decoding chain");
            return None;
        }
        let arena = &self.model.decoding_tables;
        let first = arena.get(self.table.as_usize())?.get(field as usize)?;
        let data = table::resolve(arena, first, |key| self.raw(key, depth + 1))?.data()?;
        if let FieldLocation::Fixed(value) = data.location {
            return Some(value as u64);
        }
        if let Some(unwritten) = self.unwritten {
            if data.extract(unwritten) != 0 {
                return None;
            }
        }
        Some(data.extract(self.words))
    }
}
