//! Pseudo fields
//!
//! Some operands are not stored in a field of their own. They are derived from
//! real fields by re-slicing a field's raw bits, translating its value through
//! a second enumeration, or joining several fields into one value.

use serde::{Deserialize, Serialize};

use crate::decoding_table::FieldData;
use crate::error::{GedError, Result};
use crate::instruction::{FieldValue, Instruction};
use crate::restrictions::{self, EnumTable, ValueType};
use crate::table::TableId;
use crate::FieldId;

/// Index into [`ModelData::pseudo_fields`](crate::ModelData::pseudo_fields).
pub type InterpreterId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudoField {
    pub name: String,
    pub interpreter: Interpreter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interpreter {
    /// `field` is positioned over the raw value of `base`, seen as two words.
    Position { base: FieldId, field: FieldData },
    /// The raw value of `base` indexes `table`.
    ReEnum { base: FieldId, table: TableId },
    Collect { parts: Vec<CollectedField> },
}

/// A field contributing its raw value at `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedField {
    pub field: FieldId,
    pub offset: u8,
}

/// Re-slices the raw value of `base` with the positions in `field`.
pub fn interpret_position<T: FieldValue>(
    instruction: &mut Instruction<'_>,
    base: FieldId,
    field: &FieldData,
    value_type: ValueType,
) -> Result<T> {
    let raw: u64 = instruction.get_field(base, ValueType::Encoded)?;
    let words = [raw as u32, (raw >> 32) as u32];
    let value = field.extract(&words);
    let value = match value_type {
        ValueType::Encoded => value,
        ValueType::Processed => {
            restrictions::decode_value(field, &instruction.model().enum_tables, value, T::SIGNED)?
        }
    };
    Ok(T::from_raw(value))
}

/// Value stored at slot `raw` of `table`.
pub fn reinterpret_enum(table: &EnumTable, raw: u64) -> Result<u32> {
    table.lookup(raw).ok_or(GedError::InvalidValue)
}

/// ORs the raw value of every part at its offset.
pub fn collect_fields(instruction: &mut Instruction<'_>, parts: &[CollectedField]) -> Result<u64> {
    parts.iter().try_fold(0u64, |value, part| {
        let raw: u64 = instruction.get_field(part.field, ValueType::Encoded)?;
        Ok(value | (raw << part.offset))
    })
}

impl Instruction<'_> {
    /// Reads the pseudo field `id` of the instruction's model.
    pub fn get_interpreted_field<T: FieldValue>(
        &mut self,
        id: InterpreterId,
        value_type: ValueType,
    ) -> Result<T> {
        let model = self.model();
        let pseudo = model.pseudo_fields.get(id as usize).ok_or(GedError::InvalidField)?;
        match &pseudo.interpreter {
            Interpreter::Position { base, field } => {
                interpret_position(self, *base, field, value_type)
            }
            Interpreter::ReEnum { base, table } => {
                let raw: u64 = self.get_field(*base, ValueType::Encoded)?;
                let table = model.enum_tables.get(table.as_usize()).ok_or(GedError::InvalidValue)?;
                Ok(T::from_raw(reinterpret_enum(table, raw)? as u64))
            }
            Interpreter::Collect { parts } => Ok(T::from_raw(collect_fields(self, parts)?)),
        }
    }
}
