//! Per-generation table database
//!
//! A [`ModelData`] holds every table one hardware generation needs. Tables are
//! stored in per-kind arenas and refer to each other by [`TableId`]. Models are
//! only reachable through a [`ModelDatabase`], which validates them once so the
//! instruction engine can index tables without further checks.

mod validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decoding_table::DecodingTable;
use crate::encoding_masks::MasksTable;
use crate::error::{GedError, Result};
use crate::interpreters::PseudoField;
use crate::mapping_table::{CompactionTable, MappingTable};
use crate::restrictions::EnumTable;
use crate::table::TableId;
use crate::FieldId;

/// Type representing a model identifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub u32);

impl ModelId {
    pub const fn new(id: u32) -> Self {
        ModelId(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<ModelId> for usize {
    fn from(id: ModelId) -> Self {
        id.0 as usize
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tables of one raw opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeTables {
    /// Model-independent opcode enumerator.
    pub opcode: u32,
    pub name: String,
    pub native_decoding: TableId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_masks: Option<TableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact: Option<CompactTables>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactTables {
    pub decoding: TableId,
    pub mapping: TableId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masks: Option<TableId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelData {
    pub name: String,
    /// Field names, indexed by field id.
    pub fields: Vec<String>,
    /// Keyed by raw opcode.
    pub opcodes: BTreeMap<u8, OpcodeTables>,
    #[serde(default)]
    pub decoding_tables: Vec<DecodingTable>,
    #[serde(default)]
    pub mapping_tables: Vec<MappingTable>,
    #[serde(default)]
    pub masks_tables: Vec<MasksTable>,
    #[serde(default)]
    pub compaction_tables: Vec<CompactionTable>,
    #[serde(default)]
    pub enum_tables: Vec<EnumTable>,
    #[serde(default)]
    pub pseudo_fields: Vec<PseudoField>,
}

impl ModelData {
    pub fn num_fields(&self) -> u32 {
        self.fields.len() as u32
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.fields.get(field as usize).map(String::as_str)
    }

    pub fn field_by_name(&self, name: &str) -> Option<FieldId> {
        self.fields
            .iter()
            .position(|field| field.eq_ignore_ascii_case(name))
            .map(|id| id as FieldId)
    }

    pub fn opcode_tables(&self, raw_opcode: u8) -> Option<&OpcodeTables> {
        self.opcodes.get(&raw_opcode)
    }

    /// Raw encoding of a model-independent opcode.
    pub fn raw_opcode(&self, opcode: u32) -> Option<u8> {
        self.opcodes.iter().find(|(_, tables)| tables.opcode == opcode).map(|(raw, _)| *raw)
    }

    pub fn opcode_by_name(&self, name: &str) -> Option<u32> {
        self.opcodes
            .values()
            .find(|tables| tables.name.eq_ignore_ascii_case(name))
            .map(|tables| tables.opcode)
    }

    pub fn pseudo_field_by_name(&self, name: &str) -> Option<u32> {
        self.pseudo_fields
            .iter()
            .position(|pseudo| pseudo.name.eq_ignore_ascii_case(name))
            .map(|id| id as u32)
    }
}

/// Validated set of models, addressed by [`ModelId`]
#[derive(Debug, Clone, Default)]
pub struct ModelDatabase {
    models: Vec<ModelData>,
}

#[derive(Deserialize)]
struct ModelFile {
    models: Vec<ModelData>,
}

impl ModelDatabase {
    pub fn new(models: Vec<ModelData>) -> Result<Self> {
        for model in &models {
            validate::validate(model)?;
            tracing::debug!(
                "Loaded model {} with {} fields and {} opcodes",
                model.name,
                model.fields.len(),
                model.opcodes.len()
            );
        }
        Ok(Self { models })
    }

    /// Parses `{ "models": [...] }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(json)?;
        Self::new(file.models)
    }

    pub fn model(&self, id: ModelId) -> Result<&ModelData> {
        self.models.get(id.as_usize()).ok_or(GedError::InvalidModel(id))
    }

    pub fn model_by_name(&self, name: &str) -> Option<ModelId> {
        self.models
            .iter()
            .position(|model| model.name.eq_ignore_ascii_case(name))
            .map(|id| ModelId::new(id as u32))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &ModelData)> {
        self.models.iter().enumerate().map(|(id, model)| (ModelId::new(id as u32), model))
    }
}
