//! Disassembly blocks
//!
//! A syntax file mirrors the model database: one table per model, matched
//! by model name.
//!
//! ```json
//! { "models": [ { "model": "demo", "opcodes": { "1": [
//!     { "kind": "mnemonic" },
//!     { "kind": "field", "field": 2, "prefix": " r" }
//! ] } } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ged_xcoder::{FieldId, InterpreterId};

use crate::Result;

/// How a field value is printed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    #[default]
    Decimal,
    /// Sign-extended to the field width.
    Signed,
    Hex,
    /// Indexed by the raw value.
    Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Mnemonic,
    Text {
        text: String,
    },
    Field {
        field: FieldId,
        #[serde(default)]
        format: ValueFormat,
        /// Skipped, prefix and suffix included, when the instruction lacks the field.
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
    Interpreted {
        id: InterpreterId,
        #[serde(default)]
        format: ValueFormat,
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
}

/// Blocks of every raw opcode of one model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTable {
    /// Name of the model the table belongs to.
    pub model: String,
    pub opcodes: BTreeMap<u8, Vec<Block>>,
}

impl SyntaxTable {
    pub fn blocks(&self, raw_opcode: u8) -> Option<&[Block]> {
        self.opcodes.get(&raw_opcode).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDatabase {
    pub models: Vec<SyntaxTable>,
}

impl SyntaxDatabase {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn table(&self, model: &str) -> Option<&SyntaxTable> {
        self.models.iter().find(|table| table.model.eq_ignore_ascii_case(model))
    }
}
