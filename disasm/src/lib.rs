//! Renders decoded instructions as assembly text.
//!
//! Every model has a [`SyntaxTable`] listing, per raw opcode, the blocks an
//! instruction is printed with. The [`Disassembler`] walks those blocks and
//! reads each field through the instruction engine.

pub mod disassembler;
pub mod syntax;

pub use disassembler::{Disassembler, Line};
pub use syntax::{Block, SyntaxDatabase, SyntaxTable, ValueFormat};

use ged_xcoder::GedError;

pub type Result<T> = std::result::Result<T, DisasmError>;

#[derive(Debug, thiserror::Error)]
pub enum DisasmError {
    #[error(transparent)]
    Ged(#[from] GedError),

    #[error("No syntax table for model {0}")]
    NoSyntaxTable(String),

    /// A block refers to a field or pseudo field the model does not define.
    #[error("Syntax for {opcode:#x} refers to unknown {kind} {id}")]
    UnknownField { opcode: u8, kind: &'static str, id: u32 },

    #[error("Value {value} has no name")]
    NoName { value: u64 },

    #[error("Failed to parse syntax file: {0}")]
    SyntaxFile(#[from] serde_json::Error),
}
