use crate::model::ModelId;
use crate::FieldId;

pub type Result<T> = std::result::Result<T, GedError>;

/// Errors reported by the encoder/decoder
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GedError {
    /// The field has no position for the current model, opcode and format.
    #[error("Field is not valid for the current instruction")]
    InvalidField,

    /// The field exists but the value fails one of its restrictions.
    #[error("Value is not valid for the field")]
    InvalidValue,

    #[error("Instruction has no compact form")]
    NoCompactForm,

    /// The compaction tables could not be resolved for these fields.
    #[error("Bad compact encoding, unresolved fields: {unresolved:?}")]
    BadCompactEncoding { unresolved: Vec<FieldId> },

    #[error("Invalid model: {0}")]
    InvalidModel(ModelId),

    #[error("Buffer too short: needed {needed} bytes, got {actual}")]
    BufferTooShort { needed: usize, actual: usize },

    #[error("Opcode {0:#x} is not supported by the model")]
    OpcodeNotSupported(u32),

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Failed to parse model file: {0}")]
    ModelFile(String),
}

impl From<serde_json::Error> for GedError {
    fn from(err: serde_json::Error) -> Self {
        GedError::ModelFile(err.to_string())
    }
}
