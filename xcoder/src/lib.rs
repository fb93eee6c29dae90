//! Table-driven encoder/decoder for GPU instructions.
//!
//! Every hardware generation ("model") describes its instructions with a set of
//! read-only tables: where each logical field lives in the 16-byte native
//! format, how the 8-byte compact format maps onto it, which reserved bits must
//! be forced on or off, and which values a field may legally take. The
//! [`Instruction`] type walks those tables to read and write fields, and to
//! convert between the two formats.

pub mod decoding_table;
pub mod encoding_masks;
pub mod error;
pub mod instruction;
pub mod interpreters;
pub mod mapping_table;
pub mod model;
pub mod position;
pub mod restrictions;
pub mod table;

pub use decoding_table::{FieldData, FieldEntry, FieldLocation};
pub use encoding_masks::MasksEntry;
pub use error::{GedError, Result};
pub use instruction::{hex_words, BitLocation, BufferState, FieldValue, Format, Instruction, Status};
pub use interpreters::{CollectedField, Interpreter, InterpreterId, PseudoField};
pub use mapping_table::{
    CompactionTable, FragmentSource, MappingEntry, MappingFragment, MappingTarget,
};
pub use model::{CompactTables, ModelData, ModelDatabase, ModelId, OpcodeTables};
pub use position::PositionFragment;
pub use restrictions::{EnumTable, Restriction, ValueType};
pub use table::{Table, TableId};

use static_assertions::const_assert_eq;

/// Identifier of a logical instruction field within a model.
pub type FieldId = u32;

/// The opcode is field zero in every model.
pub const OPCODE_FIELD: FieldId = 0;

pub const DWORD_BITS: u32 = 32;
pub const NATIVE_INS_SIZE: usize = 16;
pub const COMPACT_INS_SIZE: usize = 8;
pub const NATIVE_INS_DWORDS: usize = NATIVE_INS_SIZE / 4;
pub const COMPACT_INS_DWORDS: usize = COMPACT_INS_SIZE / 4;

/// Number of raw opcode values (7 opcode bits).
pub const MAX_OPCODES: usize = 128;

/// Opcode bits in word 0 of both formats.
pub const OPCODE_MASK: u32 = 0x0000_007f;
/// Compaction-control bit in word 0.
pub const COMPACT_CONTROL_MASK: u32 = 0x2000_0000;

const_assert_eq!(NATIVE_INS_DWORDS, 4);
const_assert_eq!(COMPACT_INS_DWORDS, 2);
const_assert_eq!(OPCODE_MASK as usize + 1, MAX_OPCODES);
