use std::fmt;

use ged_xcoder::{
    FieldId, FieldValue, GedError, Instruction, InterpreterId, ModelDatabase, ModelId, ValueType,
    COMPACT_CONTROL_MASK, COMPACT_INS_SIZE, NATIVE_INS_SIZE,
};

use crate::syntax::{Block, SyntaxDatabase, SyntaxTable, ValueFormat};
use crate::{DisasmError, Result};

/// One entry of a disassembled stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction { offset: usize, size: usize, text: String },
    /// Bytes that could not be decoded or rendered.
    Bad { offset: usize, raw: Vec<u8> },
}

impl Line {
    pub fn offset(&self) -> usize {
        match self {
            Line::Instruction { offset, .. } | Line::Bad { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Instruction { text, .. } => write!(f, "{text}"),
            Line::Bad { raw, .. } => {
                write!(f, "BAD INSTRUCTION (0x")?;
                for byte in raw.iter().rev() {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Operand {
    Field(FieldId),
    Pseudo(InterpreterId),
}

impl Operand {
    fn get<T: FieldValue>(
        self,
        instruction: &mut Instruction<'_>,
        value_type: ValueType,
    ) -> ged_xcoder::Result<T> {
        match self {
            Operand::Field(field) => instruction.get_field(field, value_type),
            Operand::Pseudo(id) => instruction.get_interpreted_field(id, value_type),
        }
    }
}

fn render(
    instruction: &mut Instruction<'_>,
    operand: Operand,
    format: &ValueFormat,
) -> Result<String> {
    let processed = ValueType::Processed;
    let text = match format {
        ValueFormat::Decimal => operand.get::<u64>(instruction, processed)?.to_string(),
        ValueFormat::Signed => operand.get::<i64>(instruction, processed)?.to_string(),
        ValueFormat::Hex => format!("{:#x}", operand.get::<u64>(instruction, processed)?),
        ValueFormat::Names(names) => {
            let value = operand.get::<u64>(instruction, ValueType::Encoded)?;
            let name = usize::try_from(value).ok().and_then(|index| names.get(index));
            name.cloned().ok_or(DisasmError::NoName { value })?
        }
    };
    Ok(text)
}

/// Text renderer for the instructions of one model
pub struct Disassembler<'a> {
    db: &'a ModelDatabase,
    model_id: ModelId,
    syntax: &'a SyntaxTable,
}

impl<'a> Disassembler<'a> {
    /// Picks the syntax table named after the model and checks that its
    /// blocks only refer to fields the model defines.
    pub fn new(
        db: &'a ModelDatabase,
        model_id: ModelId,
        syntax: &'a SyntaxDatabase,
    ) -> Result<Self> {
        let model = db.model(model_id)?;
        let table = syntax
            .table(&model.name)
            .ok_or_else(|| DisasmError::NoSyntaxTable(model.name.clone()))?;

        for (opcode, blocks) in &table.opcodes {
            for block in blocks {
                let unknown = match block {
                    Block::Field { field, .. } if *field >= model.num_fields() => {
                        Some(("field", *field))
                    }
                    Block::Interpreted { id, .. } if *id as usize >= model.pseudo_fields.len() => {
                        Some(("pseudo field", *id))
                    }
                    _ => None,
                };
                if let Some((kind, id)) = unknown {
                    return Err(DisasmError::UnknownField { opcode: *opcode, kind, id });
                }
            }
        }
        Ok(Self { db, model_id, syntax: table })
    }

    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    /// Renders a decoded instruction. Opcodes without syntax print their mnemonic.
    pub fn format(&self, instruction: &mut Instruction<'_>) -> Result<String> {
        if instruction.model_id() != self.model_id {
            return Err(GedError::InvalidModel(instruction.model_id()).into());
        }
        let Some(blocks) = self.syntax.blocks(instruction.raw_opcode()) else {
            tracing::debug!("no syntax for {}", instruction.mnemonic());
            return Ok(instruction.mnemonic().to_string());
        };

        let mut text = String::new();
        for block in blocks {
            let (operand, format, optional, prefix, suffix) = match block {
                Block::Mnemonic => {
                    text.push_str(instruction.mnemonic());
                    continue;
                }
                Block::Text { text: literal } => {
                    text.push_str(literal);
                    continue;
                }
                Block::Field { field, format, optional, prefix, suffix } => {
                    (Operand::Field(*field), format, *optional, prefix, suffix)
                }
                Block::Interpreted { id, format, optional, prefix, suffix } => {
                    (Operand::Pseudo(*id), format, *optional, prefix, suffix)
                }
            };
            match render(instruction, operand, format) {
                Ok(value) => {
                    text.push_str(prefix);
                    text.push_str(&value);
                    text.push_str(suffix);
                }
                Err(DisasmError::Ged(GedError::InvalidField)) if optional => {}
                Err(err) => return Err(err),
            }
        }
        Ok(text)
    }

    /// Decodes and renders one instruction.
    pub fn disassemble(&self, bytes: &[u8]) -> Result<String> {
        let mut instruction = Instruction::decode(self.db, self.model_id, bytes)?;
        self.format(&mut instruction)
    }

    /// Disassembles back-to-back instructions, 8 or 16 bytes each depending on
    /// their compaction-control bit. Undecodable instructions become
    /// [`Line::Bad`] and decoding goes on with the next one.
    pub fn disassemble_stream(&self, bytes: &[u8]) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let rest = &bytes[offset..];
            if rest.len() < COMPACT_INS_SIZE {
                lines.push(Line::Bad { offset, raw: rest.to_vec() });
                break;
            }
            let word0 = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            let size =
                if word0 & COMPACT_CONTROL_MASK != 0 { COMPACT_INS_SIZE } else { NATIVE_INS_SIZE };
            let Some(raw) = rest.get(..size) else {
                lines.push(Line::Bad { offset, raw: rest.to_vec() });
                break;
            };

            match self.disassemble(raw) {
                Ok(text) => lines.push(Line::Instruction { offset, size, text }),
                Err(err) => {
                    tracing::debug!("bad instruction at offset {offset:#x}: {err}");
                    lines.push(Line::Bad { offset, raw: raw.to_vec() });
                }
            }
            offset += size;
        }
        lines
    }
}
