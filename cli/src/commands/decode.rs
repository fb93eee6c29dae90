use anyhow::Result;

use ged_xcoder::{FieldId, GedError, Instruction, ValueType};

use crate::config::Settings;

#[derive(clap::Args)]
#[command(about = "Decode one instruction and print every field it has")]
pub struct DecodeCmd {
    /// Instruction bytes in hex, memory order
    pub bytes: String,
}

impl DecodeCmd {
    pub fn run(&self, settings: &Settings) -> Result<()> {
        let db = settings.load_models()?;
        let mut instruction = super::decode_arg(&db, settings, &self.bytes)?;
        let model = instruction.model();

        println!(
            "{} ({} bytes): {}",
            instruction.mnemonic(),
            instruction.instruction_size(),
            instruction.instruction_bytes()
        );
        let width = model.fields.iter().map(String::len).max().unwrap_or(0);
        for (id, name) in model.fields.iter().enumerate() {
            match field_value(&mut instruction, id as FieldId) {
                Ok(Some(value)) => println!("  {name:<width$} {value}"),
                Ok(None) => {}
                Err(err) => println!("  {name:<width$} <{err}>"),
            }
        }
        Ok(())
    }
}

/// Raw value, followed by the decoded value when they differ. `None` when
/// the instruction has no such field.
fn field_value(
    instruction: &mut Instruction<'_>,
    field: FieldId,
) -> Result<Option<String>, GedError> {
    let raw: u64 = match instruction.get_field(field, ValueType::Encoded) {
        Ok(raw) => raw,
        Err(GedError::InvalidField) => return Ok(None),
        Err(err) => return Err(err),
    };
    let value = instruction.get_unsigned64_field(field)?;
    if value == raw {
        Ok(Some(format!("{raw:#x}")))
    } else {
        Ok(Some(format!("{raw:#x} ({value})")))
    }
}
