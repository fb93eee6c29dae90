//! Subcommands of `gedtool`

mod compact;
mod decode;
mod disasm;
mod location;

pub use compact::CompactCmd;
pub use decode::DecodeCmd;
pub use disasm::DisasmCmd;
pub use location::LocationCmd;

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;

use ged_xcoder::{FieldId, Instruction, ModelData, ModelDatabase};

use crate::config::Settings;

#[derive(Subcommand)]
pub enum Commands {
    Decode(DecodeCmd),
    Disasm(DisasmCmd),
    Compact(CompactCmd),
    Location(LocationCmd),
}

impl Commands {
    pub fn run(&self, settings: &Settings) -> Result<()> {
        match self {
            Commands::Decode(cmd) => cmd.run(settings),
            Commands::Disasm(cmd) => cmd.run(settings),
            Commands::Compact(cmd) => cmd.run(settings),
            Commands::Location(cmd) => cmd.run(settings),
        }
    }
}

/// Parses bytes written in memory order, e.g. `01 5a 03 22` or `015a0322`.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if digits.len() % 2 != 0 {
        return Err(anyhow!("Odd number of hex digits in {text:?}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|at| {
            let pair = digits.get(at..at + 2).ok_or_else(|| anyhow!("Invalid hex bytes {text:?}"))?;
            u8::from_str_radix(pair, 16).with_context(|| format!("Invalid hex byte {pair:?}"))
        })
        .collect()
}

/// Bytes in memory order, space separated.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect::<Vec<_>>().join(" ")
}

/// Field given by name or id.
pub fn resolve_field(model: &ModelData, text: &str) -> Result<FieldId> {
    if let Ok(id) = text.parse::<FieldId>() {
        if id < model.num_fields() {
            return Ok(id);
        }
        return Err(anyhow!("Model {} has no field {id}", model.name));
    }
    model.field_by_name(text).ok_or_else(|| anyhow!("Model {} has no field {text}", model.name))
}

fn decode_arg<'m>(
    db: &'m ModelDatabase,
    settings: &Settings,
    hex: &str,
) -> Result<Instruction<'m>> {
    let model_id = settings.model_id(db)?;
    let bytes = parse_hex(hex)?;
    Instruction::decode(db, model_id, &bytes)
        .with_context(|| format!("Failed to decode {}", format_bytes(&bytes)))
}
