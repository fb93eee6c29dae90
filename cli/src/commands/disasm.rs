use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use ged_disasm::{Disassembler, Line};

use crate::config::Settings;

#[derive(clap::Args)]
#[command(about = "Disassemble a binary file or a hex byte string")]
pub struct DisasmCmd {
    /// Path to a binary file, or instruction bytes in hex
    pub input: String,
}

impl DisasmCmd {
    pub fn run(&self, settings: &Settings) -> Result<()> {
        let db = settings.load_models()?;
        let syntax = settings.load_syntax()?;
        let disassembler = Disassembler::new(&db, settings.model_id(&db)?, &syntax)?;

        let path = Path::new(&self.input);
        let bytes = if path.is_file() {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        } else {
            super::parse_hex(&self.input)?
        };

        let lines = disassembler.disassemble_stream(&bytes);
        for line in &lines {
            println!("{:08x}: {line}", line.offset());
        }
        let bad = lines.iter().filter(|line| matches!(line, Line::Bad { .. })).count();
        if bad > 0 {
            tracing::warn!("{bad} of {} instructions could not be disassembled", lines.len());
        }
        Ok(())
    }
}
