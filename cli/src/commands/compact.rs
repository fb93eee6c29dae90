use anyhow::{Context, Result};

use ged_xcoder::{Format, GedError};

use super::format_bytes;
use crate::config::Settings;

#[derive(clap::Args)]
#[command(about = "Compact one instruction and count its compact encodings")]
pub struct CompactCmd {
    /// Instruction bytes in hex, memory order
    pub bytes: String,

    /// Print every compact encoding
    #[clap(long)]
    pub all: bool,
}

impl CompactCmd {
    pub fn run(&self, settings: &Settings) -> Result<()> {
        let db = settings.load_models()?;
        let mut instruction = super::decode_arg(&db, settings, &self.bytes)?;

        let native = instruction.to_bytes(Format::Native).context("Failed to encode native form")?;
        println!("native:  {}", format_bytes(&native));
        match instruction.to_bytes(Format::Compact) {
            Ok(compact) => println!("compact: {}", format_bytes(&compact)),
            Err(GedError::NoCompactForm) => {
                println!("{} has no compact form", instruction.mnemonic());
                return Ok(());
            }
            Err(err) => return Err(err).context("Failed to compact instruction"),
        }

        println!("compact encodings: {}", instruction.count_compacted()?);
        if self.all {
            let encodings = instruction.retrieve_all_compacted_formats()?;
            for (index, encoding) in encodings.iter().enumerate() {
                println!("  {index}: {}", format_bytes(encoding));
            }
        }
        Ok(())
    }
}
