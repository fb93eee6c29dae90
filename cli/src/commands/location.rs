use anyhow::Result;

use ged_xcoder::GedError;

use crate::config::Settings;

#[derive(clap::Args)]
#[command(about = "Show where the bits of a field are stored")]
pub struct LocationCmd {
    /// Instruction bytes in hex, memory order
    pub bytes: String,

    /// Field name or id
    pub field: String,
}

impl LocationCmd {
    pub fn run(&self, settings: &Settings) -> Result<()> {
        let db = settings.load_models()?;
        let mut instruction = super::decode_arg(&db, settings, &self.bytes)?;
        let field = super::resolve_field(instruction.model(), &self.field)?;

        match instruction.print_field_bit_location(field) {
            Ok(()) | Err(GedError::InvalidField) => {}
            Err(err) => return Err(err.into()),
        }
        // Only the native layout has fragments to list
        if let Ok(locations) = instruction.query_field_bit_location(field) {
            let packed: Vec<String> =
                locations.iter().map(|location| format!("{:#010x}", location.packed())).collect();
            println!("native locations: {}", packed.join(" "));
        }
        Ok(())
    }
}
