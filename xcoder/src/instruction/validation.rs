//! Enumeration of compact encodings, for checking models against hardware

use itertools::Itertools;

use super::{hex_words, Format, Instruction};
use crate::error::Result;
use crate::{COMPACT_INS_DWORDS, COMPACT_INS_SIZE};

impl Instruction<'_> {
    /// Number of distinct compact encodings of the current instruction.
    pub fn count_compacted(&mut self) -> Result<u64> {
        self.encode(Format::Native, None)?;
        let plan = self.compaction_plan()?;
        Ok(plan.choices.iter().map(|choice| choice.indexes.len() as u64).product())
    }

    /// Every compact encoding of the current instruction, with the compact
    /// encoding masks applied. The instruction itself is left unchanged
    /// apart from having its native masks applied.
    pub fn retrieve_all_compacted_formats(&mut self) -> Result<Vec<[u8; COMPACT_INS_SIZE]>> {
        self.encode(Format::Native, None)?;
        let plan = self.compaction_plan()?;
        let masks = self.masks_table(Format::Compact);

        let combinations: Vec<Vec<u64>> = if plan.choices.is_empty() {
            vec![Vec::new()]
        } else {
            plan.choices
                .iter()
                .map(|choice| choice.indexes.iter().copied())
                .multi_cartesian_product()
                .collect()
        };
        tracing::debug!("{} has {} compact encodings", self.mnemonic(), combinations.len());

        combinations
            .into_iter()
            .map(|indexes| {
                let mut words = plan.template;
                for (choice, index) in plan.choices.iter().zip(indexes) {
                    choice.store(&mut words, index)?;
                }
                if let Some(table) = masks {
                    if !self.fold_masks(table, &mut words) {
                        let (words, name) = (hex_words(&words), self.mnemonic());
                        tracing::debug!("compact encoding {words} of {name} is left unmasked");
                    }
                }
                Ok(to_bytes(words))
            })
            .collect()
    }
}

fn to_bytes(words: [u32; COMPACT_INS_DWORDS]) -> [u8; COMPACT_INS_SIZE] {
    let mut bytes = [0u8; COMPACT_INS_SIZE];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    bytes
}
