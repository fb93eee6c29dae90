use super::{Format, Instruction};
use crate::encoding_masks;
use crate::table::TableId;
use crate::NATIVE_INS_DWORDS;

impl Instruction<'_> {
    /// Forces the reserved bits of `format` and marks it encoded.
    ///
    /// Mask groups may depend on field values. When such a value cannot be
    /// read the buffer is left untouched and keeps its current state.
    pub(crate) fn apply_masks(&mut self, format: Format) {
        if let Some(table) = self.masks_table(format) {
            let dwords = format.dwords();
            let mut words = [0u32; NATIVE_INS_DWORDS];
            words[..dwords].copy_from_slice(self.words(format));
            if !self.fold_masks(table, &mut words[..dwords]) {
                return;
            }
            match format {
                Format::Native => self.native.copy_from_slice(&words[..dwords]),
                Format::Compact => self.compact.copy_from_slice(&words[..dwords]),
            }
        }
        self.status.mark_encoded(format);
    }

    pub(crate) fn masks_table(&self, format: Format) -> Option<TableId> {
        match format {
            Format::Native => self.tables.native_masks,
            Format::Compact => self.tables.compact.as_ref().and_then(|compact| compact.masks),
        }
    }

    /// Applies every group of a top-level masks table to `words`.
    ///
    /// Group keys are read from the native buffer in both formats. When a
    /// key cannot be read `words` is left as it was and `false` is returned.
    pub(crate) fn fold_masks(&self, table: TableId, words: &mut [u32]) -> bool {
        let arena = &self.model.masks_tables;
        let Some(top) = arena.get(table.as_usize()) else {
            return false;
        };
        let reader = self.key_reader();
        let mut buffer = [0u32; NATIVE_INS_DWORDS];
        let masked = &mut buffer[..words.len()];
        masked.copy_from_slice(words);
        for group in encoding_masks::groups(top) {
            let Some(entry) = reader.follow(arena, group) else {
                let name = self.mnemonic();
                tracing::warn!("masks of {name} depend on a field that cannot be decoded");
                return false;
            };
            entry.apply(masked);
        }
        words.copy_from_slice(masked);
        true
    }

    /// The native masks folded over an all-zero buffer: bits set here are
    /// forced to one in every native encoding.
    pub(crate) fn native_or_mask(&self) -> [u32; NATIVE_INS_DWORDS] {
        let mut mask = [0; NATIVE_INS_DWORDS];
        if let Some(table) = self.tables.native_masks {
            if !self.fold_masks(table, &mut mask) {
                tracing::debug!("no native or-mask for {}, no bits are ignored", self.mnemonic());
            }
        }
        mask
    }
}
