use super::Format;

/// State of one instruction buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// Does not reflect the current field values.
    #[default]
    Stale,
    /// Reflects the field values.
    Valid,
    /// Reflects the field values and has had its encoding masks applied.
    Encoded,
}

impl BufferState {
    pub const fn is_valid(self) -> bool {
        !matches!(self, BufferState::Stale)
    }

    pub const fn is_encoded(self) -> bool {
        matches!(self, BufferState::Encoded)
    }
}

/// Validity of the native and compact buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    native: BufferState,
    compact: BufferState,
}

impl Status {
    pub const fn get(&self, format: Format) -> BufferState {
        match format {
            Format::Native => self.native,
            Format::Compact => self.compact,
        }
    }

    fn slot(&mut self, format: Format) -> &mut BufferState {
        match format {
            Format::Native => &mut self.native,
            Format::Compact => &mut self.compact,
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Status::default();
    }

    pub(crate) fn mark_valid(&mut self, format: Format) {
        let slot = self.slot(format);
        if *slot == BufferState::Stale {
            *slot = BufferState::Valid;
        }
    }

    pub(crate) fn mark_encoded(&mut self, format: Format) {
        *self.slot(format) = BufferState::Encoded;
    }

    pub(crate) fn invalidate(&mut self, format: Format) {
        *self.slot(format) = BufferState::Stale;
    }

    /// Both buffers lose their encoded state after a field write.
    pub(crate) fn clear_encoded(&mut self) {
        for format in [Format::Native, Format::Compact] {
            let slot = self.slot(format);
            if *slot == BufferState::Encoded {
                *slot = BufferState::Valid;
            }
        }
    }

    /// Neither buffer has been encoded since the last modification.
    pub const fn is_modified(&self) -> bool {
        !self.native.is_encoded() && !self.compact.is_encoded()
    }
}
