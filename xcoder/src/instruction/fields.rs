use super::{FieldValue, Format, Instruction};
use crate::decoding_table::FieldData;
use crate::error::{GedError, Result};
use crate::restrictions::{self, ValueType};
use crate::table::TableId;
use crate::FieldId;

impl<'m> Instruction<'m> {
    /// Reads a field, from the native buffer when the field exists there and
    /// from the compact buffer otherwise.
    pub fn get_field<T: FieldValue>(&mut self, field: FieldId, value_type: ValueType) -> Result<T> {
        if field >= self.model.num_fields() {
            return Err(GedError::InvalidField);
        }
        self.ensure_native()?;
        let value = match self.read(Format::Native, field, value_type, T::SIGNED) {
            Err(GedError::InvalidField) if self.is_compact_valid() => {
                self.read(Format::Compact, field, value_type, T::SIGNED)
            }
            result => result,
        }?;
        Ok(T::from_raw(value))
    }

    pub fn get_unsigned_field(&mut self, field: FieldId) -> Result<u32> {
        self.get_field(field, ValueType::Processed)
    }

    pub fn get_signed_field(&mut self, field: FieldId) -> Result<i32> {
        self.get_field(field, ValueType::Processed)
    }

    pub fn get_unsigned64_field(&mut self, field: FieldId) -> Result<u64> {
        self.get_field(field, ValueType::Processed)
    }

    pub fn get_signed64_field(&mut self, field: FieldId) -> Result<i64> {
        self.get_field(field, ValueType::Processed)
    }

    /// Field bits without sign extension or restriction handling.
    pub fn get_raw_field(&mut self, field: FieldId) -> Result<u32> {
        self.get_field(field, ValueType::Encoded)
    }

    /// Writes a field into every valid buffer that can represent it.
    ///
    /// A buffer that rejects the write while the other accepts it becomes
    /// stale. `InvalidValue` is reported over `InvalidField` when neither
    /// buffer accepts the write.
    pub fn set_field<T: FieldValue>(
        &mut self,
        field: FieldId,
        value_type: ValueType,
        value: T,
    ) -> Result<()> {
        if field >= self.model.num_fields() {
            return Err(GedError::InvalidField);
        }
        let raw = value.to_raw();
        let (native_valid, compact_valid) = (self.is_native_valid(), self.is_compact_valid());
        let mut write = |format: Format| self.write(format, field, value_type, raw, T::SIGNED);
        let native = native_valid.then(|| write(Format::Native));
        let compact = compact_valid.then(|| write(Format::Compact));

        let native_ok = matches!(native, Some(Ok(())));
        let compact_ok = matches!(compact, Some(Ok(())));
        if native_ok && !compact_ok {
            self.status.invalidate(Format::Compact);
        }
        if compact_ok && !native_ok {
            self.status.invalidate(Format::Native);
        }
        if native_ok || compact_ok {
            self.status.clear_encoded();
            return Ok(());
        }

        let rejected =
            |result: &Option<Result<()>>| matches!(result, Some(Err(GedError::InvalidValue)));
        if rejected(&native) || rejected(&compact) {
            Err(GedError::InvalidValue)
        } else {
            Err(GedError::InvalidField)
        }
    }

    pub fn set_unsigned_field(&mut self, field: FieldId, value: u32) -> Result<()> {
        self.set_field(field, ValueType::Processed, value)
    }

    pub fn set_signed_field(&mut self, field: FieldId, value: i32) -> Result<()> {
        self.set_field(field, ValueType::Processed, value)
    }

    pub fn set_unsigned64_field(&mut self, field: FieldId, value: u64) -> Result<()> {
        self.set_field(field, ValueType::Processed, value)
    }

    pub fn set_signed64_field(&mut self, field: FieldId, value: i64) -> Result<()> {
        self.set_field(field, ValueType::Processed, value)
    }

    /// Writes field bits as given, bypassing enumerations and other restrictions.
    pub fn set_raw_field(&mut self, field: FieldId, value: u32) -> Result<()> {
        self.set_field(field, ValueType::Encoded, value)
    }

    /// Encoded width of a field in bits, 0 when neither format has it.
    pub fn field_size(&self, field: FieldId) -> u32 {
        self.field_data(Format::Native, field)
            .or_else(|| self.field_data(Format::Compact, field))
            .map_or(0, |data| data.bit_size as u32)
    }

    /// Width of the value a field holds, which is narrower than its encoded
    /// size for variable-width fields.
    pub fn field_width(&self, field: FieldId) -> Result<u32> {
        self.field_data(Format::Native, field)
            .or_else(|| self.field_data(Format::Compact, field))
            .map(restrictions::field_width)
            .ok_or(GedError::InvalidField)
    }

    /// Whether the field has a position in either format.
    pub fn has_field(&self, field: FieldId) -> bool {
        self.field_size(field) > 0
    }

    pub(crate) fn decoding_table(&self, format: Format) -> Option<TableId> {
        match format {
            Format::Native => Some(self.tables.native_decoding),
            Format::Compact => self.tables.compact.as_ref().map(|compact| compact.decoding),
        }
    }

    pub(crate) fn field_data(&self, format: Format, field: FieldId) -> Option<&'m FieldData> {
        let table = self.decoding_table(format)?;
        self.key_reader().field_data(table, field)
    }

    pub(crate) fn ensure_native(&mut self) -> Result<()> {
        if !self.is_native_valid() {
            self.build_native_from_compact()?;
        }
        Ok(())
    }

    pub(crate) fn read(
        &self,
        format: Format,
        field: FieldId,
        value_type: ValueType,
        signed: bool,
    ) -> Result<u64> {
        let data = self.field_data(format, field).ok_or(GedError::InvalidField)?;
        let raw = data.extract(self.words(format));
        match value_type {
            ValueType::Encoded => Ok(raw),
            ValueType::Processed => {
                restrictions::decode_value(data, &self.model.enum_tables, raw, signed)
            }
        }
    }

    fn write(
        &mut self,
        format: Format,
        field: FieldId,
        value_type: ValueType,
        raw: u64,
        signed: bool,
    ) -> Result<()> {
        let data = self.field_data(format, field).ok_or(GedError::InvalidField)?;
        let enums = &self.model.enum_tables;
        let encoded = restrictions::encode_value(data, enums, raw, signed, value_type)?;
        match format {
            Format::Native => data.store(&mut self.native, encoded),
            Format::Compact => data.store(&mut self.compact, encoded),
        }
    }
}
