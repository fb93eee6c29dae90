mod common;

use common::*;
use ged_xcoder::{BufferState, Format, GedError, Instruction, ModelId, ValueType};

#[test]
fn test_init_sets_opcode_and_compaction_bit() {
    let db = database();
    let ins = Instruction::init(&db, DEMO, MOV).unwrap();

    assert_eq!(ins.raw_opcode(), MOV_RAW);
    assert_eq!(ins.opcode(), MOV);
    assert_eq!(ins.mnemonic(), "mov");
    assert_eq!(ins.words(Format::Native), &[0x01, 0, 0, 0]);
    assert_eq!(ins.words(Format::Compact), &[0x2000_0001, 0]);
    assert!(ins.is_native_valid());
    assert!(ins.is_compact_valid());
    assert!(ins.is_modified());
    assert!(!ins.is_compact());
}

#[test]
fn test_init_errors() {
    let db = database();
    assert_eq!(Instruction::init(&db, DEMO, 99).unwrap_err(), GedError::OpcodeNotSupported(99));
    assert_eq!(
        Instruction::init(&db, ModelId::new(7), MOV).unwrap_err(),
        GedError::InvalidModel(ModelId::new(7))
    );
}

#[test]
fn test_decode_native_applies_masks() {
    let db = database();
    // Bit 7 must be zero and bit 127 one
    let bytes = to_bytes(&[0x005a_0081, 0, 0, 0]);
    let mut ins = Instruction::decode(&db, DEMO, &bytes).unwrap();

    assert_eq!(ins.words(Format::Native), &[0x005a_0001, 0, 0, NATIVE_OR_WORD3]);
    assert!(ins.is_native_encoded());
    assert!(!ins.is_modified());
    assert!(!ins.is_compact());
    assert_eq!(ins.instruction_size(), 16);
    assert_eq!(ins.instruction_bytes(), "0x800000000000000000000000005a0001");
    assert_eq!(ins.get_unsigned_field(DST_REG).unwrap(), 0x5a);
}

#[test]
fn test_dependent_masks() {
    let db = database();
    // With Saturate set, bit 10 is cleared as well
    let bytes = to_bytes(&[0x0000_0501, 0, 0, 0]);
    let mut ins = Instruction::decode(&db, DEMO, &bytes).unwrap();
    assert_eq!(ins.words(Format::Native)[0], 0x0000_0101);
    assert_eq!(ins.get_unsigned_field(SATURATE).unwrap(), 1);
    assert_eq!(ins.get_unsigned_field(ACC_WR_CTRL).unwrap(), 0);
}

#[test]
fn test_decode_errors() {
    let db = database();
    assert_eq!(
        Instruction::decode(&db, DEMO, &[0x01, 0, 0, 0]).unwrap_err(),
        GedError::BufferTooShort { needed: 8, actual: 4 }
    );
    assert_eq!(
        Instruction::decode(&db, DEMO, &to_bytes(&[0x01, 0])).unwrap_err(),
        GedError::BufferTooShort { needed: 16, actual: 8 }
    );
    assert_eq!(
        Instruction::decode(&db, DEMO, &to_bytes(&[0x05, 0, 0, 0])).unwrap_err(),
        GedError::OpcodeNotSupported(5)
    );
    assert_eq!(
        Instruction::decode(&db, ModelId::new(3), &to_bytes(&[0x01, 0, 0, 0])).unwrap_err(),
        GedError::InvalidModel(ModelId::new(3))
    );
    assert_eq!(
        Instruction::decode(&db, DEMO, &[]).unwrap_err(),
        GedError::BufferTooShort { needed: 8, actual: 0 }
    );
}

#[test]
fn test_set_fields_in_both_formats() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();

    ins.set_unsigned_field(DST_REG, 0x5a).unwrap();
    ins.set_unsigned_field(EXEC_SIZE, 8).unwrap();
    ins.set_unsigned_field(IMM, 0xabc).unwrap();

    assert_eq!(ins.words(Format::Native), &[0x035a_0001, 0x0000_bc00, 0, 0x0000_00a0]);
    assert_eq!(ins.words(Format::Compact), &[0x2003_5a01, 0x0000_0abc]);
    assert_eq!(ins.get_raw_field(EXEC_SIZE).unwrap(), 3);
    assert_eq!(ins.get_unsigned_field(EXEC_SIZE).unwrap(), 8);
    assert_eq!(ins.get_unsigned64_field(IMM).unwrap(), 0xabc);
}

#[test]
fn test_write_only_native_makes_compact_stale() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();

    // Offset has a 2-bit index in the compact format
    ins.set_unsigned_field(OFFSET, 0xf0).unwrap();
    assert_eq!(ins.status().get(Format::Native), BufferState::Valid);
    assert_eq!(ins.status().get(Format::Compact), BufferState::Stale);

    let compact = ins.to_bytes(Format::Compact).unwrap();
    assert_eq!(compact, to_bytes(&[0x2200_0001, 0]));
    assert!(ins.is_compact_encoded());
    assert!(ins.is_compact());
    assert_eq!(ins.instruction_size(), 8);
}

#[test]
fn test_rejected_values() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();

    // 3 is not an execution size
    assert_eq!(ins.set_unsigned_field(EXEC_SIZE, 3), Err(GedError::InvalidValue));
    assert_eq!(ins.set_unsigned_field(DST_REG, 0x100), Err(GedError::InvalidValue));
    assert_eq!(ins.set_unsigned_field(42, 1), Err(GedError::InvalidField));
    assert!(ins.is_native_valid());
    assert!(ins.is_compact_valid());

    // Raw writes bypass the enumeration, reads do not
    ins.set_raw_field(EXEC_SIZE, 6).unwrap();
    assert_eq!(ins.get_raw_field(EXEC_SIZE).unwrap(), 6);
    assert_eq!(ins.get_unsigned_field(EXEC_SIZE), Err(GedError::InvalidValue));
}

#[test]
fn test_signed_fields() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();

    ins.set_signed_field(OFFSET, -16).unwrap();
    assert_eq!(ins.get_signed_field(OFFSET).unwrap(), -16);
    assert_eq!(ins.get_signed64_field(OFFSET).unwrap(), -16);
    assert_eq!(ins.get_unsigned_field(OFFSET).unwrap(), 0xf0);
    assert_eq!(ins.set_signed_field(OFFSET, -129), Err(GedError::InvalidValue));

    ins.set_signed64_field(OFFSET, 200).unwrap();
    assert_eq!(ins.get_field::<u64>(OFFSET, ValueType::Encoded).unwrap(), 200);
}

#[test]
fn test_dependent_field_presence() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, NOP).unwrap();

    assert_eq!(ins.get_unsigned_field(DST_REG), Err(GedError::InvalidField));
    assert_eq!(ins.set_unsigned_field(DST_REG, 1), Err(GedError::InvalidField));
    assert_eq!(ins.field_size(DST_REG), 0);
    assert_eq!(ins.field_size(OPCODE), 7);
    assert_eq!(ins.field_width(DST_REG), Err(GedError::InvalidField));
    assert!(!ins.has_field(DST_REG));

    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();
    assert_eq!(ins.field_size(IMM), 12);
    assert_eq!(ins.field_size(ACC_WR_CTRL), 1);
    // Without Saturate, AccWrCtrl only exists in the compact layout
    ins.set_unsigned_field(SATURATE, 1).unwrap();
    ins.set_unsigned_field(ACC_WR_CTRL, 1).unwrap();
    assert_eq!(ins.words(Format::Native)[0], 0x0000_0301);
}

#[test]
fn test_set_opcode() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();
    ins.set_unsigned_field(DST_REG, 0x5a).unwrap();

    // sel shares the layout of mov
    ins.set_opcode(SEL).unwrap();
    assert_eq!(ins.raw_opcode(), SEL_RAW);
    assert_eq!(ins.mnemonic(), "sel");
    assert_eq!(ins.get_unsigned_field(DST_REG).unwrap(), 0x5a);
    assert_eq!(ins.words(Format::Compact)[0], 0x2000_5a02);

    ins.set_opcode(NOP).unwrap();
    assert_eq!(ins.words(Format::Native), &[NOP_RAW as u32, 0, 0, 0]);
    assert!(!ins.is_compact_valid());
    assert_eq!(ins.get_unsigned_field(DST_REG), Err(GedError::InvalidField));
    assert_eq!(ins.to_bytes(Format::Compact), Err(GedError::NoCompactForm));

    assert_eq!(ins.set_opcode(77), Err(GedError::OpcodeNotSupported(77)));
    assert_eq!(ins.raw_opcode(), NOP_RAW);
}

#[test]
fn test_encode_into_buffer() {
    let db = database();
    let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();
    ins.set_unsigned_field(DST_REG, 0x12).unwrap();

    let mut short = [0u8; 12];
    assert_eq!(
        ins.encode(Format::Native, Some(&mut short)),
        Err(GedError::BufferTooShort { needed: 16, actual: 12 })
    );

    let mut out = [0u8; 16];
    ins.encode(Format::Native, Some(&mut out)).unwrap();
    assert_eq!(out.to_vec(), to_bytes(&[0x0012_0001, 0, 0, NATIVE_OR_WORD3]));
    assert!(!ins.is_modified());

    // A field write clears the encoded state of both formats
    ins.set_unsigned_field(DST_REG, 0x13).unwrap();
    assert!(ins.is_modified());
    assert_eq!(ins.status().get(Format::Native), BufferState::Valid);
}
