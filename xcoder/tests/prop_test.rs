mod common;

use common::*;
use ged_xcoder::{Format, Instruction, COMPACT_CONTROL_MASK, OPCODE_MASK};
use proptest::prelude::*;

fn native_mov() -> impl Strategy<Value = [u32; 4]> {
    any::<[u32; 4]>().prop_map(|mut words| {
        words[0] = (words[0] & !(OPCODE_MASK | COMPACT_CONTROL_MASK)) | MOV_RAW as u32;
        words
    })
}

proptest! {
    #[test]
    fn prop_field_writes_read_back(reg in 0u32..=0xff, imm in 0u32..0x1000) {
        let db = database();
        let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();
        ins.set_unsigned_field(DST_REG, reg).unwrap();
        ins.set_unsigned_field(IMM, imm).unwrap();

        prop_assert_eq!(ins.get_unsigned_field(DST_REG).unwrap(), reg);
        prop_assert_eq!(ins.get_unsigned_field(IMM).unwrap(), imm);
        prop_assert!(ins.is_compact_valid());
    }

    #[test]
    fn prop_native_masks_are_idempotent(words in native_mov()) {
        let db = database();
        let mut first = Instruction::decode(&db, DEMO, &to_bytes(&words)).unwrap();
        let bytes = first.to_bytes(Format::Native).unwrap();

        let mut second = Instruction::decode(&db, DEMO, &bytes).unwrap();
        prop_assert_eq!(second.to_bytes(Format::Native).unwrap(), bytes);
    }

    #[test]
    fn prop_compact_round_trip(
        reg in 0u32..=0xff,
        exec_size in prop::sample::select(vec![1u32, 2, 4, 8, 16, 32]),
        imm in 0u32..0x1000,
        offset in prop::sample::select(OFFSETS.to_vec()),
    ) {
        let db = database();
        let mut ins = Instruction::init(&db, DEMO, MOV).unwrap();
        ins.set_unsigned_field(DST_REG, reg).unwrap();
        ins.set_unsigned_field(EXEC_SIZE, exec_size).unwrap();
        ins.set_unsigned_field(IMM, imm).unwrap();
        ins.set_unsigned_field(OFFSET, offset as u32).unwrap();

        let compact = ins.to_bytes(Format::Compact).unwrap();
        let mut decoded = Instruction::decode(&db, DEMO, &compact).unwrap();
        prop_assert_eq!(decoded.get_unsigned_field(DST_REG).unwrap(), reg);
        prop_assert_eq!(decoded.get_unsigned_field(EXEC_SIZE).unwrap(), exec_size);
        prop_assert_eq!(decoded.get_unsigned_field(IMM).unwrap(), imm);
        prop_assert_eq!(decoded.get_unsigned_field(OFFSET).unwrap(), offset as u32);
        prop_assert_eq!(
            decoded.to_bytes(Format::Native).unwrap(),
            ins.to_bytes(Format::Native).unwrap()
        );
    }
}
