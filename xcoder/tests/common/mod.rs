#![allow(dead_code)]

use ged_xcoder::{
    CollectedField, CompactTables, CompactionTable, EnumTable, FieldData, FieldEntry,
    FragmentSource, Interpreter, MappingEntry, MappingFragment, MappingTarget, MasksEntry,
    ModelData, ModelDatabase, ModelId, OpcodeTables, PositionFragment, PseudoField, Restriction,
    Table, TableId,
};

pub const OPCODE: u32 = 0;
pub const CMPT_CTRL: u32 = 1;
pub const DST_REG: u32 = 2;
pub const EXEC_SIZE: u32 = 3;
pub const IMM: u32 = 4;
pub const ACC_WR_CTRL: u32 = 5;
pub const SATURATE: u32 = 6;
pub const OFFSET: u32 = 7;

pub const MOV: u32 = 1;
pub const NOP: u32 = 2;
pub const SEL: u32 = 3;

pub const MOV_RAW: u8 = 0x01;
pub const SEL_RAW: u8 = 0x02;
pub const NOP_RAW: u8 = 0x60;

pub const DST_REG_HIGH: u32 = 0;
pub const EXEC_SIZE_LOG: u32 = 1;
pub const REG_AND_OFFSET: u32 = 2;

pub const DEMO: ModelId = ModelId::new(0);
pub const CYCLIC: ModelId = ModelId::new(1);
pub const ORDERED: ModelId = ModelId::new(2);

pub const MODE: u32 = 1;
pub const DST: u32 = 2;
pub const SRC: u32 = 3;
pub const KIND: u32 = 4;

/// Native bit 127 must be one and bit 7 zero; with Saturate set, bit 10 must be zero too.
pub const NATIVE_OR_WORD3: u32 = 0x8000_0000;

/// Compaction table of the Offset field.
pub const OFFSETS: [u64; 4] = [0x00, 0x10, 0xf0, 0x10];

fn pos(low: u8, high: u8) -> PositionFragment {
    PositionFragment::new(low, high)
}

fn field(bit_size: u8, low: u8) -> FieldEntry {
    FieldEntry::Explicit(FieldData::consecutive(bit_size, pos(low, low + bit_size - 1)))
}

fn value_to(low: u8, high: u8, source_mask: u32) -> MappingEntry {
    MappingEntry::Value { target: MappingTarget::Consecutive { to: pos(low, high), source_mask } }
}

fn one_to_one(to: PositionFragment, from: PositionFragment) -> MappingFragment {
    MappingFragment { to, source: FragmentSource::OneToOne { from } }
}

fn masks(or: [u32; 4], and: [u32; 4]) -> MasksEntry {
    MasksEntry::Masks { or: or.to_vec(), and: and.to_vec() }
}

const FIELD_NAMES: [&str; 8] =
    ["Opcode", "CmptCtrl", "DstReg", "ExecSize", "Imm", "AccWrCtrl", "Saturate", "Offset"];

/// A small model with one compactable opcode family:
///
/// | field       | native              | compact          | mapping          |
/// |-------------|---------------------|------------------|------------------|
/// | Opcode      | 0..6                | 0..6             | value            |
/// | CmptCtrl    | 29                  | 29               | value            |
/// | DstReg      | 16..23              | 8..15            | value            |
/// | ExecSize    | 24..26, enumerated  | 16..18           | value            |
/// | Imm         | 40..47 + 100..103   | 32..43           | fragmented value |
/// | AccWrCtrl   | 9, if Saturate      | 20               | if Saturate      |
/// | Saturate    | 8                   | 19               | value            |
/// | Offset      | 48..55              | 24..25           | index            |
pub fn demo_model() -> ModelData {
    let exec_size = |low: u8| {
        FieldEntry::Explicit(
            FieldData::consecutive(3, pos(low, low + 2))
                .with_restrictions(vec![Restriction::Enum { table: TableId::new(0) }]),
        )
    };
    let imm = FieldEntry::Explicit(FieldData::fragmented(
        12,
        vec![pos(40, 47), PositionFragment::at_offset(100, 103, 8)],
    ));

    let native = Table::new(vec![
        field(7, 0),
        field(1, 29),
        field(8, 16),
        exec_size(24),
        imm,
        FieldEntry::NextTable { key: SATURATE, table: TableId::new(1) },
        field(1, 8),
        field(8, 48),
    ]);
    let acc_wr_ctrl = Table::new(vec![FieldEntry::NotSupported, field(1, 9)]);
    let compact = Table::new(vec![
        field(7, 0),
        field(1, 29),
        field(8, 8),
        exec_size(16),
        field(12, 32),
        field(1, 20),
        field(1, 19),
        field(2, 24),
    ]);
    let nop = Table::new(vec![
        field(7, 0),
        field(1, 29),
        FieldEntry::NotSupported,
        FieldEntry::NotSupported,
        FieldEntry::NotSupported,
        FieldEntry::NotSupported,
        FieldEntry::NotSupported,
        FieldEntry::NotSupported,
    ]);

    let mapping = Table::new(vec![
        value_to(0, 6, 0x7f),
        value_to(29, 29, 0x1),
        value_to(16, 23, 0xff),
        value_to(24, 26, 0x7),
        MappingEntry::Value {
            target: MappingTarget::Fragmented(vec![
                one_to_one(pos(40, 47), pos(0, 7)),
                one_to_one(pos(100, 103), pos(8, 11)),
            ]),
        },
        MappingEntry::NextTable { key: SATURATE, table: TableId::new(1) },
        value_to(8, 8, 0x1),
        MappingEntry::Index {
            target: MappingTarget::Consecutive { to: pos(48, 55), source_mask: 0xff },
            table: TableId::new(0),
        },
    ]);
    let acc_wr_ctrl_mapping = Table::new(vec![MappingEntry::NoMapping, value_to(9, 9, 0x1)]);

    let native_masks = Table::new(vec![
        masks([0, 0, 0, NATIVE_OR_WORD3], [!0x80, !0, !0, !0]),
        MasksEntry::NextTable { key: SATURATE, table: TableId::new(1) },
        MasksEntry::NoMasks,
    ]);
    let saturate_masks = Table::new(vec![MasksEntry::NoMasks, masks([0; 4], [!0x400, !0, !0, !0])]);
    let compact_masks = Table::new(vec![
        MasksEntry::Masks { or: vec![0, 0], and: vec![!0x80, !0x8000_0000] },
        MasksEntry::NoMasks,
    ]);

    let mov_tables = |opcode: u32, name: &str| OpcodeTables {
        opcode,
        name: name.into(),
        native_decoding: TableId::new(0),
        native_masks: Some(TableId::new(0)),
        compact: Some(CompactTables {
            decoding: TableId::new(2),
            mapping: TableId::new(0),
            masks: Some(TableId::new(2)),
        }),
    };

    let mut model = ModelData {
        name: "demo".into(),
        fields: FIELD_NAMES.map(String::from).to_vec(),
        decoding_tables: vec![native, acc_wr_ctrl, compact, nop],
        mapping_tables: vec![mapping, acc_wr_ctrl_mapping],
        masks_tables: vec![native_masks, saturate_masks, compact_masks],
        compaction_tables: vec![CompactionTable::new(OFFSETS.to_vec())],
        enum_tables: vec![
            EnumTable::new(vec![
                Some(1),
                Some(2),
                Some(4),
                Some(8),
                Some(16),
                Some(32),
                None,
                None,
            ]),
            EnumTable::new(vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]),
        ],
        pseudo_fields: vec![
            PseudoField {
                name: "DstRegHigh".into(),
                interpreter: Interpreter::Position {
                    base: DST_REG,
                    field: FieldData::consecutive(4, pos(4, 7)),
                },
            },
            PseudoField {
                name: "ExecSizeLog".into(),
                interpreter: Interpreter::ReEnum { base: EXEC_SIZE, table: TableId::new(1) },
            },
            PseudoField {
                name: "RegAndOffset".into(),
                interpreter: Interpreter::Collect {
                    parts: vec![
                        CollectedField { field: OFFSET, offset: 0 },
                        CollectedField { field: DST_REG, offset: 8 },
                    ],
                },
            },
        ],
        ..Default::default()
    };
    model.opcodes.insert(MOV_RAW, mov_tables(MOV, "mov"));
    model.opcodes.insert(SEL_RAW, mov_tables(SEL, "sel"));
    model.opcodes.insert(
        NOP_RAW,
        OpcodeTables {
            opcode: NOP,
            name: "nop".into(),
            native_decoding: TableId::new(3),
            native_masks: None,
            compact: None,
        },
    );
    model
}

/// Two compact fields whose mappings each depend on the other's native bits.
pub fn cyclic_model() -> ModelData {
    let decoding = Table::new(vec![field(7, 0), field(2, 8), field(2, 10)]);
    let mapping = Table::new(vec![
        value_to(0, 6, 0x7f),
        MappingEntry::NextTable { key: 2, table: TableId::new(1) },
        MappingEntry::NextTable { key: 1, table: TableId::new(2) },
    ]);
    let first = Table::new(vec![value_to(8, 9, 0x3); 4]);
    let second = Table::new(vec![value_to(10, 11, 0x3); 4]);

    let mut model = ModelData {
        name: "cyclic".into(),
        fields: vec!["Opcode".into(), "First".into(), "Second".into()],
        decoding_tables: vec![decoding],
        mapping_tables: vec![mapping, first, second],
        ..Default::default()
    };
    model.opcodes.insert(
        MOV_RAW,
        OpcodeTables {
            opcode: MOV,
            name: "mov".into(),
            native_decoding: TableId::new(0),
            native_masks: None,
            compact: Some(CompactTables {
                decoding: TableId::new(0),
                mapping: TableId::new(0),
                masks: None,
            }),
        },
    );
    model
}

/// Compact mappings keyed on native fields that are not compact fields
/// themselves:
///
/// | field | native                  | compact | mapping              |
/// |-------|-------------------------|---------|----------------------|
/// | Mode  | fixed 1                 | -       | none                 |
/// | Dst   | 16..23                  | 8..15   | value, if Mode is 1  |
/// | Src   | 32..39, 40..47 if Kind  | 16..23  | value, keyed on Kind |
/// | Kind  | 30                      | 24      | value                |
///
/// Src precedes Kind, so expanding it has to wait for Kind's native bit. The
/// masks of both formats only cover Kind 0.
pub fn ordered_model() -> ModelData {
    let native = Table::new(vec![
        field(7, 0),
        FieldEntry::Explicit(FieldData::fixed(1, 1)),
        field(8, 16),
        FieldEntry::NextTable { key: KIND, table: TableId::new(1) },
        field(1, 30),
    ]);
    let src_by_kind = Table::new(vec![field(8, 32), field(8, 40)]);
    let compact = Table::new(vec![
        field(7, 0),
        FieldEntry::NotSupported,
        field(8, 8),
        field(8, 16),
        field(1, 24),
    ]);

    let mapping = Table::new(vec![
        value_to(0, 6, 0x7f),
        MappingEntry::NoMapping,
        MappingEntry::NextTable { key: MODE, table: TableId::new(1) },
        MappingEntry::NextTable { key: KIND, table: TableId::new(2) },
        value_to(30, 30, 0x1),
    ]);
    let dst_by_mode = Table::new(vec![MappingEntry::NotSupported, value_to(16, 23, 0xff)]);
    let src_mapping = Table::new(vec![value_to(32, 39, 0xff), value_to(40, 47, 0xff)]);

    let keyed_on_kind = |table: u32| {
        let next = MasksEntry::NextTable { key: KIND, table: TableId::new(table) };
        Table::new(vec![next, MasksEntry::NoMasks])
    };
    let native_masks = Table::new(vec![masks([0, 0, 0, NATIVE_OR_WORD3], [!0; 4])]);
    let compact_masks =
        Table::new(vec![MasksEntry::Masks { or: vec![0, 0x8000_0000], and: vec![!0, !0] }]);

    let mut model = ModelData {
        name: "ordered".into(),
        fields: ["Opcode", "Mode", "Dst", "Src", "Kind"].map(String::from).to_vec(),
        decoding_tables: vec![native, src_by_kind, compact],
        mapping_tables: vec![mapping, dst_by_mode, src_mapping],
        masks_tables: vec![keyed_on_kind(1), native_masks, keyed_on_kind(3), compact_masks],
        ..Default::default()
    };
    model.opcodes.insert(
        MOV_RAW,
        OpcodeTables {
            opcode: MOV,
            name: "mov".into(),
            native_decoding: TableId::new(0),
            native_masks: Some(TableId::new(0)),
            compact: Some(CompactTables {
                decoding: TableId::new(2),
                mapping: TableId::new(0),
                masks: Some(TableId::new(2)),
            }),
        },
    );
    model
}

pub fn database() -> ModelDatabase {
    ModelDatabase::new(vec![demo_model(), cyclic_model(), ordered_model()])
        .expect("fixture models are valid")
}

/// Little-endian bytes of instruction words.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}
