use std::path::PathBuf;

use ged_cli::commands::{CompactCmd, DecodeCmd, DisasmCmd, LocationCmd};
use ged_cli::config::Settings;

fn settings() -> Settings {
    let models = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../models");
    Settings {
        models: Some(models.join("demo.json")),
        syntax: Some(models.join("demo_syntax.json")),
        model: Some("demo".into()),
        log: None,
    }
}

const COMPACT_MOV: &str = "01 5a 03 22 bc 0a 00 00";

#[test]
fn test_decode() {
    DecodeCmd { bytes: COMPACT_MOV.into() }.run(&settings()).unwrap();
    // Opcode 5 is not in the model
    assert!(
        DecodeCmd { bytes: "05000000 00000000 00000000 00000000".into() }.run(&settings()).is_err()
    );
}

#[test]
fn test_disasm_hex_input() {
    DisasmCmd { input: format!("{COMPACT_MOV} 05000000") }.run(&settings()).unwrap();

    let mut settings = settings();
    settings.syntax = None;
    assert!(DisasmCmd { input: COMPACT_MOV.into() }.run(&settings).is_err());
}

#[test]
fn test_compact() {
    CompactCmd { bytes: COMPACT_MOV.into(), all: true }.run(&settings()).unwrap();
    // Offset 0x33 has no compaction entry
    let bytes = "01000000 00003300 00000000 00000080".into();
    CompactCmd { bytes, all: false }.run(&settings()).unwrap();
}

#[test]
fn test_location() {
    LocationCmd { bytes: COMPACT_MOV.into(), field: "Imm".into() }.run(&settings()).unwrap();
    LocationCmd { bytes: COMPACT_MOV.into(), field: "AccWrCtrl".into() }.run(&settings()).unwrap();
    assert!(
        LocationCmd { bytes: COMPACT_MOV.into(), field: "Src0".into() }.run(&settings()).is_err()
    );
}
