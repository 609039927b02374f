//! Loading serialized grammar tables.

use rstest::rstest;
use sylva::table::FORMAT_VERSION;
use sylva::{GrammarLoadError, load_grammar};

use crate::helpers::grammars::{CALC, SLANG};
use crate::helpers::source_fixtures::{CALC_SIMPLE, SLANG_SHADER};

#[test]
fn test_loaded_table_parses_like_original() {
    let loaded = load_grammar(&SLANG.to_bytes()).unwrap();
    assert_eq!(loaded.name(), "slang");
    assert!(!loaded.same_grammar(&SLANG));
    assert_eq!(
        loaded.parse(SLANG_SHADER).to_sexp(),
        SLANG.parse(SLANG_SHADER).to_sexp()
    );
}

#[test]
fn test_scanner_is_not_serialized() {
    let loaded = load_grammar(&CALC.to_bytes()).unwrap();
    assert!(loaded.scanner().is_none());
    assert_eq!(
        loaded.parse(CALC_SIMPLE).to_sexp(),
        CALC.parse(CALC_SIMPLE).to_sexp()
    );
}

#[test]
fn test_version_mismatch_is_rejected() {
    let mut bytes = CALC.to_bytes();
    bytes[4] = FORMAT_VERSION.wrapping_add(1);
    assert_eq!(
        load_grammar(&bytes).unwrap_err(),
        GrammarLoadError::VersionMismatch {
            found: FORMAT_VERSION.wrapping_add(1),
            expected: FORMAT_VERSION,
        }
    );
}

#[rstest]
#[case::empty(0)]
#[case::magic_only(4)]
#[case::header(5)]
#[case::half(200)]
fn test_truncated_table_is_rejected(#[case] keep: usize) {
    let bytes = CALC.to_bytes();
    let keep = keep.min(bytes.len() - 1);
    assert!(load_grammar(&bytes[..keep]).is_err());
}

#[test]
fn test_corruption_is_detected() {
    let mut bytes = CALC.to_bytes();
    assert!(matches!(load_grammar(b"NOPE\x01"), Err(GrammarLoadError::BadMagic)));
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    assert!(load_grammar(&bytes).is_err());
}
