//! Property tests: termination, containment and incremental equivalence.

use proptest::prelude::*;
use sylva::InputEdit;

use crate::helpers::assertions::{assert_incremental_matches, assert_well_formed};
use crate::helpers::grammars::{CALC, SUM};

const CALC_PIECES: &[&str] = &[
    "1", "23", "x", "total", "+", "-", "*", "(", ")", ";", " ", "\n", "/* c */", "/*", "#",
];

const SUM_PIECES: &[&str] = &["1", "42", "+", " ", "x"];

fn text_from(pieces: &'static [&'static str], max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(pieces), 0..max).prop_map(|parts| parts.concat())
}

/// A text and a replacement range inside it (all pieces are ASCII)
fn edited_text(
    pieces: &'static [&'static str],
) -> impl Strategy<Value = (String, usize, usize, String)> {
    let parts = (text_from(pieces, 16), text_from(pieces, 4));
    parts.prop_flat_map(|(text, replacement)| {
        let len = text.len();
        let bounds = (Just(text), 0..=len, 0..=len, Just(replacement));
        bounds.prop_map(|(text, a, b, replacement)| (text, a.min(b), a.max(b), replacement))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_parse_covers_input(text in text_from(CALC_PIECES, 24)) {
        let tree = CALC.parse(&text);
        assert_well_formed(&tree);
        prop_assert_eq!(tree.len(), text.len());
    }

    #[test]
    fn prop_ambiguous_parse_covers_input(text in text_from(SUM_PIECES, 16)) {
        let tree = SUM.parse(&text);
        assert_well_formed(&tree);
    }

    #[test]
    fn prop_incremental_equals_full((text, start, end, replacement) in edited_text(CALC_PIECES)) {
        let old = CALC.parse(&text);
        assert_incremental_matches(&CALC, &old, start..end, &replacement);
    }

    #[test]
    fn prop_incremental_equals_full_ambiguous(
        (text, start, end, replacement) in edited_text(SUM_PIECES)
    ) {
        let old = SUM.parse(&text);
        assert_incremental_matches(&SUM, &old, start..end, &replacement);
    }

    #[test]
    fn prop_insert_then_undo((text, at, _, inserted) in edited_text(CALC_PIECES)) {
        let old = CALC.parse(&text);
        let (edit, with_insert) = InputEdit::apply(&text, at..at, &inserted);
        let middle = CALC.parse_incremental(&old, &[edit], &with_insert).unwrap();
        let undone = CALC
            .parse_incremental(&middle, &[edit.inverse()], &text)
            .unwrap();
        prop_assert_eq!(undone.text(), text.as_str());
        let (got, want) = (undone.to_sexp(), old.to_sexp());
        prop_assert!(undone.structurally_eq(&old), "{got} vs {want}");
    }
}
