use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use sylva::GrammarRegistry;

use crate::helpers::grammars::CALC;

#[test]
fn test_registry_loads_once() {
    let registry = GrammarRegistry::new();
    let loads = AtomicUsize::new(0);
    let bytes = CALC.to_bytes();
    let load = || {
        loads.fetch_add(1, Ordering::SeqCst);
        bytes.clone()
    };
    let first = registry.get_or_load("calc", load).unwrap();
    let second = registry.get_or_load("calc", load).unwrap();
    assert!(first.same_grammar(&second));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_shared_across_threads() {
    let registry = Arc::new(GrammarRegistry::new());
    registry.insert(CALC.clone());
    let trees: Vec<bool> = (0..16)
        .into_par_iter()
        .map(|i| {
            let grammar = registry.get("calc").unwrap();
            !grammar.parse(&format!("{i} * {i};")).has_errors()
        })
        .collect();
    assert!(trees.into_iter().all(|ok| ok));
}

#[test]
fn test_registry_failed_load_leaves_no_entry() {
    let registry = GrammarRegistry::new();
    let loaded = registry.get_or_load("broken", || b"garbage".to_vec());
    assert!(loaded.is_err());
    assert!(registry.is_empty());
}
