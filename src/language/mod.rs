//! Loaded grammars
//!
//! A [`GrammarHandle`] is the shareable, process-wide form of a compiled
//! [`GrammarTable`]: cloning it is a reference count bump, and any number of
//! threads may parse with it at once. A host language that needs context
//! sensitive tokens attaches its [`ExternalScanner`] here.

mod registry;

pub use registry::GrammarRegistry;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{EditError, GrammarLoadError};
use crate::lexer::ExternalScanner;
use crate::parser::{ParseOptions, Parser};
use crate::table::GrammarTable;
use crate::tree::{InputEdit, Tree};

/// A compiled grammar plus the host's external scanner, if any
#[derive(Clone)]
pub struct GrammarHandle {
    table: Arc<GrammarTable>,
    scanner: Option<Arc<dyn ExternalScanner>>,
}

impl fmt::Debug for GrammarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarHandle")
            .field("name", &self.name())
            .field("states", &self.table.state_count())
            .field("scanner", &self.scanner.is_some())
            .finish()
    }
}

impl From<GrammarTable> for GrammarHandle {
    fn from(table: GrammarTable) -> Self {
        Self::new(table)
    }
}

impl GrammarHandle {
    pub fn new(table: GrammarTable) -> Self {
        Self {
            table: Arc::new(table),
            scanner: None,
        }
    }

    /// Attach the scanner that produces this grammar's external tokens.
    pub fn with_scanner(self, scanner: impl ExternalScanner + 'static) -> Self {
        Self {
            scanner: Some(Arc::new(scanner)),
            ..self
        }
    }

    pub fn table(&self) -> &GrammarTable {
        &self.table
    }

    pub fn name(&self) -> &str {
        self.table.name()
    }

    pub fn scanner(&self) -> Option<&dyn ExternalScanner> {
        self.scanner.as_deref()
    }

    /// Both handles share one loaded table. Trees are only interchangeable
    /// between handles for which this holds.
    pub fn same_grammar(&self, other: &GrammarHandle) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Serialize the table (the scanner is host code and is not included).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.table.to_bytes()
    }

    /// Parse `text` with default options.
    pub fn parse(&self, text: &str) -> Tree {
        Parser::new(self.clone()).parse(text)
    }

    pub fn parse_with(&self, text: &str, options: ParseOptions) -> Tree {
        Parser::with_options(self.clone(), options).parse(text)
    }

    pub fn parse_incremental(
        &self,
        old_tree: &Tree,
        edits: &[InputEdit],
        new_text: &str,
    ) -> Result<Tree, EditError> {
        Parser::new(self.clone()).parse_incremental(old_tree, edits, new_text)
    }
}

/// Load a serialized grammar table.
///
/// On success the handle is always valid: every id in the table has been
/// range checked.
pub fn load_grammar(bytes: &[u8]) -> Result<GrammarHandle, GrammarLoadError> {
    let table = GrammarTable::from_bytes(bytes)?;
    debug!(
        grammar = table.name(),
        symbols = table.symbol_count(),
        states = table.state_count(),
        bytes = bytes.len(),
        "loaded grammar table"
    );
    Ok(GrammarHandle::new(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, pattern, repeat, sym};
    use crate::table::FORMAT_VERSION;

    fn handle() -> GrammarHandle {
        Grammar::new("words")
            .rule("words", repeat(sym("WORD")))
            .token("WORD", pattern("[a-z]+"))
            .extra(pattern(" "))
            .compile()
            .unwrap()
            .into()
    }

    #[test]
    fn test_load_round_trip() {
        let original = handle();
        let loaded = load_grammar(&original.to_bytes()).unwrap();
        assert_eq!(loaded.table(), original.table());
        assert!(!loaded.same_grammar(&original));
        assert!(original.same_grammar(&original.clone()));
        assert_eq!(
            loaded.parse("ab cd").to_sexp(),
            original.parse("ab cd").to_sexp()
        );
    }

    #[test]
    fn test_version_mismatch_yields_no_handle() {
        let mut bytes = handle().to_bytes();
        bytes[4] = FORMAT_VERSION + 1;
        let error = load_grammar(&bytes).unwrap_err();
        assert_eq!(
            error,
            GrammarLoadError::VersionMismatch {
                found: FORMAT_VERSION + 1,
                expected: FORMAT_VERSION,
            }
        );
    }

    #[test]
    fn test_debug_output() {
        let text = format!("{:?}", handle());
        assert!(text.contains("words"));
        assert!(text.contains("scanner: false"));
    }
}
