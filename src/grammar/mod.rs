//! Grammar authoring
//!
//! A [`Grammar`] is a declarative description of a language: syntactic rules
//! built from [`Rule`] combinators, token rules, extras, external tokens and
//! the declarations that drive error recovery and incremental reparsing.
//! [`Grammar::compile`] lowers it into an immutable [`GrammarTable`].
//!
//! Grammars can also be written in a small text format, see [`dsl`].

pub mod dsl;
mod rules;

pub use rules::{
    Assoc, Rule, blank, choice, optional, pattern, prec, prec_left, prec_right, repeat, repeat1,
    seq, string, sym,
};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::GrammarError;
use crate::table::GrammarTable;

/// A grammar definition, built with chained calls:
///
/// ```
/// use sylva::grammar::{Grammar, choice, prec_left, seq, string, sym};
///
/// let grammar = Grammar::new("sum")
///     .rule("expr", choice([
///         prec_left(1, seq([sym("expr"), string("+"), sym("expr")])),
///         sym("NUMBER"),
///     ]))
///     .token("NUMBER", sylva::grammar::pattern(r"\d+"));
/// assert!(grammar.compile().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    pub(crate) name: SmolStr,
    /// Syntactic rules; the first one is the start rule
    pub(crate) rules: IndexMap<SmolStr, Rule>,
    /// Named lexical rules (a single string or pattern each)
    pub(crate) tokens: IndexMap<SmolStr, Rule>,
    pub(crate) extras: Vec<Rule>,
    pub(crate) externals: Vec<SmolStr>,
    pub(crate) sync: Vec<Rule>,
    pub(crate) stable: Vec<SmolStr>,
    pub(crate) conflicts: Vec<Vec<SmolStr>>,
    /// Names defined more than once, reported by `compile`
    pub(crate) duplicates: Vec<SmolStr>,
}

impl Grammar {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a syntactic rule. The first rule added is the start rule.
    pub fn rule(mut self, name: impl Into<SmolStr>, rule: Rule) -> Self {
        let name = name.into();
        if self.is_defined(&name) {
            self.duplicates.push(name);
        } else {
            self.rules.insert(name, rule);
        }
        self
    }

    /// Add a named token rule. The body must be a single string or pattern.
    pub fn token(mut self, name: impl Into<SmolStr>, rule: Rule) -> Self {
        let name = name.into();
        if self.is_defined(&name) {
            self.duplicates.push(name);
        } else {
            self.tokens.insert(name, rule);
        }
        self
    }

    /// Add a token that may appear between any two tokens (whitespace, comments).
    pub fn extra(mut self, rule: Rule) -> Self {
        self.extras.push(rule);
        self
    }

    /// Declare a token produced by the host's external scanner.
    pub fn external(mut self, name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        if self.is_defined(&name) {
            self.duplicates.push(name);
        } else {
            self.externals.push(name);
        }
        self
    }

    /// Declare a synchronizing token for error recovery.
    pub fn sync(mut self, rule: Rule) -> Self {
        self.sync.push(rule);
        self
    }

    /// Declare a context-stable rule: a boundary for recovery and incremental reparse.
    pub fn stable(mut self, name: impl Into<SmolStr>) -> Self {
        self.stable.push(name.into());
        self
    }

    /// Declare that conflicts between these rules are intended.
    pub fn conflict<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.conflicts
            .push(names.into_iter().map(Into::into).collect());
        self
    }

    /// Name of the start rule, if any rule was added
    pub fn start_rule(&self) -> Option<&str> {
        self.rules.keys().next().map(SmolStr::as_str)
    }

    /// Lower the grammar and build its parse tables.
    pub fn compile(&self) -> Result<GrammarTable, GrammarError> {
        crate::table::build(self)
    }

    fn is_defined(&self, name: &str) -> bool {
        self.rules.contains_key(name)
            || self.tokens.contains_key(name)
            || self.externals.iter().any(|e| e == name)
    }
}
