//! Declarative grammar rules
//!
//! The combinators mirror the tree-sitter grammar DSL (`seq`, `choice`,
//! `repeat`, `prec.left`, ...) so grammars can be ported rule by rule.

use smol_str::SmolStr;

/// Associativity attached to a precedence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    /// No associativity: equal-precedence conflicts are left to the GLR runtime
    #[default]
    None,
    /// Prefer reducing (left-associative)
    Left,
    /// Prefer shifting (right-associative)
    Right,
}

impl Assoc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// A grammar rule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Matches the empty string
    Blank,
    /// An anonymous literal token, e.g. `"+"`
    String(String),
    /// An anonymous token matched by a pattern, e.g. `/\d+/`
    Pattern(String),
    /// Reference to a rule, token rule or external token by name
    Symbol(SmolStr),
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    /// Zero or more repetitions
    Repeat(Box<Rule>),
    /// One or more repetitions
    Repeat1(Box<Rule>),
    /// Precedence and associativity for the productions produced by `rule`
    Prec {
        value: i32,
        assoc: Assoc,
        rule: Box<Rule>,
    },
}

impl Rule {
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    pub fn pattern(source: impl Into<String>) -> Self {
        Self::Pattern(source.into())
    }

    pub fn symbol(name: impl Into<SmolStr>) -> Self {
        Self::Symbol(name.into())
    }
}

pub fn blank() -> Rule {
    Rule::Blank
}

pub fn sym(name: &str) -> Rule {
    Rule::symbol(name)
}

pub fn string(text: &str) -> Rule {
    Rule::string(text)
}

pub fn pattern(source: &str) -> Rule {
    Rule::pattern(source)
}

pub fn seq(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Seq(rules.into_iter().collect())
}

pub fn choice(rules: impl IntoIterator<Item = Rule>) -> Rule {
    Rule::Choice(rules.into_iter().collect())
}

pub fn optional(rule: Rule) -> Rule {
    Rule::Choice(vec![rule, Rule::Blank])
}

pub fn repeat(rule: Rule) -> Rule {
    Rule::Repeat(Box::new(rule))
}

pub fn repeat1(rule: Rule) -> Rule {
    Rule::Repeat1(Box::new(rule))
}

pub fn prec(value: i32, rule: Rule) -> Rule {
    Rule::Prec {
        value,
        assoc: Assoc::None,
        rule: Box::new(rule),
    }
}

pub fn prec_left(value: i32, rule: Rule) -> Rule {
    Rule::Prec {
        value,
        assoc: Assoc::Left,
        rule: Box::new(rule),
    }
}

pub fn prec_right(value: i32, rule: Rule) -> Rule {
    Rule::Prec {
        value,
        assoc: Assoc::Right,
        rule: Box::new(rule),
    }
}
