//! Multi-pattern DFA over all built-in lexical rules
//!
//! Rules are parsed with `regex-syntax` and compiled into a single anchored
//! dense DFA that reports every rule matching at an offset. Stepping it one
//! byte at a time finds the longest match of every rule in one pass and
//! tells exactly how far the input was examined.

use regex_automata::dfa::{Automaton, StartKind, dense};
use regex_automata::nfa::thompson;
use regex_automata::util::primitives::StateID;
use regex_automata::{Anchored, Input, MatchKind};
use regex_syntax::ParserBuilder;
use regex_syntax::hir::Hir;
use thiserror::Error;

/// Heap cap for determinizing and storing the automaton
const DFA_SIZE_LIMIT: usize = 64 << 20;

/// A lexical rule set that cannot be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("invalid pattern /{pattern}/: {message}")]
    Pattern { pattern: String, message: String },

    #[error("lexical rules do not fit in an automaton: {0}")]
    TooLarge(String),
}

/// Parse one rule. Literal rules match their text exactly.
pub(crate) fn rule_hir(source: &str, literal: bool) -> Result<Hir, LexerError> {
    if literal {
        return Ok(Hir::literal(source.as_bytes()));
    }
    let invalid = |message: String| LexerError::Pattern {
        pattern: source.to_string(),
        message,
    };
    let hir = ParserBuilder::new()
        .build()
        .parse(source)
        .map_err(|err| invalid(err.to_string()))?;
    if !hir.properties().look_set().is_empty() {
        return Err(invalid("anchors and word boundaries are not supported".to_string()));
    }
    Ok(hir)
}

/// Result of running the automaton from one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Longest {
    /// Index of the winning rule and the end of its match
    pub best: Option<(usize, usize)>,
    /// Exclusive end of the input the scan depended on. One past the input
    /// length when the automaton could still have grown a match there.
    pub examined_end: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct RuleDfa {
    /// `None` when the grammar has no built-in rules
    dfa: Option<dense::DFA<Vec<u32>>>,
    /// Tie-break rank per rule: lower wins
    ranks: Vec<usize>,
}

impl RuleDfa {
    /// Compile `(source, is_literal)` rules. Among equally long matches a
    /// literal beats a pattern and an earlier rule beats a later one.
    pub fn new(rules: &[(&str, bool)]) -> Result<Self, LexerError> {
        let hirs = rules
            .iter()
            .map(|&(source, literal)| rule_hir(source, literal))
            .collect::<Result<Vec<_>, _>>()?;
        let dfa = if hirs.is_empty() {
            None
        } else {
            Some(build(&hirs)?)
        };

        let mut order: Vec<usize> = (0..rules.len()).collect();
        order.sort_by_key(|&i| (!rules[i].1, i));
        let mut ranks = vec![0; rules.len()];
        for (rank, rule) in order.into_iter().enumerate() {
            ranks[rule] = rank;
        }
        Ok(Self { dfa, ranks })
    }

    /// Longest non-empty match starting at byte `start` of `text`.
    pub fn longest_match(&self, text: &str, start: usize) -> Longest {
        let mut longest = Longest {
            best: None,
            examined_end: start,
        };
        let Some(dfa) = &self.dfa else {
            return longest;
        };
        let input = Input::new(text).range(start..).anchored(Anchored::Yes);
        let Ok(mut state) = dfa.start_state_forward(&input) else {
            return longest;
        };

        // Matches are reported one byte late: entering a match state on the
        // byte at `at` means some rule matched `start..at`.
        let bytes = text.as_bytes();
        for (at, &byte) in bytes.iter().enumerate().skip(start) {
            let next = dfa.next_state(state, byte);
            if dfa.is_dead_state(next) {
                let end = if is_exhausted(dfa, state) { at } else { at + 1 };
                longest.examined_end = char_ceil(text, end);
                return longest;
            }
            if dfa.is_match_state(next) && at > start {
                longest.best = self.best_rule(dfa, next).map(|rule| (rule, at));
            }
            state = next;
        }

        let eoi = dfa.next_eoi_state(state);
        if dfa.is_match_state(eoi) && bytes.len() > start {
            longest.best = self.best_rule(dfa, eoi).map(|rule| (rule, bytes.len()));
        }
        // Still able to grow at end of input: the decision depended on there
        // being nothing more, so the end itself counts as examined.
        longest.examined_end = if is_exhausted(dfa, state) {
            bytes.len()
        } else {
            bytes.len() + 1
        };
        longest
    }

    fn best_rule(&self, dfa: &dense::DFA<Vec<u32>>, state: StateID) -> Option<usize> {
        (0..dfa.match_len(state))
            .map(|index| dfa.match_pattern(state, index).as_usize())
            .min_by_key(|&rule| self.ranks[rule])
    }
}

fn build(hirs: &[Hir]) -> Result<dense::DFA<Vec<u32>>, LexerError> {
    let nfa = thompson::Compiler::new()
        .build_many_from_hir(hirs)
        .map_err(|err| LexerError::TooLarge(err.to_string()))?;
    dense::Builder::new()
        .configure(
            dense::DFA::config()
                .match_kind(MatchKind::All)
                .start_kind(StartKind::Anchored)
                .dfa_size_limit(Some(DFA_SIZE_LIMIT))
                .determinize_size_limit(Some(DFA_SIZE_LIMIT)),
        )
        .build_from_nfa(&nfa)
        .map_err(|err| LexerError::TooLarge(err.to_string()))
}

/// No byte leads anywhere but the dead state: nothing after this point can
/// change the outcome.
fn is_exhausted(dfa: &dense::DFA<Vec<u32>>, state: StateID) -> bool {
    dfa.is_dead_state(state)
        || (0..=u8::MAX).all(|byte| dfa.is_dead_state(dfa.next_state(state, byte)))
}

/// Round a byte offset up to the next char boundary.
fn char_ceil(text: &str, mut offset: usize) -> usize {
    while offset < text.len() && !text.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}
