//! Grammar tables
//!
//! A [`GrammarTable`] is the immutable, compiled form of a grammar: the
//! symbol table, productions, lexical rules and LALR(1) action/goto tables.
//! It is produced by [`crate::grammar::Grammar::compile`] or decoded from
//! bytes with [`crate::load_grammar`], and shared read-only by every parse.
//!
//! Symbol ids are dense: `0` is the end-of-input terminal, `1` is `ERROR`,
//! the remaining terminals follow, then all non-terminals. The first
//! non-terminal is the augmented start symbol whose only production
//! (production `0`) wraps the grammar's start rule.

mod codec;
mod lower;
mod lr;

pub use codec::FORMAT_VERSION;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::{GrammarError, GrammarLoadError};
use crate::grammar::{Assoc, Grammar};
use crate::lexer::{Lexer, LexerError};

// ============================================================================
// IDS
// ============================================================================

/// Index of a terminal or non-terminal symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u16);

impl SymbolId {
    /// End of input
    pub const END: SymbolId = SymbolId(0);
    /// Lexical or syntax error
    pub const ERROR: SymbolId = SymbolId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a parse state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub const START: StateId = StateId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a production
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub(crate) u32);

impl ProductionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// TABLE CONTENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub terminal: bool,
    /// Named symbols come from rule or token names; anonymous ones from literals
    pub named: bool,
    /// Hidden symbols are flattened away when walking the tree
    pub visible: bool,
    /// Extras may appear between any two tokens
    pub extra: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: SymbolId,
    pub rhs: Box<[SymbolId]>,
    pub precedence: i32,
    pub assoc: Assoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    Accept,
}

/// A built-in lexical rule producing terminal `symbol`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalRule {
    pub symbol: SymbolId,
    /// Regular expression source, or the exact text when `literal`
    pub pattern: SmolStr,
    pub literal: bool,
}

/// A conflict that survived precedence resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub lookahead: SymbolId,
    pub actions: Vec<Action>,
    /// Declared with `conflicts` in the grammar
    pub expected: bool,
}

/// Everything that is serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableParts {
    pub name: SmolStr,
    pub symbols: Vec<SymbolInfo>,
    pub terminal_count: usize,
    /// The grammar's start rule (not the augmented start symbol)
    pub start_symbol: SymbolId,
    pub productions: Vec<Production>,
    pub lexical_rules: Vec<LexicalRule>,
    /// External token symbols, in declaration order
    pub externals: Vec<SymbolId>,
    pub sync: Vec<SymbolId>,
    pub stable: Vec<SymbolId>,
    pub state_count: usize,
    /// `state_count * terminal_count` cells
    pub actions: Vec<Box<[Action]>>,
    /// `state_count * nonterminal_count` cells, [`NO_GOTO`] when empty
    pub gotos: Vec<u32>,
}

pub(crate) const NO_GOTO: u32 = u32::MAX;

// ============================================================================
// GRAMMAR TABLE
// ============================================================================

/// Compiled, immutable grammar
#[derive(Debug, Clone)]
pub struct GrammarTable {
    parts: TableParts,
    lexer: Lexer,
    conflicts: Vec<Conflict>,
    is_sync: Vec<bool>,
    is_stable: Vec<bool>,
}

impl PartialEq for GrammarTable {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for GrammarTable {}

impl GrammarTable {
    pub(crate) fn from_parts(
        parts: TableParts,
        conflicts: Vec<Conflict>,
    ) -> Result<Self, LexerError> {
        let lexer = Lexer::new(&parts.lexical_rules, &parts.symbols, &parts.externals)?;
        let mut is_sync = vec![false; parts.symbols.len()];
        for symbol in &parts.sync {
            is_sync[symbol.index()] = true;
        }
        let mut is_stable = vec![false; parts.symbols.len()];
        for symbol in &parts.stable {
            is_stable[symbol.index()] = true;
        }
        Ok(Self {
            parts,
            lexer,
            conflicts,
            is_sync,
            is_stable,
        })
    }

    /// Decode a table written by [`GrammarTable::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GrammarLoadError> {
        let parts = codec::decode(bytes)?;
        Self::from_parts(parts, Vec::new())
            .map_err(|err| GrammarLoadError::corrupt(err.to_string()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(&self.parts)
    }

    pub fn name(&self) -> &str {
        &self.parts.name
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    // ------------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------------

    pub fn symbol_count(&self) -> usize {
        self.parts.symbols.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.parts.terminal_count
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolInfo {
        &self.parts.symbols[id.index()]
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        &self.parts.symbols[id.index()].name
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &SymbolInfo)> {
        self.parts
            .symbols
            .iter()
            .enumerate()
            .map(|(i, info)| (SymbolId(i as u16), info))
    }

    /// Find a symbol by name. Anonymous (literal) symbols are looked up by
    /// their text with `named == false`.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<SymbolId> {
        self.symbols()
            .find(|(_, info)| info.name == name && info.named == named)
            .map(|(id, _)| id)
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        id.index() < self.parts.terminal_count
    }

    pub fn is_visible(&self, id: SymbolId) -> bool {
        self.symbol(id).visible
    }

    pub fn is_named(&self, id: SymbolId) -> bool {
        self.symbol(id).named
    }

    pub fn is_extra(&self, id: SymbolId) -> bool {
        self.symbol(id).extra
    }

    pub fn is_sync(&self, id: SymbolId) -> bool {
        self.is_sync[id.index()]
    }

    pub fn is_stable(&self, id: SymbolId) -> bool {
        self.is_stable[id.index()]
    }

    /// The grammar declares synchronizing tokens or context-stable rules
    pub fn has_recovery_boundaries(&self) -> bool {
        !self.parts.sync.is_empty() || !self.parts.stable.is_empty()
    }

    pub fn has_sync_tokens(&self) -> bool {
        !self.parts.sync.is_empty()
    }

    /// The grammar's start rule
    pub fn start_symbol(&self) -> SymbolId {
        self.parts.start_symbol
    }

    pub fn externals(&self) -> &[SymbolId] {
        &self.parts.externals
    }

    // ------------------------------------------------------------------------
    // Productions and parse tables
    // ------------------------------------------------------------------------

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.parts.productions[id.index()]
    }

    pub fn production_count(&self) -> usize {
        self.parts.productions.len()
    }

    pub fn state_count(&self) -> usize {
        self.parts.state_count
    }

    /// Actions for `terminal` in `state`: shifts first, then reductions in
    /// production order. Empty means a syntax error.
    pub fn actions(&self, state: StateId, terminal: SymbolId) -> &[Action] {
        if terminal.index() >= self.parts.terminal_count {
            return &[];
        }
        self.parts
            .actions
            .get(state.index() * self.parts.terminal_count + terminal.index())
            .map(|cell| &cell[..])
            .unwrap_or(&[])
    }

    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        let nonterminal_count = self.parts.symbols.len() - self.parts.terminal_count;
        let column = nonterminal.index().checked_sub(self.parts.terminal_count)?;
        let target = *self
            .parts
            .gotos
            .get(state.index() * nonterminal_count + column)?;
        (target != NO_GOTO).then_some(StateId(target))
    }

    /// Terminals with at least one action in `state`
    pub fn expected_terminals(&self, state: StateId) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.parts.terminal_count)
            .map(|t| SymbolId(t as u16))
            .filter(move |&t| !self.actions(state, t).is_empty())
    }

    /// Per external token, whether `state` has an action for it. External
    /// extras are valid everywhere.
    pub fn valid_externals(&self, state: StateId, mask: &mut [bool]) {
        for (slot, &symbol) in mask.iter_mut().zip(&self.parts.externals) {
            *slot |= self.is_extra(symbol) || !self.actions(state, symbol).is_empty();
        }
    }

    /// Conflicts left for the GLR runtime (only known for freshly compiled tables)
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

/// Lower `grammar` and build its LALR(1) tables.
pub(crate) fn build(grammar: &Grammar) -> Result<GrammarTable, GrammarError> {
    let lowered = lower::lower(grammar)?;
    let tables = lr::build(&lowered);

    for conflict in &tables.conflicts {
        let actions: Vec<String> = conflict
            .actions
            .iter()
            .map(|action| describe_action(&lowered, *action))
            .collect();
        let lookahead = &lowered.symbols[conflict.lookahead.index()].name;
        let state = conflict.state.0;
        if conflict.expected {
            debug!(grammar = %grammar.name, state, %lookahead, ?actions, "expected conflict");
        } else {
            warn!(grammar = %grammar.name, state, %lookahead, ?actions, "unresolved conflict");
        }
    }
    debug!(
        grammar = %grammar.name,
        symbols = lowered.symbols.len(),
        productions = lowered.productions.len(),
        states = tables.state_count,
        "built grammar table"
    );

    let parts = TableParts {
        name: grammar.name.clone(),
        symbols: lowered.symbols,
        terminal_count: lowered.terminal_count,
        start_symbol: lowered.start_symbol,
        productions: lowered.productions,
        lexical_rules: lowered.lexical_rules,
        externals: lowered.externals,
        sync: lowered.sync,
        stable: lowered.stable,
        state_count: tables.state_count,
        actions: tables.actions,
        gotos: tables.gotos,
    };
    Ok(GrammarTable::from_parts(parts, tables.conflicts)?)
}

fn describe_action(lowered: &lower::LoweredGrammar, action: Action) -> String {
    match action {
        Action::Shift(state) => format!("shift {}", state.0),
        Action::Accept => "accept".to_string(),
        Action::Reduce(id) => {
            let production = &lowered.productions[id.index()];
            let rhs: Vec<&str> = production
                .rhs
                .iter()
                .map(|s| lowered.symbols[s.index()].name.as_str())
                .collect();
            format!(
                "reduce {} -> {}",
                lowered.symbols[production.lhs.index()].name,
                rhs.join(" ")
            )
        }
    }
}
