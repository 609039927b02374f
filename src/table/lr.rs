//! LALR(1) table construction
//!
//! Canonical LR(1) item sets are merged by core as they are discovered; a
//! worklist re-processes a state whenever merging grows one of its kernel
//! lookahead sets, so lookaheads propagate until a fixpoint. Conflicts are
//! then resolved with static precedence and associativity; what survives is
//! kept as multiple actions for the GLR runtime.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;

use super::lower::LoweredGrammar;
use super::{Action, Conflict, NO_GOTO, ProductionId, StateId, SymbolId};
use crate::grammar::Assoc;

/// Dense bitset over terminal ids
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TerminalSet {
    words: Vec<u64>,
}

impl TerminalSet {
    pub fn new(terminal_count: usize) -> Self {
        Self {
            words: vec![0; terminal_count.div_ceil(64)],
        }
    }

    pub fn insert(&mut self, terminal: SymbolId) -> bool {
        let (word, bit) = (terminal.index() / 64, terminal.index() % 64);
        let before = self.words[word];
        self.words[word] |= 1 << bit;
        before != self.words[word]
    }

    /// Add every member of `other`; returns whether anything was added.
    pub fn union_with(&mut self, other: &TerminalSet) -> bool {
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *mine | theirs;
            changed |= merged != *mine;
            *mine = merged;
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| SymbolId((w * 64 + bit) as u16))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    production: u32,
    dot: u32,
}

impl Item {
    /// `start' -> . start`
    const START: Item = Item {
        production: 0,
        dot: 0,
    };
}

pub(crate) struct BuiltTables {
    pub state_count: usize,
    pub actions: Vec<Box<[Action]>>,
    pub gotos: Vec<u32>,
    pub conflicts: Vec<Conflict>,
}

pub(crate) fn build(grammar: &LoweredGrammar) -> BuiltTables {
    let builder = Builder::new(grammar);
    let (kernels, transitions) = builder.item_sets();
    builder.tables(&kernels, &transitions)
}

type Kernel = Vec<(Item, TerminalSet)>;

struct Builder<'g> {
    grammar: &'g LoweredGrammar,
    terminal_count: usize,
    by_lhs: Vec<Vec<u32>>,
    first: Vec<TerminalSet>,
    nullable: Vec<bool>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g LoweredGrammar) -> Self {
        let terminal_count = grammar.terminal_count;
        let nonterminal_count = grammar.symbols.len() - terminal_count;
        let mut by_lhs = vec![Vec::new(); nonterminal_count];
        for (id, production) in grammar.productions.iter().enumerate() {
            by_lhs[production.lhs.index() - terminal_count].push(id as u32);
        }
        let mut builder = Self {
            grammar,
            terminal_count,
            by_lhs,
            first: vec![TerminalSet::new(terminal_count); nonterminal_count],
            nullable: vec![false; nonterminal_count],
        };
        builder.compute_first_sets();
        builder
    }

    fn is_terminal(&self, symbol: SymbolId) -> bool {
        symbol.index() < self.terminal_count
    }

    fn compute_first_sets(&mut self) {
        let grammar = self.grammar;
        let mut changed = true;
        while changed {
            changed = false;
            for production in &grammar.productions {
                let lhs = production.lhs.index() - self.terminal_count;
                let mut all_nullable = true;
                for &symbol in production.rhs.iter() {
                    if self.is_terminal(symbol) {
                        changed |= self.first[lhs].insert(symbol);
                        all_nullable = false;
                        break;
                    }
                    let inner = symbol.index() - self.terminal_count;
                    if inner != lhs {
                        let other = self.first[inner].clone();
                        changed |= self.first[lhs].union_with(&other);
                    }
                    if !self.nullable[inner] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !self.nullable[lhs] {
                    self.nullable[lhs] = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of a symbol string and whether the whole string is nullable
    fn first_of(&self, symbols: &[SymbolId]) -> (TerminalSet, bool) {
        let mut set = TerminalSet::new(self.terminal_count);
        for &symbol in symbols {
            if self.is_terminal(symbol) {
                set.insert(symbol);
                return (set, false);
            }
            let inner = symbol.index() - self.terminal_count;
            set.union_with(&self.first[inner]);
            if !self.nullable[inner] {
                return (set, false);
            }
        }
        (set, true)
    }

    fn rhs(&self, item: Item) -> &[SymbolId] {
        &self.grammar.productions[item.production as usize].rhs
    }

    fn closure(&self, kernel: &[(Item, TerminalSet)]) -> Kernel {
        let mut items: Kernel = kernel.to_vec();
        let mut index: FxHashMap<Item, usize> = FxHashMap::default();
        for (i, (item, _)) in items.iter().enumerate() {
            index.insert(*item, i);
        }
        let mut pending: Vec<usize> = (0..items.len()).collect();
        while let Some(i) = pending.pop() {
            let (item, lookahead) = items[i].clone();
            let rhs = self.rhs(item);
            let Some(&next) = rhs.get(item.dot as usize) else {
                continue;
            };
            if self.is_terminal(next) {
                continue;
            }
            let (mut follow, nullable) = self.first_of(&rhs[item.dot as usize + 1..]);
            if nullable {
                follow.union_with(&lookahead);
            }
            for &production in &self.by_lhs[next.index() - self.terminal_count] {
                let new_item = Item { production, dot: 0 };
                match index.get(&new_item) {
                    Some(&j) => {
                        if items[j].1.union_with(&follow) {
                            pending.push(j);
                        }
                    }
                    None => {
                        index.insert(new_item, items.len());
                        pending.push(items.len());
                        items.push((new_item, follow.clone()));
                    }
                }
            }
        }
        items
    }

    fn item_sets(&self) -> (Vec<Kernel>, Vec<Vec<(SymbolId, usize)>>) {
        let mut start_lookahead = TerminalSet::new(self.terminal_count);
        start_lookahead.insert(SymbolId::END);
        let mut kernels: Vec<Kernel> = vec![vec![(Item::START, start_lookahead)]];
        let mut transitions: Vec<Vec<(SymbolId, usize)>> = vec![Vec::new()];
        let mut cores: FxHashMap<Vec<Item>, usize> = FxHashMap::default();
        cores.insert(vec![Item::START], 0);
        let mut queue = VecDeque::from([0usize]);
        let mut queued = vec![true];

        while let Some(state) = queue.pop_front() {
            queued[state] = false;
            let closure = self.closure(&kernels[state]);
            let mut successors: BTreeMap<SymbolId, Kernel> = BTreeMap::new();
            for (item, lookahead) in closure {
                if let Some(&symbol) = self.rhs(item).get(item.dot as usize) {
                    let advanced = Item {
                        production: item.production,
                        dot: item.dot + 1,
                    };
                    successors
                        .entry(symbol)
                        .or_default()
                        .push((advanced, lookahead));
                }
            }

            let mut edges = Vec::with_capacity(successors.len());
            for (symbol, mut kernel) in successors {
                kernel.sort_by_key(|(item, _)| *item);
                let core: Vec<Item> = kernel.iter().map(|(item, _)| *item).collect();
                let target = match cores.get(&core) {
                    Some(&target) => {
                        let mut grew = false;
                        let merged = kernel.iter().zip(kernels[target].iter_mut());
                        for ((_, lookahead), (_, existing)) in merged {
                            grew |= existing.union_with(lookahead);
                        }
                        if grew && !queued[target] {
                            queued[target] = true;
                            queue.push_back(target);
                        }
                        target
                    }
                    None => {
                        let target = kernels.len();
                        kernels.push(kernel);
                        transitions.push(Vec::new());
                        cores.insert(core, target);
                        queued.push(true);
                        queue.push_back(target);
                        target
                    }
                };
                edges.push((symbol, target));
            }
            transitions[state] = edges;
        }
        (kernels, transitions)
    }

    fn tables(&self, kernels: &[Kernel], transitions: &[Vec<(SymbolId, usize)>]) -> BuiltTables {
        let terminal_count = self.terminal_count;
        let nonterminal_count = self.grammar.symbols.len() - terminal_count;
        let state_count = kernels.len();
        let mut actions: Vec<Box<[Action]>> = Vec::with_capacity(state_count * terminal_count);
        let mut gotos = vec![NO_GOTO; state_count * nonterminal_count];
        let mut conflicts = Vec::new();

        for (state, kernel) in kernels.iter().enumerate() {
            let mut reduces: Vec<Vec<ProductionId>> = vec![Vec::new(); terminal_count];
            let mut accept = vec![false; terminal_count];
            // Highest precedence among items that would shift each terminal,
            // and the rules those items belong to
            let mut shift_prec: Vec<Option<i32>> = vec![None; terminal_count];
            let mut shift_owners: Vec<Vec<SymbolId>> = vec![Vec::new(); terminal_count];

            for (item, lookahead) in self.closure(kernel) {
                let production = &self.grammar.productions[item.production as usize];
                match production.rhs.get(item.dot as usize) {
                    Some(&next) if self.is_terminal(next) => {
                        let slot = &mut shift_prec[next.index()];
                        let precedence = production.precedence;
                        *slot = Some(slot.map_or(precedence, |p| p.max(precedence)));
                        shift_owners[next.index()].push(production.lhs);
                    }
                    Some(_) => {}
                    None if item.production == 0 => accept[SymbolId::END.index()] = true,
                    None => {
                        for terminal in lookahead.iter() {
                            reduces[terminal.index()].push(ProductionId(item.production));
                        }
                    }
                }
            }

            let mut shifts: Vec<Option<StateId>> = vec![None; terminal_count];
            for &(symbol, target) in &transitions[state] {
                if self.is_terminal(symbol) {
                    shifts[symbol.index()] = Some(StateId(target as u32));
                } else {
                    let column = symbol.index() - terminal_count;
                    gotos[state * nonterminal_count + column] = target as u32;
                }
            }

            for terminal in 0..terminal_count {
                let mut cell_reduces = std::mem::take(&mut reduces[terminal]);
                cell_reduces.sort_unstable();
                cell_reduces.dedup();
                let cell = self.resolve(
                    shifts[terminal],
                    shift_prec[terminal].unwrap_or(0),
                    cell_reduces,
                    accept[terminal],
                );
                if cell.len() > 1 {
                    let lookahead = SymbolId(terminal as u16);
                    let expected = self.is_expected(&cell, &shift_owners[terminal]);
                    conflicts.push(Conflict {
                        state: StateId(state as u32),
                        lookahead,
                        actions: cell.clone(),
                        expected,
                    });
                }
                actions.push(cell.into_boxed_slice());
            }
        }

        BuiltTables {
            state_count,
            actions,
            gotos,
            conflicts,
        }
    }

    /// Apply precedence and associativity to one action cell.
    fn resolve(
        &self,
        shift: Option<StateId>,
        shift_prec: i32,
        mut reduces: Vec<ProductionId>,
        accept: bool,
    ) -> Vec<Action> {
        let precedence = |id: &ProductionId| self.grammar.productions[id.index()].precedence;

        // Reduce/reduce: only the highest precedence survives
        if let Some(max) = reduces.iter().map(precedence).max() {
            reduces.retain(|id| precedence(id) == max);
        }

        let mut keep_shift = shift.is_some();
        if shift.is_some() && !reduces.is_empty() {
            let mut kept = Vec::with_capacity(reduces.len());
            for id in reduces {
                let production = &self.grammar.productions[id.index()];
                match production.precedence.cmp(&shift_prec) {
                    std::cmp::Ordering::Greater => {
                        keep_shift = false;
                        kept.push(id);
                    }
                    std::cmp::Ordering::Less => {}
                    std::cmp::Ordering::Equal => match production.assoc {
                        Assoc::Left => {
                            keep_shift = false;
                            kept.push(id);
                        }
                        Assoc::Right => {}
                        Assoc::None => kept.push(id),
                    },
                }
            }
            reduces = kept;
        }

        let mut cell = Vec::with_capacity(reduces.len() + 2);
        if let Some(target) = shift.filter(|_| keep_shift) {
            cell.push(Action::Shift(target));
        }
        cell.extend(reduces.into_iter().map(Action::Reduce));
        if accept {
            cell.push(Action::Accept);
        }
        cell
    }

    fn is_expected(&self, cell: &[Action], shift_owners: &[SymbolId]) -> bool {
        let mut involved: Vec<SymbolId> = cell
            .iter()
            .filter_map(|action| match action {
                Action::Reduce(id) => Some(self.grammar.productions[id.index()].lhs),
                _ => None,
            })
            .collect();
        if cell.iter().any(|action| matches!(action, Action::Shift(_))) {
            involved.extend_from_slice(shift_owners);
        }
        involved.sort_unstable();
        involved.dedup();
        self.grammar
            .expected_conflicts
            .iter()
            .any(|group| involved.iter().all(|symbol| group.contains(symbol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, choice, prec_left, prec_right, repeat, seq, string, sym};
    use crate::table::lower::lower;

    fn sum_grammar(rule: crate::grammar::Rule) -> Grammar {
        Grammar::new("sum")
            .rule("expr", choice([rule, sym("NUMBER")]))
            .token("NUMBER", crate::grammar::pattern(r"\d+"))
    }

    fn binary() -> crate::grammar::Rule {
        seq([sym("expr"), string("+"), sym("expr")])
    }

    #[test]
    fn test_terminal_set() {
        let mut set = TerminalSet::new(70);
        assert!(set.insert(SymbolId(3)));
        assert!(!set.insert(SymbolId(3)));
        assert!(set.insert(SymbolId(65)));
        let mut other = TerminalSet::new(70);
        other.insert(SymbolId(10));
        assert!(set.union_with(&other));
        assert!(!set.union_with(&other));
        let members: Vec<SymbolId> = set.iter().collect();
        assert_eq!(members, [SymbolId(3), SymbolId(10), SymbolId(65)]);
    }

    #[test]
    fn test_ambiguous_sum_keeps_conflict() {
        let lowered = lower(&sum_grammar(binary())).unwrap();
        let tables = build(&lowered);
        assert_eq!(tables.conflicts.len(), 1);
        let conflict = &tables.conflicts[0];
        assert_eq!(lowered.symbols[conflict.lookahead.index()].name, "+");
        assert!(matches!(conflict.actions[0], Action::Shift(_)));
        assert!(matches!(conflict.actions[1], Action::Reduce(_)));
        assert!(!conflict.expected);
    }

    #[test]
    fn test_associativity_resolves_conflict() {
        for rule in [prec_left(1, binary()), prec_right(1, binary())] {
            let lowered = lower(&sum_grammar(rule)).unwrap();
            assert!(build(&lowered).conflicts.is_empty());
        }
    }

    #[test]
    fn test_declared_conflict_is_expected() {
        let grammar = sum_grammar(binary()).conflict(["expr"]);
        let lowered = lower(&grammar).unwrap();
        let tables = build(&lowered);
        assert!(tables.conflicts.iter().all(|c| c.expected));
    }

    #[test]
    fn test_accept_on_end() {
        let grammar = Grammar::new("list").rule("list", repeat(string("x")));
        let lowered = lower(&grammar).unwrap();
        let tables = build(&lowered);
        let t = lowered.terminal_count;
        let accepts = (0..tables.state_count)
            .filter(|state| tables.actions[state * t].contains(&Action::Accept))
            .count();
        assert_eq!(accepts, 1);
        // The empty list is accepted: state 0 reduces on end
        assert!(matches!(tables.actions[0][0], Action::Reduce(_)));
    }
}
