//! The GLR driver
//!
//! One token at a time: lex with the union of what every live stack version
//! can accept, push extras on every version, then run each version's
//! actions for the token. A cell with several actions forks the version.
//! After the shift, versions that reached identical state sequences are
//! merged, keeping the preferred tree.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::ParseOptions;
use super::reuse::ReuseCursor;
use super::stack::{self, Link};
use crate::lexer::{ExternalScanner, LexState, Token};
use crate::table::{Action, GrammarTable, ProductionId, StateId, SymbolId};
use crate::tree::{Subtree, TreeStatus};

/// Reductions allowed per token and stack frame before a version is
/// considered stuck (only cyclic grammars get there)
const REDUCTIONS_PER_FRAME: usize = 8;

#[derive(Debug)]
pub(crate) enum Phase {
    /// Lex the next token, pushing extras as they come
    Shifting,
    /// Run every version's actions for a significant token
    Reducing(Token),
    /// Every version failed on `token`
    ErrorRecovery { failed: Rc<Link>, token: Token },
    /// Finished, with the root node
    Accept(Subtree),
}

#[derive(Debug)]
pub(crate) struct Outcome {
    pub root: Subtree,
    pub status: TreeStatus,
    pub consumed: usize,
}

pub(crate) struct Driver<'a> {
    pub(super) table: &'a GrammarTable,
    scanner: Option<&'a dyn ExternalScanner>,
    pub(super) text: &'a str,
    options: &'a ParseOptions,
    pub(super) versions: Vec<Rc<Link>>,
    pub(super) position: usize,
    reuse: Option<ReuseCursor>,
    /// Where the last zero-width token was produced; another may not follow
    pub(super) empty_token_at: Option<usize>,
    /// Where the last recovery resumed without skipping any input
    pub(super) stalled_at: Option<usize>,
    /// Valid external tokens for the next lex
    mask: Vec<bool>,
}

impl<'a> Driver<'a> {
    pub fn new(
        table: &'a GrammarTable,
        scanner: Option<&'a dyn ExternalScanner>,
        text: &'a str,
        options: &'a ParseOptions,
        reuse: Option<&Subtree>,
    ) -> Self {
        Self {
            table,
            scanner,
            text,
            options,
            versions: vec![Link::bottom(StateId::START)],
            position: 0,
            reuse: reuse.map(ReuseCursor::new),
            empty_token_at: None,
            stalled_at: None,
            mask: vec![false; table.externals().len()],
        }
    }

    pub fn run(mut self) -> Outcome {
        debug!(
            grammar = self.table.name(),
            bytes = self.text.len(),
            reuse = self.reuse.is_some(),
            "parse started"
        );
        let mut phase = Phase::Shifting;
        loop {
            phase = match phase {
                Phase::Shifting => {
                    if self.options.exhausted(self.position, self.text.len()) {
                        return self.cancel();
                    }
                    self.next_token()
                }
                Phase::Reducing(token) => self.advance(token),
                Phase::ErrorRecovery { failed, token } => self.recover(failed, token),
                Phase::Accept(root) => return self.finish(root),
            };
        }
    }

    // =========================================================================
    // Lexing
    // =========================================================================

    pub(super) fn fill_mask(&mut self, states: &[StateId]) {
        self.mask.fill(false);
        for &state in states {
            self.table.valid_externals(state, &mut self.mask);
        }
    }

    fn fill_mask_for_versions(&mut self) {
        self.mask.fill(false);
        for version in &self.versions {
            self.table.valid_externals(version.state(), &mut self.mask);
        }
    }

    /// Lex at `position` with the current mask.
    pub(super) fn lex_at(&mut self, position: usize) -> Token {
        let state = LexState {
            scanner: self.scanner,
            valid_externals: &self.mask,
            recovering: false,
            forbid_empty: self.empty_token_at == Some(position),
        };
        let token = self.table.lexer().next_token(self.text, position, &state);
        if token.is_empty() && !token.is_end() {
            self.empty_token_at = Some(position);
        }
        token
    }

    pub(super) fn leaf(&self, token: &Token, state: StateId, fragile: bool) -> Subtree {
        Subtree::leaf(
            token.kind,
            token.range.len(),
            token.lookahead,
            state,
            token.is_extra,
            fragile,
        )
    }

    fn next_token(&mut self) -> Phase {
        self.fill_mask_for_versions();
        let token = self.lex_at(self.position);
        if !token.is_extra && !token.is_error() {
            return Phase::Reducing(token);
        }
        // Extras and unrecognized input ride along on every version
        let state = self.versions.first().map_or(StateId::START, |v| v.state());
        let leaf = self.leaf(&token, state, self.versions.len() > 1);
        for version in &mut self.versions {
            *version = stack::push_extra(version, leaf.clone());
        }
        self.position = token.end();
        Phase::Shifting
    }

    // =========================================================================
    // Actions
    // =========================================================================

    fn advance(&mut self, token: Token) -> Phase {
        let table = self.table;
        let ambiguous = self.versions.len() > 1;
        let first = self.versions.first().cloned();
        let depth: usize = self.versions.iter().map(|v| v.depth() + 1).sum();
        let mut budget = REDUCTIONS_PER_FRAME * (depth + 16);

        let mut work: VecDeque<(Rc<Link>, bool)> =
            self.versions.drain(..).map(|v| (v, ambiguous)).collect();
        let mut shifted = Vec::new();
        let mut accepted = Vec::new();
        let mut failed = Vec::new();
        let mut reused_end = None;

        while let Some((top, forked)) = work.pop_front() {
            let actions = table.actions(top.state(), token.kind);
            if actions.is_empty() {
                failed.push(top);
                continue;
            }
            let forked = forked || actions.len() > 1;
            if actions.len() > 1 {
                trace!(
                    state = top.state().0,
                    lookahead = table.symbol_name(token.kind),
                    actions = actions.len(),
                    "fork"
                );
            }
            for &action in actions {
                match action {
                    Action::Shift(state) => {
                        if !forked && work.is_empty() && shifted.is_empty() {
                            if let Some((link, end)) = self.try_reuse(&top, &token) {
                                shifted.push(link);
                                reused_end = Some(end);
                                continue;
                            }
                        }
                        let leaf = self.leaf(&token, top.state(), forked);
                        shifted.push(stack::push(&top, state, leaf));
                    }
                    Action::Reduce(production) => {
                        if budget == 0 {
                            failed.push(top.clone());
                            continue;
                        }
                        budget -= 1;
                        match self.reduce(&top, production, token.kind, forked) {
                            Some(link) => work.push_back((link, forked)),
                            None => failed.push(top.clone()),
                        }
                    }
                    Action::Accept => accepted.push(top.clone()),
                }
            }
        }
        if budget == 0 {
            warn!(
                position = token.start(),
                "reduction limit reached, treating versions as failed"
            );
        }

        if !shifted.is_empty() {
            self.versions = self.merge(shifted);
            self.position = reused_end.unwrap_or_else(|| token.end());
            self.stalled_at = None;
            return Phase::Shifting;
        }
        if let Some(root) = self.select_accepted(accepted) {
            return Phase::Accept(root);
        }
        match failed.into_iter().next().or(first) {
            Some(failed) => Phase::ErrorRecovery { failed, token },
            None => Phase::ErrorRecovery {
                failed: Link::bottom(StateId::START),
                token,
            },
        }
    }

    /// Apply `production` to `top`. `None` if the stack cannot take it.
    pub(super) fn reduce(
        &self,
        top: &Rc<Link>,
        id: ProductionId,
        lookahead: SymbolId,
        fragile: bool,
    ) -> Option<Rc<Link>> {
        let production = self.table.production(id);
        let popped = stack::pop(top, production.rhs.len())?;
        let base_state = popped.base.state();
        let state = self.table.goto(base_state, production.lhs)?;
        let node = Subtree::node(
            production.lhs,
            Some(id),
            production.precedence,
            popped.children,
            base_state,
            lookahead,
            fragile,
        );
        let link = stack::push(&popped.base, state, node);
        Some(stack::push_all(&link, popped.trailing))
    }

    // =========================================================================
    // Reuse
    // =========================================================================

    /// Push an old subtree in place of shifting `token`, when the old parse
    /// provably built it from the same state and lookahead.
    fn try_reuse(&mut self, top: &Rc<Link>, token: &Token) -> Option<(Rc<Link>, usize)> {
        if token.is_end() {
            return None;
        }
        let candidates = self.reuse.as_mut()?.candidates(token.start());
        let state = top.state();
        for node in candidates {
            if !reusable(&node, state, token) {
                continue;
            }
            let Some(goto) = self.table.goto(state, node.kind()) else {
                continue;
            };
            let end = token.start() + node.len();
            if self.follow_at(end, goto) != node.follow() {
                continue;
            }
            trace!(
                kind = self.table.symbol_name(node.kind()),
                start = token.start(),
                end,
                "reused subtree"
            );
            return Some((stack::push(top, goto, node), end));
        }
        None
    }

    /// Kind of the first significant token at or after `position`.
    pub(super) fn follow_at(&mut self, position: usize, state: StateId) -> SymbolId {
        self.fill_mask(&[state]);
        let mut position = position;
        loop {
            let token = self.lex_at(position);
            if !(token.is_extra || token.is_error()) || token.is_empty() {
                return token.kind;
            }
            position = token.end();
        }
    }

    // =========================================================================
    // Merging
    // =========================================================================

    fn merge(&self, candidates: Vec<Rc<Link>>) -> Vec<Rc<Link>> {
        let mut merged: Vec<Rc<Link>> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let existing = merged
                .iter()
                .position(|kept| stack::same_states(kept, &candidate));
            match existing {
                Some(index) => {
                    trace!(position = self.position, "merged versions");
                    if self.compare(&candidate, &merged[index]) == Ordering::Greater {
                        merged[index] = candidate;
                    }
                }
                None => merged.push(candidate),
            }
        }
        let limit = self.options.version_limit();
        if merged.len() > limit {
            debug!(versions = merged.len(), limit, "dropping stack versions");
            merged.truncate(limit);
        }
        merged
    }

    /// `Greater` when `a`'s tree is preferred: higher summed precedence,
    /// then the earlier declared productions in pre-order.
    fn compare(&self, a: &Rc<Link>, b: &Rc<Link>) -> Ordering {
        let (above_a, above_b) = stack::divergent(a, b);
        let precedence =
            |nodes: &[Subtree]| nodes.iter().map(Subtree::dynamic_precedence).sum::<i32>();
        precedence(&above_a)
            .cmp(&precedence(&above_b))
            .then_with(|| Productions::new(&above_b).cmp(Productions::new(&above_a)))
    }

    fn select_accepted(&self, accepted: Vec<Rc<Link>>) -> Option<Subtree> {
        let mut best: Option<Rc<Link>> = None;
        for candidate in accepted {
            best = match best {
                Some(current) if self.compare(&candidate, &current) != Ordering::Greater => {
                    Some(current)
                }
                _ => Some(candidate),
            };
        }
        let popped = stack::pop(&best?, 1)?;
        let start = popped.children.into_iter().find(|child| !child.is_extra())?;
        let leading = stack::subtrees(&popped.base);
        Some(start.with_extras(leading, popped.trailing))
    }

    // =========================================================================
    // Results
    // =========================================================================

    fn finish(&self, root: Subtree) -> Outcome {
        let status = if root.has_error() {
            TreeStatus::CompleteWithErrors
        } else {
            TreeStatus::Complete
        };
        debug!(grammar = self.table.name(), ?status, "parse finished");
        Outcome {
            root,
            status,
            consumed: self.text.len(),
        }
    }

    /// The partial tree over everything consumed so far.
    fn cancel(&self) -> Outcome {
        let children = self
            .versions
            .first()
            .map(stack::subtrees)
            .unwrap_or_default();
        let root = Subtree::node(
            self.table.start_symbol(),
            None,
            0,
            children,
            StateId::START,
            SymbolId::END,
            true,
        );
        debug!(
            grammar = self.table.name(),
            consumed = self.position,
            "parse cancelled"
        );
        Outcome {
            root,
            status: TreeStatus::Cancelled,
            consumed: self.position,
        }
    }
}

fn reusable(node: &Subtree, state: StateId, token: &Token) -> bool {
    node.len() > 0
        && node.production().is_some()
        && node.parse_state() == state
        && !node.has_changes()
        && !node.has_error()
        && !node.is_extra()
        && !node.is_fragile()
        && node
            .first_leaf()
            .is_some_and(|leaf| leaf.kind() == token.kind && leaf.len() == token.len())
}

/// Production ids of a forest in pre-order
struct Productions<'s> {
    pending: Vec<&'s Subtree>,
}

impl<'s> Productions<'s> {
    fn new(nodes: &'s [Subtree]) -> Self {
        Self {
            pending: nodes.iter().rev().collect(),
        }
    }
}

impl Iterator for Productions<'_> {
    type Item = ProductionId;

    fn next(&mut self) -> Option<ProductionId> {
        while let Some(node) = self.pending.pop() {
            self.pending.extend(node.children().iter().rev());
            if let Some(production) = node.production() {
                return Some(production);
            }
        }
        None
    }
}
