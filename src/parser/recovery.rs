//! Panic-mode error recovery
//!
//! When every version fails, the first failed version is unwound to the
//! last statement boundary: a frame ending in a synchronizing token or
//! holding a context-stable node. Input is then skipped up to a
//! synchronizing token and the parse resumes at the first point where the
//! remaining input can continue. Everything discarded on the way becomes
//! one `ERROR` node, pushed as an extra so the automaton state is the one
//! below it.

use std::rc::Rc;

use tracing::debug;

use super::glr::{Driver, Phase};
use super::stack::{self, Link};
use crate::lexer::Token;
use crate::table::{Action, StateId, SymbolId};
use crate::tree::Subtree;

/// How many frames below the boundary recovery will unwind
const MAX_UNWIND: usize = 32;

/// Input skipped so far, split at the last significant token
#[derive(Debug, Default, Clone)]
struct Skipped {
    /// Skipped tokens with the extras between them
    tokens: Vec<Subtree>,
    /// Extras lexed after the last skipped token
    pending: Vec<Subtree>,
}

impl Skipped {
    fn skip(&mut self, leaf: Subtree) {
        self.tokens.append(&mut self.pending);
        self.tokens.push(leaf);
    }
}

impl Driver<'_> {
    pub(super) fn recover(&mut self, failed: Rc<Link>, token: Token) -> Phase {
        let failure_state = failed.state();
        let boundary = self.boundary(&failed);
        let base = lowest_unwind(&failed, &boundary);
        debug!(
            state = failure_state.0,
            position = token.start(),
            lookahead = self.table.symbol_name(token.kind),
            unwound = failed.depth() - base.depth(),
            "error recovery"
        );

        let mut bases = vec![base.clone()];
        let mut deeper = base;
        while bases.len() <= MAX_UNWIND {
            let Some(next) = below_frame(&deeper) else {
                break;
            };
            bases.push(next.clone());
            deeper = next;
        }

        let mut skipped = Skipped::default();
        let mut current = token;
        loop {
            let sync_point = current.is_end()
                || !self.table.has_sync_tokens()
                || self.table.is_sync(current.kind);
            if sync_point {
                let resumed = self.try_resume(&failed, &bases, &skipped, current, failure_state);
                if let Some(phase) = resumed {
                    return phase;
                }
            }
            if current.is_end() {
                return self.give_up(&failed, &bases[0], skipped);
            }
            skipped.skip(self.leaf(&current, failure_state, true));
            let (extras, next) = self.next_significant(current.end(), bases[0].state());
            skipped.pending = extras;
            current = next;
        }
    }

    /// Resume at `current`, or just after it, on the shallowest base that
    /// can continue there.
    fn try_resume(
        &mut self,
        failed: &Rc<Link>,
        bases: &[Rc<Link>],
        skipped: &Skipped,
        current: Token,
        failure_state: StateId,
    ) -> Option<Phase> {
        let stalled = self.stalled_at == Some(current.start());
        for base in bases {
            let unwound = !Rc::ptr_eq(base, failed) && !only_extras_between(failed, base);
            let progress = unwound || !skipped.tokens.is_empty();
            if progress && !stalled && self.can_continue(base, current.kind) {
                return Some(self.resume(
                    failed,
                    base,
                    skipped.clone(),
                    current.start(),
                    failure_state,
                ));
            }
            if current.is_end() {
                continue;
            }
            let mut skipping = skipped.clone();
            skipping.skip(self.leaf(&current, failure_state, true));
            let (extras, next) = self.next_significant(current.end(), base.state());
            skipping.pending = extras;
            if self.can_continue(base, next.kind) {
                return Some(self.resume(failed, base, skipping, next.start(), failure_state));
            }
        }
        None
    }

    /// Replace everything above `base` and the skipped input with an
    /// `ERROR` node and continue lexing at `position`.
    fn resume(
        &mut self,
        failed: &Rc<Link>,
        base: &Rc<Link>,
        skipped: Skipped,
        position: usize,
        failure_state: StateId,
    ) -> Phase {
        let Skipped {
            tokens,
            mut pending,
        } = skipped;
        let skipped_input = !tokens.is_empty();
        let mut children = frames_above(failed, base);
        children.extend(tokens);
        // Extras at the end of the discarded input stay outside the error
        let trailing_extra = |c: &Subtree| c.is_extra() && !c.is_error();
        while children.last().is_some_and(trailing_extra) {
            if let Some(extra) = children.pop() {
                pending.insert(0, extra);
            }
        }
        debug!(
            position,
            discarded = children.len(),
            skipped_input,
            "resuming after error"
        );
        let error = Subtree::error(children, failure_state);
        let link = stack::push_extra(base, error);
        self.versions = vec![stack::push_all(&link, pending)];
        self.position = position;
        self.stalled_at = (!skipped_input).then_some(position);
        Phase::Shifting
    }

    /// Nothing can continue before the end of input: wrap what was parsed
    /// under a root of the start rule.
    fn give_up(&mut self, failed: &Rc<Link>, base: &Rc<Link>, skipped: Skipped) -> Phase {
        let mut children = stack::subtrees(base);
        let mut discarded = frames_above(failed, base);
        discarded.extend(skipped.tokens);
        children.push(Subtree::error(discarded, failed.state()));
        children.extend(skipped.pending);
        debug!(
            position = self.position,
            "no recovery point before end of input"
        );
        self.position = self.text.len();
        let root = Subtree::node(
            self.table.start_symbol(),
            None,
            0,
            children,
            StateId::START,
            SymbolId::END,
            true,
        );
        Phase::Accept(root)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Extras and unrecognized input from `position` up to the next
    /// significant token, lexed as seen from `state`.
    fn next_significant(&mut self, position: usize, state: StateId) -> (Vec<Subtree>, Token) {
        self.fill_mask(&[state]);
        let mut extras = Vec::new();
        let mut position = position;
        loop {
            let token = self.lex_at(position);
            if !(token.is_extra || token.is_error()) {
                return (extras, token);
            }
            extras.push(self.leaf(&token, state, true));
            position = token.end();
        }
    }

    /// Topmost frame that ends a statement, or the bottom of the stack.
    /// Without sync or stable declarations the top itself.
    fn boundary(&self, top: &Rc<Link>) -> Rc<Link> {
        if !self.table.has_recovery_boundaries() {
            return top.clone();
        }
        let mut link = top;
        while let Link::Frame { subtree, prev, .. } = &**link {
            if !subtree.is_extra() && self.is_boundary(subtree) {
                return link.clone();
            }
            link = prev;
        }
        link.clone()
    }

    fn is_boundary(&self, node: &Subtree) -> bool {
        let mut node = node;
        loop {
            if self.table.is_stable(node.kind()) {
                return true;
            }
            if node.is_leaf() {
                return self.table.is_sync(node.kind());
            }
            if self.table.is_visible(node.kind()) {
                return false;
            }
            // Hidden rules (repetitions) end where their last child ends
            match node.children().iter().rev().find(|child| !child.is_extra()) {
                Some(last) => node = last,
                None => return false,
            }
        }
    }

    /// Whether the stack `base` can make progress on `lookahead`, following
    /// the first reduction of each cell.
    fn can_continue(&self, base: &Rc<Link>, lookahead: SymbolId) -> bool {
        let mut lower = base.clone();
        let mut upper: Vec<StateId> = Vec::new();
        let limit = 4 * base.depth() + 256;
        for _ in 0..limit {
            let state = upper.last().copied().unwrap_or_else(|| lower.state());
            let mut reduction = None;
            for action in self.table.actions(state, lookahead) {
                match action {
                    Action::Shift(_) | Action::Accept => return true,
                    Action::Reduce(id) => reduction = reduction.or(Some(*id)),
                }
            }
            let Some(id) = reduction else {
                return false;
            };
            let production = self.table.production(id);
            for _ in 0..production.rhs.len() {
                if upper.pop().is_some() {
                    continue;
                }
                match below_frame(&lower) {
                    Some(next) => lower = next,
                    None => return false,
                }
            }
            let below = upper.last().copied().unwrap_or_else(|| lower.state());
            match self.table.goto(below, production.lhs) {
                Some(next) => upper.push(next),
                None => return false,
            }
        }
        false
    }
}

/// The stack below the topmost significant frame, extras above it dropped.
fn below_frame(link: &Rc<Link>) -> Option<Rc<Link>> {
    let mut link = link;
    loop {
        match &**link {
            Link::Bottom { .. } => return None,
            Link::Frame { subtree, prev, .. } => {
                if !subtree.is_extra() {
                    return Some(prev.clone());
                }
                link = prev;
            }
        }
    }
}

/// Unwind `top` to `boundary`, keeping the extras directly above the
/// boundary on the stack.
fn lowest_unwind(top: &Rc<Link>, boundary: &Rc<Link>) -> Rc<Link> {
    let mut base = top.clone();
    let mut link = top;
    while !Rc::ptr_eq(link, boundary) {
        let Link::Frame { subtree, prev, .. } = &**link else {
            break;
        };
        if !subtree.is_extra() {
            base = prev.clone();
        }
        link = prev;
    }
    base
}

/// Subtrees between `base` (exclusive) and `top`, bottom first
fn frames_above(top: &Rc<Link>, base: &Rc<Link>) -> Vec<Subtree> {
    let mut out = Vec::new();
    let mut link = top;
    while !Rc::ptr_eq(link, base) {
        let Link::Frame { subtree, prev, .. } = &**link else {
            break;
        };
        out.push(subtree.clone());
        link = prev;
    }
    out.reverse();
    out
}

fn only_extras_between(top: &Rc<Link>, base: &Rc<Link>) -> bool {
    let mut link = top;
    while !Rc::ptr_eq(link, base) {
        let Link::Frame { subtree, prev, .. } = &**link else {
            return true;
        };
        if !subtree.is_extra() {
            return false;
        }
        link = prev;
    }
    true
}
