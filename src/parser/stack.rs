//! Persistent parse stacks
//!
//! A stack version is an `Rc<Link>` pointing at its top frame. Pushing
//! allocates one frame that points at the previous top, so forked versions
//! share everything below the fork point and forking costs nothing.
//!
//! Extras (whitespace, comments, `ERROR` tokens and nodes) are pushed as
//! frames carrying the state underneath them: they never move the automaton.

use std::rc::Rc;

use crate::table::StateId;
use crate::tree::Subtree;

#[derive(Debug)]
pub(crate) enum Link {
    Bottom {
        state: StateId,
    },
    Frame {
        state: StateId,
        subtree: Subtree,
        prev: Rc<Link>,
        /// Frames in this stack, this one included
        depth: usize,
    },
}

/// Result of popping the frames of one reduction
#[derive(Debug)]
pub(crate) struct Popped {
    /// The reduced node's children, interior extras included, in source order
    pub children: Vec<Subtree>,
    /// The stack below the first child
    pub base: Rc<Link>,
    /// Extras that sat above the last child
    pub trailing: Vec<Subtree>,
}

impl Link {
    pub fn bottom(state: StateId) -> Rc<Link> {
        Rc::new(Link::Bottom { state })
    }

    pub fn state(&self) -> StateId {
        match self {
            Link::Bottom { state } | Link::Frame { state, .. } => *state,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Link::Bottom { .. } => 0,
            Link::Frame { depth, .. } => *depth,
        }
    }

    pub fn subtree(&self) -> Option<&Subtree> {
        match self {
            Link::Bottom { .. } => None,
            Link::Frame { subtree, .. } => Some(subtree),
        }
    }

    pub fn prev(&self) -> Option<&Rc<Link>> {
        match self {
            Link::Bottom { .. } => None,
            Link::Frame { prev, .. } => Some(prev),
        }
    }

    /// Top frame holds an extra
    pub fn is_extra(&self) -> bool {
        self.subtree().is_some_and(Subtree::is_extra)
    }
}

pub(crate) fn push(link: &Rc<Link>, state: StateId, subtree: Subtree) -> Rc<Link> {
    Rc::new(Link::Frame {
        state,
        subtree,
        prev: link.clone(),
        depth: link.depth() + 1,
    })
}

/// Push an extra without changing state.
pub(crate) fn push_extra(link: &Rc<Link>, subtree: Subtree) -> Rc<Link> {
    push(link, link.state(), subtree)
}

pub(crate) fn push_all(link: &Rc<Link>, extras: impl IntoIterator<Item = Subtree>) -> Rc<Link> {
    extras
        .into_iter()
        .fold(link.clone(), |link, extra| push_extra(&link, extra))
}

/// Pop `count` non-extra frames, first setting aside the extras on top.
/// Returns `None` when the stack runs out first.
pub(crate) fn pop(link: &Rc<Link>, count: usize) -> Option<Popped> {
    let mut link = link.clone();
    let mut trailing = Vec::new();
    while link.is_extra() {
        let (subtree, prev) = split(&link)?;
        trailing.push(subtree);
        link = prev;
    }
    trailing.reverse();

    let mut children = Vec::new();
    let mut remaining = count;
    while remaining > 0 {
        let (subtree, prev) = split(&link)?;
        if !subtree.is_extra() {
            remaining -= 1;
        }
        children.push(subtree);
        link = prev;
    }
    children.reverse();
    Some(Popped {
        children,
        base: link,
        trailing,
    })
}

fn split(link: &Rc<Link>) -> Option<(Subtree, Rc<Link>)> {
    match &**link {
        Link::Bottom { .. } => None,
        Link::Frame { subtree, prev, .. } => Some((subtree.clone(), prev.clone())),
    }
}

/// Every subtree on the stack, bottom first
pub(crate) fn subtrees(link: &Rc<Link>) -> Vec<Subtree> {
    let mut out = Vec::with_capacity(link.depth());
    let mut link = link;
    while let Link::Frame { subtree, prev, .. } = &**link {
        out.push(subtree.clone());
        link = prev;
    }
    out.reverse();
    out
}

/// Subtrees above the part of the two stacks they share, bottom first
pub(crate) fn divergent(a: &Rc<Link>, b: &Rc<Link>) -> (Vec<Subtree>, Vec<Subtree>) {
    let (mut a, mut b) = (a.clone(), b.clone());
    let (mut above_a, mut above_b) = (Vec::new(), Vec::new());
    while a.depth() > b.depth() {
        let Some((subtree, prev)) = split(&a) else {
            break;
        };
        above_a.push(subtree);
        a = prev;
    }
    while b.depth() > a.depth() {
        let Some((subtree, prev)) = split(&b) else {
            break;
        };
        above_b.push(subtree);
        b = prev;
    }
    while !Rc::ptr_eq(&a, &b) {
        match (split(&a), split(&b)) {
            (Some((sa, pa)), Some((sb, pb))) => {
                above_a.push(sa);
                above_b.push(sb);
                a = pa;
                b = pb;
            }
            _ => break,
        }
    }
    above_a.reverse();
    above_b.reverse();
    (above_a, above_b)
}

/// Both stacks pass through the same states, extras aside
pub(crate) fn same_states(a: &Rc<Link>, b: &Rc<Link>) -> bool {
    let (mut a, mut b) = (a, b);
    loop {
        if Rc::ptr_eq(a, b) {
            return true;
        }
        while a.is_extra() {
            a = a.prev().unwrap_or(a);
        }
        while b.is_extra() {
            b = b.prev().unwrap_or(b);
        }
        if a.state() != b.state() {
            return false;
        }
        match (a.prev(), b.prev()) {
            (Some(pa), Some(pb)) => {
                a = pa;
                b = pb;
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SymbolId;

    fn token(kind: u16) -> Subtree {
        Subtree::leaf(SymbolId(kind), 1.into(), 0, StateId(0), false, false)
    }

    fn space() -> Subtree {
        Subtree::leaf(SymbolId(2), 1.into(), 0, StateId(0), true, false)
    }

    #[test]
    fn test_extras_keep_state() {
        let bottom = Link::bottom(StateId(0));
        let top = push(&bottom, StateId(4), token(3));
        let top = push_extra(&top, space());
        assert_eq!(top.state(), StateId(4));
        assert_eq!(top.depth(), 2);
    }

    #[test]
    fn test_pop_sets_aside_trailing_extras() {
        let bottom = Link::bottom(StateId(0));
        let top = push(&bottom, StateId(1), token(3));
        let top = push_extra(&top, space());
        let top = push(&top, StateId(2), token(4));
        let top = push_extra(&top, space());

        let popped = pop(&top, 2).unwrap();
        let kinds: Vec<u16> = popped.children.iter().map(|c| c.kind().0).collect();
        assert_eq!(kinds, [3, 2, 4]);
        assert_eq!(popped.trailing.len(), 1);
        assert!(popped.base.subtree().is_none());
        assert!(pop(&top, 3).is_none());

        let empty = pop(&top, 0).unwrap();
        assert!(empty.children.is_empty());
        assert_eq!(empty.base.state(), StateId(2));
    }

    #[test]
    fn test_divergent_and_same_states() {
        let bottom = Link::bottom(StateId(0));
        let shared = push(&bottom, StateId(1), token(3));
        let a = push(&shared, StateId(2), token(4));
        let b = push(&shared, StateId(2), token(5));
        let b = push_extra(&b, space());

        let (above_a, above_b) = divergent(&a, &b);
        assert_eq!(above_a.len(), 1);
        assert_eq!(above_b.len(), 2);
        assert!(same_states(&a, &b));

        let c = push(&shared, StateId(7), token(4));
        assert!(!same_states(&a, &c));
        assert_eq!(subtrees(&b).len(), 3);
    }
}
