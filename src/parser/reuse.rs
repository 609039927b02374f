//! Subtree reuse during incremental reparsing
//!
//! The cursor walks the edited old tree in step with the parser. Positions
//! only move forward, so the walk is amortized linear in the tree size.

use crate::tree::Subtree;

#[derive(Debug)]
struct Entry {
    subtree: Subtree,
    start: usize,
    /// Index among the parent's children
    index: usize,
}

#[derive(Debug)]
pub(crate) struct ReuseCursor {
    /// Path from the old root to the current node
    path: Vec<Entry>,
}

impl ReuseCursor {
    pub fn new(root: &Subtree) -> Self {
        Self {
            path: vec![Entry {
                subtree: root.clone(),
                start: 0,
                index: 0,
            }],
        }
    }

    /// Old nodes starting at `position`, outermost first.
    ///
    /// Returns nothing when `position` falls inside an old token.
    pub fn candidates(&mut self, position: usize) -> Vec<Subtree> {
        if !self.seek(position) {
            return Vec::new();
        }
        let Some(entry) = self.path.last() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut node = Some(entry.subtree.clone());
        while let Some(current) = node {
            node = current
                .children()
                .iter()
                .find(|child| child.len() > 0)
                .cloned();
            out.push(current);
        }
        out
    }

    /// Move to the outermost node starting at `position`.
    fn seek(&mut self, position: usize) -> bool {
        loop {
            let Some(entry) = self.path.last() else {
                return false;
            };
            let end = entry.start + entry.subtree.len();
            if end <= position {
                if !self.advance() {
                    return false;
                }
                continue;
            }
            if entry.start < position {
                let Some(first) = entry.subtree.children().first() else {
                    // `position` is inside a token
                    return false;
                };
                let child = Entry {
                    subtree: first.clone(),
                    start: entry.start,
                    index: 0,
                };
                self.path.push(child);
                continue;
            }
            return entry.start == position;
        }
    }

    /// Step to the next sibling of the current node, or climb until one
    /// exists. Returns `false` once the whole tree has been passed.
    fn advance(&mut self) -> bool {
        let Some(entry) = self.path.pop() else {
            return false;
        };
        let Some(parent) = self.path.last() else {
            return false;
        };
        let next = entry.index + 1;
        if let Some(sibling) = parent.subtree.children().get(next) {
            let sibling = Entry {
                subtree: sibling.clone(),
                start: entry.start + entry.subtree.len(),
                index: next,
            };
            self.path.push(sibling);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ProductionId, StateId, SymbolId};

    fn leaf(kind: u16, size: u32) -> Subtree {
        Subtree::leaf(SymbolId(kind), size.into(), 0, StateId(0), false, false)
    }

    fn node(kind: u16, children: Vec<Subtree>) -> Subtree {
        Subtree::node(
            SymbolId(kind),
            Some(ProductionId(1)),
            0,
            children,
            StateId(0),
            SymbolId::END,
            false,
        )
    }

    /// root[a[x y] b[z]] with x=[0,1) y=[1,3) z=[3,4)
    fn sample() -> Subtree {
        let a = node(11, vec![leaf(3, 1), leaf(4, 2)]);
        let b = node(12, vec![leaf(5, 1)]);
        node(10, vec![a, b])
    }

    fn kinds(nodes: &[Subtree]) -> Vec<u16> {
        nodes.iter().map(|n| n.kind().0).collect()
    }

    #[test]
    fn test_candidates_move_forward() {
        let root = sample();
        let mut cursor = ReuseCursor::new(&root);
        assert_eq!(kinds(&cursor.candidates(0)), [10, 11, 3]);
        assert_eq!(kinds(&cursor.candidates(1)), [4]);
        assert!(cursor.candidates(2).is_empty());
        assert_eq!(kinds(&cursor.candidates(3)), [12, 5]);
        assert!(cursor.candidates(4).is_empty());
        assert!(cursor.candidates(9).is_empty());
    }

    #[test]
    fn test_skipping_ahead() {
        let root = sample();
        let mut cursor = ReuseCursor::new(&root);
        assert_eq!(kinds(&cursor.candidates(3)), [12, 5]);
    }
}
