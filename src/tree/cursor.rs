//! Stateful walk over visible nodes

use super::Node;

/// A cursor over a tree's visible nodes, starting at the node it was
/// created from. It never moves above that node.
#[derive(Debug, Clone)]
pub struct TreeCursor<'t> {
    /// Sibling lists from the start node down, with the current index in each
    levels: Vec<(Vec<Node<'t>>, usize)>,
}

impl<'t> TreeCursor<'t> {
    pub fn new(node: Node<'t>) -> Self {
        Self {
            levels: vec![(vec![node], 0)],
        }
    }

    pub fn node(&self) -> Node<'t> {
        let (siblings, index) = self.current_level();
        siblings[*index].clone()
    }

    /// Levels below the start node
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn goto_first_child(&mut self) -> bool {
        let children = self.node().children();
        if children.is_empty() {
            return false;
        }
        self.levels.push((children, 0));
        true
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        if self.levels.len() == 1 {
            return false;
        }
        let Some((siblings, index)) = self.levels.last_mut() else {
            return false;
        };
        if *index + 1 < siblings.len() {
            *index += 1;
            true
        } else {
            false
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.levels.len() == 1 {
            return false;
        }
        self.levels.pop();
        true
    }

    /// Move to the first child ending after `offset`, returning its index.
    pub fn goto_first_child_for_byte(&mut self, offset: usize) -> Option<usize> {
        let children = self.node().children();
        let index = children.iter().position(|child| child.end_byte() > offset)?;
        self.levels.push((children, index));
        Some(index)
    }

    fn current_level(&self) -> (&Vec<Node<'t>>, &usize) {
        let (siblings, index) = &self.levels[self.levels.len() - 1];
        (siblings, index)
    }
}

/// Pre-order iterator over visible nodes
pub struct PreorderIter<'t> {
    cursor: TreeCursor<'t>,
    done: bool,
}

impl<'t> PreorderIter<'t> {
    pub(crate) fn new(node: Node<'t>) -> Self {
        Self {
            cursor: TreeCursor::new(node),
            done: false,
        }
    }
}

impl<'t> Iterator for PreorderIter<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Node<'t>> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if self.cursor.goto_first_child() {
            return Some(node);
        }
        loop {
            if self.cursor.goto_next_sibling() {
                return Some(node);
            }
            if !self.cursor.goto_parent() {
                self.done = true;
                return Some(node);
            }
        }
    }
}
