//! Incremental reparsing
//!
//! After the edits are applied to the old tree (sizes path-copied, touched
//! nodes marked changed), two strategies are tried:
//!
//! 1. **Stable node reparse**: find the innermost context-stable node that
//!    contains every change, re-lex and re-parse just its new text starting
//!    from the parse state it was built in, check that the token after it
//!    is still the one that ended it, and splice the result in. Enclosing
//!    stable nodes are tried when an inner one cannot be reparsed alone.
//! 2. **Full parse with reuse**: parse the whole text, pushing unchanged,
//!    unambiguous old subtrees instead of re-deriving them.
//!
//! Either way the result equals a full parse of the new text.

use tracing::{debug, trace};

use crate::error::EditError;
use crate::language::GrammarHandle;
use crate::lexer::{LexState, Token};
use crate::parser::Parser;
use crate::table::{Action, GrammarTable, ProductionId, StateId, SymbolId};
use crate::tree::{InputEdit, Subtree, Tree, TreeStatus, edit_subtree};

pub(crate) fn reparse(
    parser: &Parser,
    old_tree: &Tree,
    edits: &[InputEdit],
    new_text: &str,
) -> Result<Tree, EditError> {
    let grammar = parser.grammar();
    if !grammar.same_grammar(old_tree.grammar()) {
        return Err(EditError::GrammarMismatch {
            expected: grammar.name().to_string(),
            found: old_tree.grammar().name().to_string(),
        });
    }

    let mut root = old_tree.root().clone();
    let mut len = old_tree.len();
    for edit in edits {
        edit.validate(len)?;
        root = edit_subtree(&root, edit);
        len = edit.new_len(len);
    }
    if len != new_text.len() {
        return Err(EditError::LengthMismatch {
            expected: len,
            found: new_text.len(),
        });
    }

    let version = old_tree.version() + 1;
    let deterministic = old_tree.status() == TreeStatus::Complete && !root.is_fragile();
    if deterministic && root.has_changes() {
        let mut region = Region::new(grammar, new_text);
        if let Some(new_root) = region.reparse_stable(&root) {
            return Ok(Tree::new(
                new_root,
                grammar.clone(),
                new_text,
                version,
                TreeStatus::Complete,
                new_text.len(),
            ));
        }
    }
    debug!(
        grammar = grammar.name(),
        edits = edits.len(),
        "falling back to full parse with reuse"
    );
    Ok(parser.parse_reusing(new_text, Some(&root), version))
}

/// Reparses one node's text in isolation
struct Region<'a> {
    grammar: &'a GrammarHandle,
    table: &'a GrammarTable,
    text: &'a str,
    /// Valid external tokens for the next lex
    mask: Vec<bool>,
}

/// A node on the path from the root to the edits
struct PathEntry {
    node: Subtree,
    start: usize,
    /// Index of the next entry among this node's children
    child: usize,
}

impl<'a> Region<'a> {
    fn new(grammar: &'a GrammarHandle, text: &'a str) -> Self {
        let table = grammar.table();
        Self {
            grammar,
            table,
            text,
            mask: vec![false; table.externals().len()],
        }
    }

    /// New root with the innermost reparseable stable node replaced, if any.
    fn reparse_stable(&mut self, root: &Subtree) -> Option<Subtree> {
        let path = changed_path(root);
        for depth in (0..path.len()).rev() {
            let entry = &path[depth];
            let node = &entry.node;
            if !self.table.is_stable(node.kind())
                || node.production().is_none()
                || node.is_extra()
                || node.has_error()
                || node.is_fragile()
            {
                continue;
            }
            match self.reparse_node(node, entry.start) {
                Some(replacement) => {
                    debug!(
                        kind = self.table.symbol_name(node.kind()),
                        start = entry.start,
                        end = entry.start + node.len(),
                        "reparsed stable node"
                    );
                    return Some(splice(&path[..depth], replacement));
                }
                None => trace!(
                    kind = self.table.symbol_name(node.kind()),
                    start = entry.start,
                    "stable node cannot be reparsed alone"
                ),
            }
        }
        None
    }

    /// Parse `[start, start + node.len())` of the new text as `node` again.
    fn reparse_node(&mut self, node: &Subtree, start: usize) -> Option<Subtree> {
        let end = start + node.len();
        let first_kind = node.first_leaf()?.kind();
        let mut stack = RegionStack::new(node.parse_state());
        let mut position = start;
        let mut seen_token = false;

        while position < end {
            let token = self.lex(position, stack.state());
            if token.is_error() || token.end() > end || token.is_empty() {
                return None;
            }
            if token.is_extra {
                stack.push_extra(self.leaf(&token, stack.state()));
                position = token.end();
                continue;
            }
            if !seen_token && token.kind != first_kind {
                return None;
            }
            seen_token = true;
            loop {
                match self.table.actions(stack.state(), token.kind) {
                    [Action::Shift(next)] => {
                        let leaf = self.leaf(&token, stack.state());
                        stack.push(*next, leaf);
                        break;
                    }
                    [Action::Reduce(id)] => stack.reduce(self.table, *id, token.kind)?,
                    _ => return None,
                }
            }
            position = token.end();
        }
        if !seen_token {
            return None;
        }

        let follow = self.follow_at(end, stack.state())?;
        if follow != node.follow() {
            return None;
        }
        for _ in 0..=stack.len() {
            if let Some(done) = stack.finished(node) {
                return Some(done);
            }
            match self.table.actions(stack.state(), follow) {
                [Action::Reduce(id)] => stack.reduce(self.table, *id, follow)?,
                _ => return None,
            }
        }
        None
    }

    fn follow_at(&mut self, position: usize, state: StateId) -> Option<SymbolId> {
        let mut position = position;
        loop {
            let token = self.lex(position, state);
            if !(token.is_extra || token.is_error()) {
                return Some(token.kind);
            }
            if token.is_empty() {
                return None;
            }
            position = token.end();
        }
    }

    fn lex(&mut self, position: usize, state: StateId) -> Token {
        self.mask.fill(false);
        self.table.valid_externals(state, &mut self.mask);
        let lex_state = LexState::new(self.grammar.scanner(), &self.mask);
        self.table
            .lexer()
            .next_token(self.text, position, &lex_state)
    }

    fn leaf(&self, token: &Token, state: StateId) -> Subtree {
        Subtree::leaf(
            token.kind,
            token.range.len(),
            token.lookahead,
            state,
            token.is_extra,
            false,
        )
    }
}

/// A deterministic parse stack rooted at a fixed state
struct RegionStack {
    base: StateId,
    frames: Vec<(StateId, Subtree)>,
}

impl RegionStack {
    fn new(base: StateId) -> Self {
        Self {
            base,
            frames: Vec::new(),
        }
    }

    fn state(&self) -> StateId {
        self.frames.last().map_or(self.base, |(state, _)| *state)
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, state: StateId, subtree: Subtree) {
        self.frames.push((state, subtree));
    }

    fn push_extra(&mut self, subtree: Subtree) {
        let state = self.state();
        self.frames.push((state, subtree));
    }

    /// Reduce by `id`; `None` if it would pop below the region.
    fn reduce(
        &mut self,
        table: &GrammarTable,
        id: ProductionId,
        lookahead: SymbolId,
    ) -> Option<()> {
        let production = table.production(id);
        let mut trailing = Vec::new();
        while self.frames.last().is_some_and(|(_, s)| s.is_extra()) {
            trailing.extend(self.frames.pop());
        }
        let mut children = Vec::new();
        let mut remaining = production.rhs.len();
        while remaining > 0 {
            let (_, subtree) = self.frames.pop()?;
            if !subtree.is_extra() {
                remaining -= 1;
            }
            children.push(subtree);
        }
        children.reverse();
        let base_state = self.state();
        let next = table.goto(base_state, production.lhs)?;
        let node = Subtree::node(
            production.lhs,
            Some(id),
            production.precedence,
            children,
            base_state,
            lookahead,
            false,
        );
        self.frames.push((next, node));
        while let Some((_, extra)) = trailing.pop() {
            self.push_extra(extra);
        }
        Some(())
    }

    /// The replacement, once the stack holds exactly one node like `old`.
    fn finished(&self, old: &Subtree) -> Option<Subtree> {
        match self.frames.as_slice() {
            [(_, node)]
                if node.kind() == old.kind() && !node.is_extra() && node.size() == old.size() =>
            {
                Some(node.clone())
            }
            _ => None,
        }
    }
}

/// Descend from the root while exactly one child carries changes.
fn changed_path(root: &Subtree) -> Vec<PathEntry> {
    let mut path = vec![PathEntry {
        node: root.clone(),
        start: 0,
        child: 0,
    }];
    loop {
        let Some(last) = path.last_mut() else { break };
        let mut changed = last
            .node
            .children()
            .iter()
            .enumerate()
            .filter(|(_, child)| child.has_changes());
        let (Some((index, child)), None) = (changed.next(), changed.next()) else {
            break;
        };
        let siblings = &last.node.children()[..index];
        let start = last.start + siblings.iter().map(Subtree::len).sum::<usize>();
        let child = child.clone();
        last.child = index;
        path.push(PathEntry {
            node: child,
            start,
            child: 0,
        });
    }
    path
}

/// Rebuild the ancestors in `path` around `replacement`.
fn splice(path: &[PathEntry], replacement: Subtree) -> Subtree {
    let mut node = replacement;
    for entry in path.iter().rev() {
        let mut children = entry.node.children().to_vec();
        children[entry.child] = node;
        node = entry.node.with_children(children);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, choice, pattern, prec_left, repeat, seq, string, sym};

    fn statements() -> GrammarHandle {
        Grammar::new("stmts")
            .rule("program", repeat(sym("statement")))
            .rule(
                "statement",
                seq([sym("NAME"), string("="), sym("expr"), string(";")]),
            )
            .rule(
                "expr",
                choice([
                    prec_left(1, seq([sym("expr"), string("+"), sym("expr")])),
                    sym("NUMBER"),
                ]),
            )
            .token("NAME", pattern("[a-z]+"))
            .token("NUMBER", pattern(r"\d+"))
            .extra(pattern(r"\s+"))
            .sync(string(";"))
            .stable("statement")
            .compile()
            .unwrap()
            .into()
    }

    fn edit(tree: &Tree, range: std::ops::Range<usize>, text: &str) -> (InputEdit, String) {
        InputEdit::apply(tree.text(), range, text)
    }

    #[test]
    fn test_stable_node_is_spliced() {
        let grammar = statements();
        let old = grammar.parse("a = 1; b = 2; c = 3;");
        let (edit, text) = edit(&old, 11..12, "2 + 40");
        let new = grammar.parse_incremental(&old, &[edit], &text).unwrap();
        assert!(new.structurally_eq(&grammar.parse(&text)));
        assert_eq!(new.version(), 1);

        // Statements before and after the edit are the old nodes
        let statements = |tree: &Tree| -> Vec<Subtree> {
            tree.preorder()
                .filter(|n| n.kind() == "statement")
                .map(|n| n.subtree().clone())
                .collect()
        };
        let old_statements = statements(&old);
        let new_statements = statements(&new);
        assert!(new_statements[0].ptr_eq(&old_statements[0]));
        assert!(!new_statements[1].ptr_eq(&old_statements[1]));
        assert!(new_statements[2].ptr_eq(&old_statements[2]));
    }

    #[test]
    fn test_changed_path_stops_at_divergence() {
        let grammar = statements();
        let old = grammar.parse("a = 1; b = 2;");
        let edited = edit_subtree(old.root(), &InputEdit::replace(old.text(), 11..12, "7"));
        let path = changed_path(&edited);
        let kinds: Vec<&str> = path
            .iter()
            .map(|e| grammar.table().symbol_name(e.node.kind()))
            .collect();
        assert_eq!(kinds.last(), Some(&"statement"), "{kinds:?}");
        assert_eq!(path.last().map(|e| e.start), Some(7));
    }

    #[test]
    fn test_statement_merge_falls_back() {
        // Removing the `;` joins two statements: no single node can absorb it
        let grammar = statements();
        let old = grammar.parse("a = 1; b = 2;");
        let (edit, text) = edit(&old, 5..6, "");
        let new = grammar.parse_incremental(&old, &[edit], &text).unwrap();
        assert!(new.structurally_eq(&grammar.parse(&text)));
        assert!(new.has_errors());
    }

    #[test]
    fn test_rejects_foreign_tree() {
        let grammar = statements();
        let other = statements();
        let old = other.parse("a = 1;");
        let error = grammar.parse_incremental(&old, &[], "a = 1;").unwrap_err();
        assert!(matches!(error, EditError::GrammarMismatch { .. }));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let grammar = statements();
        let old = grammar.parse("a = 1;");
        let edit = InputEdit::insert(old.text(), 5, "2");
        let error = grammar
            .parse_incremental(&old, &[edit], "a = 1;")
            .unwrap_err();
        assert_eq!(
            error,
            EditError::LengthMismatch {
                expected: 7,
                found: 6
            }
        );
    }

    #[test]
    fn test_sequential_edits() {
        let grammar = statements();
        let old = grammar.parse("a = 1; b = 2;");
        let (first, text) = edit(&old, 4..5, "10");
        let second = InputEdit::replace(&text, 12..13, "x");
        let mut final_text = text.clone();
        final_text.replace_range(12..13, "x");
        let new = grammar
            .parse_incremental(&old, &[first, second], &final_text)
            .unwrap();
        assert_eq!(new.text(), "a = 10; b = x;");
        assert!(new.structurally_eq(&grammar.parse(&final_text)));
    }
}
