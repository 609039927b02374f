//! Immutable, reference-counted syntax nodes
//!
//! A [`Subtree`] stores only its width, never its absolute position, so the
//! same node can be shared by many tree versions: text inserted before it
//! shifts it without copying it. Nodes also keep the parse metadata that
//! incremental reparsing needs to decide whether they can be reused.

use std::sync::Arc;

use text_size::TextSize;

use crate::table::{ProductionId, StateId, SymbolId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags {
    /// Shifted as an extra (whitespace, comments, ERROR nodes)
    pub extra: bool,
    /// This node is an ERROR token or ERROR node
    pub error: bool,
    /// This node or a descendant is an error
    pub has_error: bool,
    /// Built while the parser was ambiguous; never reused
    pub fragile: bool,
    /// Touched by an edit since it was parsed
    pub changed: bool,
}

#[derive(Debug)]
struct SubtreeData {
    kind: SymbolId,
    size: TextSize,
    /// Bytes past the end that were examined while building this node
    lookahead: u32,
    /// State the parser was in when this node started
    parse_state: StateId,
    /// Lookahead terminal that triggered the reduction creating this node
    follow: SymbolId,
    production: Option<ProductionId>,
    /// Own production precedence
    precedence: i32,
    /// Sum of declared precedence over the whole subtree
    dynamic_precedence: i32,
    flags: Flags,
    children: Box<[Subtree]>,
}

/// A node of the persistent syntax tree (internal "green" layer)
#[derive(Debug, Clone)]
pub struct Subtree(Arc<SubtreeData>);

impl Subtree {
    // =========================================================================
    // Construction
    // =========================================================================

    pub(crate) fn leaf(
        kind: SymbolId,
        size: TextSize,
        lookahead: u32,
        parse_state: StateId,
        extra: bool,
        fragile: bool,
    ) -> Self {
        let error = kind == SymbolId::ERROR;
        Self(Arc::new(SubtreeData {
            kind,
            size,
            lookahead,
            parse_state,
            follow: SymbolId::END,
            production: None,
            precedence: 0,
            dynamic_precedence: 0,
            flags: Flags {
                extra: extra || error,
                error,
                has_error: error,
                fragile,
                changed: false,
            },
            children: Box::new([]),
        }))
    }

    /// A node reduced by `production`.
    pub(crate) fn node(
        kind: SymbolId,
        production: Option<ProductionId>,
        precedence: i32,
        children: Vec<Subtree>,
        parse_state: StateId,
        follow: SymbolId,
        fragile: bool,
    ) -> Self {
        let flags = Flags {
            fragile,
            ..Flags::default()
        };
        Self::assemble(
            kind,
            production,
            precedence,
            children,
            parse_state,
            follow,
            flags,
        )
    }

    /// An ERROR node wrapping discarded frames and skipped tokens. It is an
    /// extra: the parser's state does not change when it is pushed.
    pub(crate) fn error(children: Vec<Subtree>, parse_state: StateId) -> Self {
        let flags = Flags {
            extra: true,
            error: true,
            has_error: true,
            fragile: true,
            changed: false,
        };
        Self::assemble(
            SymbolId::ERROR,
            None,
            0,
            children,
            parse_state,
            SymbolId::END,
            flags,
        )
    }

    fn assemble(
        kind: SymbolId,
        production: Option<ProductionId>,
        precedence: i32,
        children: Vec<Subtree>,
        parse_state: StateId,
        follow: SymbolId,
        mut flags: Flags,
    ) -> Self {
        let mut size = TextSize::new(0);
        let mut lookahead_end = 0u64;
        let mut dynamic_precedence = precedence;
        for child in &children {
            let end = u64::from(u32::from(size))
                + u64::from(u32::from(child.size()))
                + u64::from(child.lookahead());
            lookahead_end = lookahead_end.max(end);
            size += child.size();
            dynamic_precedence += child.dynamic_precedence();
            flags.has_error |= child.has_error();
            flags.fragile |= child.is_fragile();
            flags.changed |= child.has_changes();
        }
        let lookahead = lookahead_end.saturating_sub(u64::from(u32::from(size))) as u32;
        Self(Arc::new(SubtreeData {
            kind,
            size,
            lookahead,
            parse_state,
            follow,
            production,
            precedence,
            dynamic_precedence,
            flags,
            children: children.into_boxed_slice(),
        }))
    }

    /// Same node metadata over new children. The result is not marked
    /// changed unless a child is.
    pub(crate) fn with_children(&self, children: Vec<Subtree>) -> Self {
        let data = &self.0;
        let flags = Flags {
            extra: data.flags.extra,
            error: data.flags.error,
            has_error: data.flags.error,
            fragile: data.flags.fragile,
            changed: false,
        };
        Self::assemble(
            data.kind,
            data.production,
            data.precedence,
            children,
            data.parse_state,
            data.follow,
            flags,
        )
    }

    /// The node with `leading` and `trailing` extras added around its
    /// children, so that it spans them.
    pub(crate) fn with_extras(&self, leading: Vec<Subtree>, trailing: Vec<Subtree>) -> Self {
        if leading.is_empty() && trailing.is_empty() {
            return self.clone();
        }
        let mut children = leading;
        children.extend(self.children().iter().cloned());
        children.extend(trailing);
        self.with_children(children)
    }

    /// Copy of a leaf or node after an edit: new size, marked changed.
    pub(crate) fn edited(&self, size: TextSize, children: Option<Vec<Subtree>>) -> Self {
        let data = &self.0;
        let mut flags = data.flags;
        flags.changed = true;
        match children {
            Some(children) => {
                let node = Self::assemble(
                    data.kind,
                    data.production,
                    data.precedence,
                    children,
                    data.parse_state,
                    data.follow,
                    flags,
                );
                debug_assert_eq!(node.size(), size);
                node
            }
            None => Self(Arc::new(SubtreeData {
                size,
                flags,
                children: Box::new([]),
                ..SubtreeData::clone_fields(data)
            })),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> SymbolId {
        self.0.kind
    }

    pub fn size(&self) -> TextSize {
        self.0.size
    }

    pub(crate) fn len(&self) -> usize {
        u32::from(self.0.size) as usize
    }

    pub fn lookahead(&self) -> u32 {
        self.0.lookahead
    }

    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    pub fn follow(&self) -> SymbolId {
        self.0.follow
    }

    pub fn production(&self) -> Option<ProductionId> {
        self.0.production
    }

    pub fn dynamic_precedence(&self) -> i32 {
        self.0.dynamic_precedence
    }

    pub fn children(&self) -> &[Subtree] {
        &self.0.children
    }

    /// A lexed token (empty reductions have a production and are not leaves)
    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty() && self.0.production.is_none()
    }

    pub fn is_extra(&self) -> bool {
        self.0.flags.extra
    }

    pub fn is_error(&self) -> bool {
        self.0.flags.error
    }

    pub fn has_error(&self) -> bool {
        self.0.flags.has_error
    }

    pub fn is_fragile(&self) -> bool {
        self.0.flags.fragile
    }

    pub fn has_changes(&self) -> bool {
        self.0.flags.changed
    }

    /// Both handles point at the same shared node
    pub fn ptr_eq(&self, other: &Subtree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same shape, kinds, widths and flags. Shared nodes compare equal in O(1).
    pub fn structurally_eq(&self, other: &Subtree) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.ptr_eq(b) {
                continue;
            }
            if a.kind() != b.kind()
                || a.size() != b.size()
                || a.is_extra() != b.is_extra()
                || a.is_error() != b.is_error()
                || a.children().len() != b.children().len()
            {
                return false;
            }
            pending.extend(a.children().iter().zip(b.children()));
        }
        true
    }

    /// First leaf of the subtree that is not an extra
    pub(crate) fn first_leaf(&self) -> Option<&Subtree> {
        let significant = |child: &&Subtree| {
            !child.is_extra() && (child.is_leaf() || child.size() > TextSize::new(0))
        };
        let mut node = self;
        loop {
            if node.is_leaf() {
                return (!node.is_extra()).then_some(node);
            }
            node = node.children().iter().find(significant)?;
        }
    }
}

impl SubtreeData {
    fn clone_fields(data: &SubtreeData) -> SubtreeData {
        SubtreeData {
            kind: data.kind,
            size: data.size,
            lookahead: data.lookahead,
            parse_state: data.parse_state,
            follow: data.follow,
            production: data.production,
            precedence: data.precedence,
            dynamic_precedence: data.dynamic_precedence,
            flags: data.flags,
            children: data.children.clone(),
        }
    }
}
