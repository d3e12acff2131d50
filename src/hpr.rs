//! HPR — half-tree pairing heap, minimal API (insert/merge/extract only).
//!
//! Grounded on `hprheap.c`/`hprheap.h`: each node is the root of a singly-linked
//! chain of children threaded through `children[0]`/`children[1]` (first child,
//! next sibling); there is no parent pointer, so arbitrary nodes cannot be located
//! in better than linear time and this engine does not implement
//! [`AddressableHeapEngine`].

use crate::heap::{cmp_links, Cmp, HeapEngine, Linked};
use std::cmp::Ordering;
use std::ptr::NonNull;

pub struct HprLink {
    first_child: Option<NonNull<HprLink>>,
    next_sibling: Option<NonNull<HprLink>>,
}

impl HprLink {
    pub const fn new() -> Self {
        HprLink {
            first_child: None,
            next_sibling: None,
        }
    }
}

impl Default for HprLink {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Hpr<N> {
    root: Option<NonNull<HprLink>>,
    _node: std::marker::PhantomData<N>,
}

impl<N> Default for Hpr<N> {
    fn default() -> Self {
        Self {
            root: None,
            _node: std::marker::PhantomData,
        }
    }
}

/// Join two heap-ordered half-trees with roots `first`, `second`. The one that
/// compares less-or-equal (first argument wins the tie, spec §4.2) becomes parent;
/// the other is prepended to its sibling chain.
unsafe fn join<N: Linked<HprLink>>(
    first: NonNull<HprLink>,
    second: NonNull<HprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<HprLink> {
    debug_assert_ne!(first, second);

    let (mut parent, mut child) = if cmp_links(first, second, cmp) != Ordering::Greater {
        (first, second)
    } else {
        (second, first)
    };

    child.as_mut().next_sibling = parent.as_ref().first_child;
    parent.as_mut().first_child = Some(child);

    crate::op_count::count_op();
    parent
}

/// The two-pass pairing procedure (spec §4.2, §9: ordering is load-bearing).
///
/// Pass 1 walks the sibling chain left-to-right, pairing adjacent nodes and
/// threading the winners onto a stack via `next_sibling`. Pass 2 pops that stack
/// right-to-left, folding each popped winner into a running accumulator.
unsafe fn merge_nodes<N: Linked<HprLink>>(
    mut nodes: Option<NonNull<HprLink>>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<HprLink>> {
    nodes?;

    let mut root: Option<NonNull<HprLink>> = None;
    let mut twin: Option<NonNull<HprLink>> = None;

    while let Some(mut node) = nodes {
        let next = node.as_ref().next_sibling;

        if let Some(t) = twin {
            let mut joined = join(t, node, cmp);
            joined.as_mut().next_sibling = root;
            root = Some(joined);
            twin = None;
        } else {
            node.as_mut().next_sibling = None;
            twin = Some(node);
        }

        nodes = next;
    }

    if let Some(mut t) = twin {
        t.as_mut().next_sibling = root;
        root = Some(t);
    }

    debug_assert!(root.is_some());
    let mut root = root.unwrap();

    // Pass 2: fold the stack right-to-left.
    let mut next_twin = root.as_ref().next_sibling;
    while let Some(twin) = next_twin {
        let after = twin.as_ref().next_sibling;
        root = join(root, twin, cmp);
        next_twin = after;
    }

    Some(root)
}

unsafe fn remove_root<N: Linked<HprLink>>(
    root: NonNull<HprLink>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<HprLink>> {
    merge_nodes(root.as_ref().first_child, cmp)
}

impl<N: Linked<HprLink>> HeapEngine for Hpr<N> {
    type Node = N;
    type Link = HprLink;

    fn setup(&mut self) {
        self.root = None;
    }

    fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    unsafe fn peek(&self) -> NonNull<N> {
        debug_assert!(!self.is_empty());
        N::entry(self.root.unwrap())
    }

    #[tracing::instrument(name = "stroll::hpr", skip(self, cmp), level = "trace")]
    unsafe fn insert(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        let mut link = N::link_ptr(node);
        link.as_mut().first_child = None;
        link.as_mut().next_sibling = None;

        self.root = Some(match self.root {
            Some(root) => join(root, link, cmp),
            None => link,
        });
    }

    #[tracing::instrument(name = "stroll::hpr", skip(self, source, cmp), level = "trace")]
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<N>) {
        let Some(source_root) = source.root.take() else {
            return;
        };

        self.root = Some(match self.root {
            Some(root) => unsafe { join(root, source_root, cmp) },
            None => source_root,
        });
    }

    #[tracing::instrument(name = "stroll::hpr", skip(self, cmp), level = "trace")]
    unsafe fn extract(&mut self, cmp: &mut Cmp<N>) -> NonNull<N> {
        debug_assert!(!self.is_empty());

        let root = self.root.unwrap();
        self.root = remove_root(root, cmp);

        N::entry(root)
    }
}
