//! PPR — half-tree pairing heap with parent pointer, full API.
//!
//! Grounded on `pprheap.c`/`pprheap.h`. Same half-tree shape as HPR augmented with
//! a `parent` pointer so arbitrary nodes are locatable in O(1); sibling chains are
//! terminated by a process-wide sentinel ("the plug") instead of `None`, which lets
//! both passes of the pairing procedure terminate by comparing against one address
//! rather than branching on an `Option`.

use crate::heap::{cmp_links, AddressableHeapEngine, Cmp, HeapEngine, Linked};
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::ptr::NonNull;

pub struct PprLink {
    first_child: NonNull<PprLink>,
    next_sibling: NonNull<PprLink>,
    parent: Option<NonNull<PprLink>>,
}

// The plug's own fields point at itself; it is never a real node and its contents
// are never mutated by an operation, only compared by address (spec §5).
struct Plug(PprLink);
unsafe impl Sync for Plug {}

// The plug's own link fields are never dereferenced by any operation — every
// call site compares a candidate pointer against `plug()` *before* following it —
// so they are left dangling rather than (unsoundly) self-referenced across a move.
static PLUG: Lazy<Plug> = Lazy::new(|| {
    Plug(PprLink {
        first_child: NonNull::dangling(),
        next_sibling: NonNull::dangling(),
        parent: None,
    })
});

fn plug() -> NonNull<PprLink> {
    NonNull::from(&PLUG.0)
}

impl PprLink {
    pub fn new() -> Self {
        PprLink {
            first_child: plug(),
            next_sibling: plug(),
            parent: None,
        }
    }
}

impl Default for PprLink {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ppr<N> {
    root: Option<NonNull<PprLink>>,
    _node: std::marker::PhantomData<N>,
}

impl<N> Default for Ppr<N> {
    fn default() -> Self {
        Self {
            root: None,
            _node: std::marker::PhantomData,
        }
    }
}

unsafe fn attach_child(mut child: NonNull<PprLink>, mut parent: NonNull<PprLink>) {
    child.as_mut().next_sibling = parent.as_ref().first_child;
    child.as_mut().parent = Some(parent);
    parent.as_mut().first_child = child;
}

unsafe fn join<N: Linked<PprLink>>(
    first: NonNull<PprLink>,
    second: NonNull<PprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<PprLink> {
    debug_assert_ne!(first, second);

    let (parent, child) = if cmp_links(first, second, cmp) != Ordering::Greater {
        (first, second)
    } else {
        (second, first)
    };
    attach_child(child, parent);
    crate::op_count::count_op();
    parent
}

/// Detach `node` from its parent's sibling chain (`node` need not be the first
/// child).
unsafe fn detach_node(mut node: NonNull<PprLink>) {
    let parent = node.as_ref().parent.expect("node must not be a root");
    let mut cursor = parent.as_ref().first_child;

    if cursor == node {
        let mut parent = parent;
        parent.as_mut().first_child = node.as_ref().next_sibling;
    } else {
        loop {
            let next = cursor.as_ref().next_sibling;
            if next == node {
                cursor.as_mut().next_sibling = node.as_ref().next_sibling;
                break;
            }
            cursor = next;
        }
    }

    node.as_mut().next_sibling = plug();
    node.as_mut().parent = None;
}

/// Two-pass pairing, sentinel-terminated (spec §4.4, §9).
unsafe fn merge_nodes<N: Linked<PprLink>>(
    mut nodes: NonNull<PprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<PprLink> {
    if nodes == plug() {
        return plug();
    }

    let mut root = plug();
    let mut twin = plug();

    while nodes != plug() {
        let next = nodes.as_ref().next_sibling;

        if twin != plug() {
            let mut joined = join(twin, nodes, cmp);
            joined.as_mut().next_sibling = root;
            root = joined;
            twin = plug();
        } else {
            nodes.as_mut().next_sibling = plug();
            twin = nodes;
        }

        nodes = next;
    }

    if twin != plug() {
        let mut t = twin;
        t.as_mut().next_sibling = root;
        root = t;
    }

    debug_assert_ne!(root, plug());

    let mut next_twin = root.as_ref().next_sibling;
    while next_twin != plug() {
        let after = next_twin.as_ref().next_sibling;
        root = join(root, next_twin, cmp);
        next_twin = after;
    }

    root.as_mut().parent = None;
    root
}

unsafe fn remove_root<N: Linked<PprLink>>(
    root: NonNull<PprLink>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<PprLink>> {
    let new_root = merge_nodes(root.as_ref().first_child, cmp);
    if new_root == plug() {
        None
    } else {
        Some(new_root)
    }
}

/// Detach an arbitrary node (root or interior) and return the new root, if any
/// root remains.
unsafe fn remove_node<N: Linked<PprLink>>(
    root: NonNull<PprLink>,
    node: NonNull<PprLink>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<PprLink>> {
    if node == root {
        return remove_root(node, cmp);
    }

    detach_node(node);
    let orphan = merge_nodes(node.as_ref().first_child, cmp);
    if orphan != plug() {
        attach_child(orphan, root);
    }
    Some(root)
}

/// Promote (decrease-key) helper: if `node` is already the root, no-op. Otherwise
/// detach `node` *and its whole subtree* as one unit and re-link it with `root` —
/// not a classical cut, since `node`'s descendants are still all `>=` its new,
/// smaller key (spec §4.3).
unsafe fn promote_node<N: Linked<PprLink>>(
    root: NonNull<PprLink>,
    mut node: NonNull<PprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<PprLink> {
    if node == root {
        return root;
    }

    detach_node(node);
    node.as_mut().next_sibling = plug();
    join(root, node, cmp)
}

impl<N: Linked<PprLink>> HeapEngine for Ppr<N> {
    type Node = N;
    type Link = PprLink;

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

    #[tracing::instrument(name = "stroll::ppr", skip(self, cmp), level = "trace")]
    unsafe fn insert(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        let mut link = N::link_ptr(node);
        link.as_mut().first_child = plug();
        link.as_mut().next_sibling = plug();
        link.as_mut().parent = None;

        self.root = Some(match self.root {
            Some(root) => join(root, link, cmp),
            None => link,
        });
    }

    #[tracing::instrument(name = "stroll::ppr", skip(self, source, cmp), level = "trace")]
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<N>) {
        let Some(source_root) = source.root.take() else {
            return;
        };
        self.root = Some(match self.root {
            Some(root) => unsafe { join(root, source_root, cmp) },
            None => source_root,
        });
    }

    #[tracing::instrument(name = "stroll::ppr", skip(self, cmp), level = "trace")]
    unsafe fn extract(&mut self, cmp: &mut Cmp<N>) -> NonNull<N> {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        self.root = remove_root(root, cmp);
        N::entry(root)
    }
}

impl<N: Linked<PprLink>> AddressableHeapEngine for Ppr<N> {
    #[tracing::instrument(name = "stroll::ppr", skip(self, cmp), level = "trace")]
    unsafe fn remove(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        let link = N::link_ptr(node);
        self.root = remove_node(root, link, cmp);
    }

    #[tracing::instrument(name = "stroll::ppr", skip(self, cmp), level = "trace")]
    unsafe fn promote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        let link = N::link_ptr(node);
        self.root = Some(promote_node(root, link, cmp));
    }

    /// Equivalent to `remove(n)` immediately followed by `insert(n)` (spec §4.3/
    /// §4.4): unlike promote, demote cannot keep n's subtree attached as one unit,
    /// since n's own children may now be smaller than n's increased key — they
    /// must be pried loose and re-paired independently, exactly as a real removal
    /// would.
    #[tracing::instrument(name = "stroll::ppr", skip(self, cmp), level = "trace")]
    unsafe fn demote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        let mut link = N::link_ptr(node);
        let without_node = remove_node(root, link, cmp);

        link.as_mut().first_child = plug();
        link.as_mut().next_sibling = plug();
        link.as_mut().parent = None;

        self.root = Some(match without_node {
            Some(remaining) => join(remaining, link, cmp),
            None => link,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroll_intrusive_node;
    use std::cmp::Ordering;

    struct IntNode {
        link: PprLink,
        key: i32,
    }

    stroll_intrusive_node!(IntNode, PprLink, link);

    fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
        a.key.cmp(&b.key)
    }

    fn leak(key: i32) -> NonNull<IntNode> {
        NonNull::from(Box::leak(Box::new(IntNode {
            link: PprLink::new(),
            key,
        })))
    }

    #[test]
    fn insert_then_extract_is_sorted() {
        let mut heap: Ppr<IntNode> = Ppr::default();
        heap.setup();
        let keys = [3, 1, 4, 1, 5, 9, 2, 6];
        for &k in &keys {
            unsafe { heap.insert(leak(k), &mut cmp) };
        }
        let mut out = Vec::new();
        while !heap.is_empty() {
            out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
        }
        let mut expected = keys.to_vec();
        expected.sort();
        assert_eq!(out, expected);
    }

    #[test]
    fn decrease_key_then_extract_returns_that_node() {
        let mut heap: Ppr<IntNode> = Ppr::default();
        heap.setup();
        let mut nodes = Vec::new();
        for k in (1..=10).rev() {
            let n = leak(k);
            unsafe { heap.insert(n, &mut cmp) };
            nodes.push(n);
        }
        let ten = nodes[0];
        unsafe {
            (*ten.as_ptr()).key = 0;
            heap.promote(ten, &mut cmp);
        }
        let extracted = unsafe { heap.extract(&mut cmp) };
        assert_eq!(extracted, ten);
    }

    #[test]
    fn remove_arbitrary_node_preserves_order() {
        let mut heap: Ppr<IntNode> = Ppr::default();
        heap.setup();
        let mut nodes = Vec::new();
        for k in [5, 2, 8, 1, 9, 3] {
            let n = leak(k);
            unsafe { heap.insert(n, &mut cmp) };
            nodes.push(n);
        }
        let eight = nodes.iter().find(|n| unsafe { n.as_ref().key == 8 }).unwrap();
        unsafe { heap.remove(*eight, &mut cmp) };

        let mut out = Vec::new();
        while !heap.is_empty() {
            out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
        }
        assert_eq!(out, vec![1, 2, 3, 5, 9]);
    }
}
