//! DPR — pairing heap over doubly-linked children lists, full API.
//!
//! Grounded on `dprheap.c`/`dprheap.h`: structurally the same two-pass pairing
//! algorithm as PPR, one layer down — siblings form a real circular doubly-linked
//! list (`crate::dlist`) rather than a sentinel-terminated singly-linked chain, so
//! no process-wide sentinel is needed (an empty `dlist` already has its own
//! self-referential empty representation).

use crate::dlist::DlistNode;
use crate::heap::{AddressableHeapEngine, Cmp, HeapEngine, Linked};
use std::cmp::Ordering;
use std::ptr::NonNull;

pub struct DprLink {
    siblings: DlistNode,
    parent: Option<NonNull<DprLink>>,
    children: DlistNode,
}

impl DprLink {
    pub fn new() -> Self {
        DprLink {
            siblings: DlistNode::new(),
            parent: None,
            children: DlistNode::new(),
        }
    }
}

impl Default for DprLink {
    fn default() -> Self {
        Self::new()
    }
}

fn siblings_ptr(link: NonNull<DprLink>) -> NonNull<DlistNode> {
    unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*link.as_ptr()).siblings)) }
}

fn children_ptr(link: NonNull<DprLink>) -> NonNull<DlistNode> {
    unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*link.as_ptr()).children)) }
}

/// Recover the enclosing `DprLink` from a pointer to its embedded `siblings` field.
unsafe fn link_of_siblings(siblings: NonNull<DlistNode>) -> NonNull<DprLink> {
    NonNull::new_unchecked(
        (siblings.as_ptr() as *mut u8).sub(std::mem::offset_of!(DprLink, siblings)) as *mut DprLink,
    )
}

unsafe fn cmp_links<N: Linked<DprLink>>(
    a: NonNull<DprLink>,
    b: NonNull<DprLink>,
    cmp: &mut Cmp<N>,
) -> Ordering {
    cmp(N::entry(a).as_ref(), N::entry(b).as_ref())
}

fn init_link(mut link: NonNull<DprLink>) {
    unsafe {
        DlistNode::init(siblings_ptr(link));
        DlistNode::init(children_ptr(link));
        link.as_mut().parent = None;
    }
}

unsafe fn attach_child(child: NonNull<DprLink>, mut parent: NonNull<DprLink>) {
    let mut child = child;
    child.as_mut().parent = Some(parent);
    DlistNode::insert_after(children_ptr(parent), siblings_ptr(child));
}

unsafe fn detach_child(mut child: NonNull<DprLink>) {
    DlistNode::remove(siblings_ptr(child));
    child.as_mut().parent = None;
}

unsafe fn join<N: Linked<DprLink>>(
    first: NonNull<DprLink>,
    second: NonNull<DprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<DprLink> {
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

/// Two-pass pairing over a vector of detached half-trees (spec §4.3, §9).
unsafe fn merge_nodes<N: Linked<DprLink>>(
    mut nodes: Vec<NonNull<DprLink>>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<DprLink>> {
    if nodes.is_empty() {
        return None;
    }

    let mut stack = Vec::with_capacity(nodes.len());
    let mut iter = nodes.drain(..);
    loop {
        let Some(first) = iter.next() else { break };
        match iter.next() {
            Some(second) => stack.push(join(first, second, cmp)),
            None => {
                stack.push(first);
                break;
            }
        }
    }

    let mut root = stack.pop().expect("at least one node");
    while let Some(twin) = stack.pop() {
        root = join(root, twin, cmp);
    }
    Some(root)
}

/// Collect a node's children (detaching each from the children list) in sibling
/// order, ready to be fed back into [`merge_nodes`].
unsafe fn drain_children(parent: NonNull<DprLink>) -> Vec<NonNull<DprLink>> {
    let head = children_ptr(parent);
    let mut out = Vec::new();
    while let Some(first) = DlistNode::first(head) {
        DlistNode::remove(first);
        out.push(link_of_siblings(first));
    }
    out
}

unsafe fn remove_root<N: Linked<DprLink>>(
    root: NonNull<DprLink>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<DprLink>> {
    merge_nodes(drain_children(root), cmp)
}

unsafe fn remove_node<N: Linked<DprLink>>(
    root: NonNull<DprLink>,
    node: NonNull<DprLink>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<DprLink>> {
    if node == root {
        return remove_root(node, cmp);
    }

    detach_child(node);
    let orphan = merge_nodes(drain_children(node), cmp);
    if let Some(orphan) = orphan {
        attach_child(orphan, root);
    }
    Some(root)
}

/// Promote (decrease-key) helper: if `node` is already the root, no-op. Otherwise
/// detach `node` and its whole children subtree as one unit and re-link it with
/// `root` (spec §4.3).
unsafe fn promote_node<N: Linked<DprLink>>(
    root: NonNull<DprLink>,
    node: NonNull<DprLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<DprLink> {
    if node == root {
        return root;
    }
    detach_child(node);
    join(root, node, cmp)
}

pub struct Dpr<N> {
    root: Option<NonNull<DprLink>>,
    _node: std::marker::PhantomData<N>,
}

impl<N> Default for Dpr<N> {
    fn default() -> Self {
        Self {
            root: None,
            _node: std::marker::PhantomData,
        }
    }
}

impl<N: Linked<DprLink>> HeapEngine for Dpr<N> {
    type Node = N;
    type Link = DprLink;

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

    #[tracing::instrument(name = "stroll::dpr", skip(self, cmp), level = "trace")]
    unsafe fn insert(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        let link = N::link_ptr(node);
        init_link(link);

        self.root = Some(match self.root {
            Some(root) => join(root, link, cmp),
            None => link,
        });
    }

    #[tracing::instrument(name = "stroll::dpr", skip(self, source, cmp), level = "trace")]
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<N>) {
        let Some(source_root) = source.root.take() else {
            return;
        };
        self.root = Some(match self.root {
            Some(root) => unsafe { join(root, source_root, cmp) },
            None => source_root,
        });
    }

    #[tracing::instrument(name = "stroll::dpr", skip(self, cmp), level = "trace")]
    unsafe fn extract(&mut self, cmp: &mut Cmp<N>) -> NonNull<N> {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        self.root = remove_root(root, cmp);
        N::entry(root)
    }
}

impl<N: Linked<DprLink>> AddressableHeapEngine for Dpr<N> {
    #[tracing::instrument(name = "stroll::dpr", skip(self, cmp), level = "trace")]
    unsafe fn remove(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        self.root = remove_node(root, N::link_ptr(node), cmp);
    }

    #[tracing::instrument(name = "stroll::dpr", skip(self, cmp), level = "trace")]
    unsafe fn promote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        self.root = Some(promote_node(root, N::link_ptr(node), cmp));
    }

    #[tracing::instrument(name = "stroll::dpr", skip(self, cmp), level = "trace")]
    unsafe fn demote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let root = self.root.unwrap();
        let link = N::link_ptr(node);
        let without_node = remove_node(root, link, cmp);
        init_link(link);
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
        link: DprLink,
        key: i32,
    }

    stroll_intrusive_node!(IntNode, DprLink, link);

    fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
        a.key.cmp(&b.key)
    }

    fn leak(key: i32) -> NonNull<IntNode> {
        NonNull::from(Box::leak(Box::new(IntNode {
            link: DprLink::new(),
            key,
        })))
    }

    #[test]
    fn insert_then_extract_is_sorted() {
        let mut heap: Dpr<IntNode> = Dpr::default();
        heap.setup();
        let keys = [2, 12, 13, 0, 1, 3, 10, 9, 8, 11, 4, 6, 5, 7];
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
    fn remove_then_reinsert_matches_demote() {
        let mut heap: Dpr<IntNode> = Dpr::default();
        heap.setup();
        for k in [4, 2, 9, 1, 7] {
            unsafe { heap.insert(leak(k), &mut cmp) };
        }
        let node = leak(3);
        unsafe { heap.insert(node, &mut cmp) };
        unsafe { (*node.as_ptr()).key = 20 };
        unsafe { heap.demote(node, &mut cmp) };

        let mut out = Vec::new();
        while !heap.is_empty() {
            out.push(unsafe { heap.extract(&mut cmp).as_ref().key });
        }
        assert_eq!(out, vec![1, 2, 4, 7, 9, 20]);
    }
}
