//! DBN — binomial heap over doubly-linked children lists, full API.
//!
//! Grounded on `dbnheap.c`/`dbnheap.h`. A root list of binomial trees, each
//! carrying an `order` (= child count = log2 of subtree size); at most one tree per
//! order survives any merge.
//!
//! Decrease-key cannot move keys (the link is intrusive; the node's address is
//! what the caller holds onto). Instead [`swap_with_parent`] exchanges the
//! *topological role* of a node and its parent — order, sibling position, parent
//! link and children all change hands — so the node's key appears to bubble up
//! while its address never moves (spec §4.6/§9, "sift-by-swap").
//!
//! The original's `peek` linearly rescans the root list on every call, since a
//! binomial forest caches no minimum. The shared [`HeapEngine::peek`] contract
//! takes no comparator, so this engine instead caches the minimum root pointer and
//! refreshes it on every mutation — the same trade DRP already makes for its head
//! pointer — rather than rescanning under a signature that cannot supply one.

use crate::dlist::DlistNode;
use crate::heap::{AddressableHeapEngine, Cmp, HeapEngine, Linked};
use std::cmp::Ordering;
use std::ptr::NonNull;

pub struct DbnLink {
    order: u32,
    siblings: DlistNode,
    parent: Option<NonNull<DbnLink>>,
    children: DlistNode,
}

impl DbnLink {
    pub fn new() -> Self {
        DbnLink {
            order: 0,
            siblings: DlistNode::new(),
            parent: None,
            children: DlistNode::new(),
        }
    }
}

impl Default for DbnLink {
    fn default() -> Self {
        Self::new()
    }
}

fn siblings_ptr(link: NonNull<DbnLink>) -> NonNull<DlistNode> {
    unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*link.as_ptr()).siblings)) }
}

fn children_ptr(link: NonNull<DbnLink>) -> NonNull<DlistNode> {
    unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*link.as_ptr()).children)) }
}

unsafe fn link_of_siblings(siblings: NonNull<DlistNode>) -> NonNull<DbnLink> {
    NonNull::new_unchecked(
        (siblings.as_ptr() as *mut u8).sub(std::mem::offset_of!(DbnLink, siblings)) as *mut DbnLink,
    )
}

unsafe fn cmp_links<N: Linked<DbnLink>>(
    a: NonNull<DbnLink>,
    b: NonNull<DbnLink>,
    cmp: &mut Cmp<N>,
) -> Ordering {
    cmp(N::entry(a).as_ref(), N::entry(b).as_ref())
}

fn init_link(link: NonNull<DbnLink>) {
    unsafe {
        DlistNode::init(siblings_ptr(link));
        DlistNode::init(children_ptr(link));
    }
    let mut link = link;
    unsafe {
        link.as_mut().parent = None;
        link.as_mut().order = 0;
    }
}

/// Link two equal-order roots: the smaller key becomes parent, the loser is
/// prepended to the parent's children and the parent's order increments.
unsafe fn join<N: Linked<DbnLink>>(
    first: NonNull<DbnLink>,
    second: NonNull<DbnLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<DbnLink> {
    debug_assert_eq!(first.as_ref().order, second.as_ref().order);

    let (mut parent, mut child) = if cmp_links(first, second, cmp) != Ordering::Greater {
        (first, second)
    } else {
        (second, first)
    };

    child.as_mut().parent = Some(parent);
    DlistNode::insert_after(children_ptr(parent), siblings_ptr(child));
    parent.as_mut().order += 1;

    crate::op_count::count_op();
    parent
}

fn collect_roots(head: NonNull<DlistNode>) -> Vec<NonNull<DbnLink>> {
    unsafe { crate::dlist::iter(head).map(link_of_siblings).collect() }
}

fn rebuild_root_list(head: NonNull<DlistNode>, roots: Vec<NonNull<DbnLink>>) {
    unsafe {
        DlistNode::init(head);
        for mut root in roots {
            root.as_mut().parent = None;
            DlistNode::append(head, siblings_ptr(root));
        }
    }
}

/// Merge two order-sorted forests by carry-chain addition, binary-adder style
/// (spec §4.6; grounded on `stroll_dbnheap_merge_roots`).
unsafe fn merge_trees<N: Linked<DbnLink>>(
    mut a: Vec<NonNull<DbnLink>>,
    mut b: Vec<NonNull<DbnLink>>,
    cmp: &mut Cmp<N>,
) -> Vec<NonNull<DbnLink>> {
    a.sort_by_key(|l| l.as_ref().order);
    b.sort_by_key(|l| l.as_ref().order);

    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut ai = a.into_iter().peekable();
    let mut bi = b.into_iter().peekable();
    let mut carry: Option<NonNull<DbnLink>> = None;

    while ai.peek().is_some() || bi.peek().is_some() || carry.is_some() {
        let next_order = [
            ai.peek().map(|l| l.as_ref().order),
            bi.peek().map(|l| l.as_ref().order),
            carry.map(|l| l.as_ref().order),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap();

        let mut at_order = Vec::with_capacity(3);
        if ai.peek().map(|l| l.as_ref().order) == Some(next_order) {
            at_order.push(ai.next().unwrap());
        }
        if bi.peek().map(|l| l.as_ref().order) == Some(next_order) {
            at_order.push(bi.next().unwrap());
        }
        if carry.map(|l| l.as_ref().order) == Some(next_order) {
            at_order.push(carry.take().unwrap());
        }

        match at_order.len() {
            1 => out.push(at_order[0]),
            2 => carry = Some(join(at_order[0], at_order[1], cmp)),
            3 => {
                out.push(at_order[0]);
                carry = Some(join(at_order[1], at_order[2], cmp));
            }
            _ => unreachable!("at most two forests plus one carry can share an order"),
        }
    }

    out
}

unsafe fn merge_single<N: Linked<DbnLink>>(
    roots: Vec<NonNull<DbnLink>>,
    tree: NonNull<DbnLink>,
    cmp: &mut Cmp<N>,
) -> Vec<NonNull<DbnLink>> {
    merge_trees(roots, vec![tree], cmp)
}

unsafe fn scan_min<N: Linked<DbnLink>>(
    head: NonNull<DlistNode>,
    cmp: &mut Cmp<N>,
) -> Option<NonNull<DbnLink>> {
    collect_roots(head)
        .into_iter()
        .fold(None, |best, candidate| match best {
            None => Some(candidate),
            Some(b) => {
                if cmp_links(candidate, b, cmp) == Ordering::Less {
                    Some(candidate)
                } else {
                    Some(b)
                }
            }
        })
}

pub struct Dbn<N> {
    roots: DlistNode,
    min: Option<NonNull<DbnLink>>,
    _node: std::marker::PhantomData<N>,
}

impl<N> Default for Dbn<N> {
    fn default() -> Self {
        let mut heap = Dbn {
            roots: DlistNode::new(),
            min: None,
            _node: std::marker::PhantomData,
        };
        unsafe { DlistNode::init(NonNull::from(&heap.roots)) };
        heap
    }
}

fn roots_head<N>(heap: &Dbn<N>) -> NonNull<DlistNode> {
    NonNull::from(&heap.roots)
}

impl<N: Linked<DbnLink>> HeapEngine for Dbn<N> {
    type Node = N;
    type Link = DbnLink;

    fn setup(&mut self) {
        unsafe { DlistNode::init(roots_head(self)) };
        self.min = None;
    }

    fn is_empty(&self) -> bool {
        unsafe { DlistNode::is_empty(roots_head(self)) }
    }

    unsafe fn peek(&self) -> NonNull<N> {
        debug_assert!(!self.is_empty());
        N::entry(self.min.unwrap())
    }

    #[tracing::instrument(name = "stroll::dbn", skip(self, cmp), level = "trace")]
    unsafe fn insert(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        let link = N::link_ptr(node);
        init_link(link);

        let roots = collect_roots(roots_head(self));
        let merged = merge_single(roots, link, cmp);
        rebuild_root_list(roots_head(self), merged);
        self.min = scan_min(roots_head(self), cmp);
    }

    #[tracing::instrument(name = "stroll::dbn", skip(self, source, cmp), level = "trace")]
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<N>) {
        unsafe {
            let a = collect_roots(roots_head(self));
            let b = collect_roots(roots_head(source));
            DlistNode::init(roots_head(source));
            source.min = None;
            let merged = merge_trees(a, b, cmp);
            rebuild_root_list(roots_head(self), merged);
            self.min = scan_min(roots_head(self), cmp);
        }
    }

    #[tracing::instrument(name = "stroll::dbn", skip(self, cmp), level = "trace")]
    unsafe fn extract(&mut self, cmp: &mut Cmp<N>) -> NonNull<N> {
        debug_assert!(!self.is_empty());

        let min = self.min.unwrap();
        let mut roots = collect_roots(roots_head(self));
        let idx = roots.iter().position(|&r| r == min).unwrap();
        roots.remove(idx);

        let children = collect_roots(children_ptr(min));
        let merged = merge_trees(roots, children, cmp);
        rebuild_root_list(roots_head(self), merged);
        self.min = scan_min(roots_head(self), cmp);

        N::entry(min)
    }
}

unsafe fn remove_root<N: Linked<DbnLink>>(heap: &mut Dbn<N>, root: NonNull<DbnLink>, cmp: &mut Cmp<N>) {
    let mut roots = collect_roots(roots_head(heap));
    let idx = roots.iter().position(|&r| r == root).unwrap();
    roots.remove(idx);

    let children = collect_roots(children_ptr(root));
    let merged = merge_trees(roots, children, cmp);
    rebuild_root_list(roots_head(heap), merged);
}

/// Exchange the topological role of `node` and its `parent`: order, parent link
/// and children all change hands, so `node` rises one level while its address
/// stays put (spec §4.6/§9, "sift-by-swap"; grounded on `stroll_dbnheap_siftup`).
unsafe fn swap_with_parent(
    mut node: NonNull<DbnLink>,
    mut parent: NonNull<DbnLink>,
    roots_head: NonNull<DlistNode>,
) {
    let grandparent = parent.as_ref().parent;
    let node_order = node.as_ref().order;
    let parent_order = parent.as_ref().order;

    // node's own children (C) will become parent's children after the swap.
    let node_children = collect_roots(children_ptr(node));

    // node's former position among its siblings (parent's children list), captured
    // before detaching it, so parent can be spliced back into that exact slot
    // rather than merely appended to the tail.
    let before = DlistNode::prev(siblings_ptr(node));
    let node_was_front = before == children_ptr(parent);

    // Detach node from parent's children list; detach parent from whatever list
    // it currently sits in (a grandparent's children, or the root list).
    DlistNode::remove(siblings_ptr(node));
    DlistNode::remove(siblings_ptr(parent));

    // node inherits parent's remaining children (S) wholesale, preserving their
    // relative sibling order.
    DlistNode::init(children_ptr(node));
    while let Some(first) = DlistNode::first(children_ptr(parent)) {
        DlistNode::remove(first);
        let mut child = link_of_siblings(first);
        child.as_mut().parent = Some(node);
        DlistNode::append(children_ptr(node), siblings_ptr(child));
    }
    parent.as_mut().parent = Some(node);

    // parent itself takes node's former slot in sibling order rather than the
    // list tail, so order k lands between k+1 and k-1 (DBN order rule).
    if node_was_front {
        DlistNode::insert_after(children_ptr(node), siblings_ptr(parent));
    } else {
        DlistNode::insert_after(before, siblings_ptr(parent));
    }

    // parent inherits node's original children (C).
    DlistNode::init(children_ptr(parent));
    for mut child in node_children {
        child.as_mut().parent = Some(parent);
        DlistNode::append(children_ptr(parent), siblings_ptr(child));
    }

    node.as_mut().order = parent_order;
    parent.as_mut().order = node_order;

    // node takes parent's old position among its former siblings.
    node.as_mut().parent = grandparent;
    match grandparent {
        Some(gp) => DlistNode::append(children_ptr(gp), siblings_ptr(node)),
        None => DlistNode::append(roots_head, siblings_ptr(node)),
    }
}

/// Unconditional bubble to the root, shared by `remove` and `demote`.
unsafe fn bubble_to_root(mut node: NonNull<DbnLink>, roots_head: NonNull<DlistNode>) {
    while let Some(parent) = node.as_ref().parent {
        swap_with_parent(node, parent, roots_head);
    }
}

impl<N: Linked<DbnLink>> AddressableHeapEngine for Dbn<N> {
    #[tracing::instrument(name = "stroll::dbn", skip(self, cmp), level = "trace")]
    unsafe fn remove(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let link = N::link_ptr(node);
        bubble_to_root(link, roots_head(self));
        remove_root(self, link, cmp);
        self.min = scan_min(roots_head(self), cmp);
    }

    /// Conditional bubble: stops as soon as heap order is restored, unlike
    /// `remove`'s unconditional bubble to the root.
    #[tracing::instrument(name = "stroll::dbn", skip(self, cmp), level = "trace")]
    unsafe fn promote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let mut link = N::link_ptr(node);
        let heads = roots_head(self);
        while let Some(parent) = link.as_ref().parent {
            if cmp_links(link, parent, cmp) != Ordering::Less {
                break;
            }
            swap_with_parent(link, parent, heads);
        }
        self.min = scan_min(heads, cmp);
    }

    /// Equivalent to remove then reinsert, reusing the node's storage (spec §4.6).
    #[tracing::instrument(name = "stroll::dbn", skip(self, cmp), level = "trace")]
    unsafe fn demote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let link = N::link_ptr(node);
        let heads = roots_head(self);
        bubble_to_root(link, heads);
        remove_root(self, link, cmp);
        init_link(link);

        let roots = collect_roots(heads);
        let merged = merge_single(roots, link, cmp);
        rebuild_root_list(heads, merged);
        self.min = scan_min(heads, cmp);
    }
}
