//! DRP — rank-pairing heap, full API with amortised-logarithmic bounds.
//!
//! Grounded on `drpheap.c`/`drpheap.h`, the largest and most algorithmically dense
//! of the five engines. A half-tree forest: each node's `child` heads a spine of
//! sibling sub-trees (two edges per spine element give forward/back navigation);
//! an explicit `rank` bounds the amortised cost (spec §4.5, type-2 rank rule).
//!
//! The root list is a heap-owned circular doubly-linked list (`crate::dlist`) —
//! matching spec's own description ("anchored at a heap-owned sentinel", unlike
//! PPR's process-wide one). The root-link tag bit from the original C source (the
//! low bit of a back-edge pointer marking root-list membership) is replaced, per
//! spec §9's explicit recommendation, by the two-variant [`Placement`] enum; rather
//! than retrofitting that tag onto the spine's own back-edge field (which would
//! still require runtime branching on which union member is live), this rewrite
//! keeps the root list and the interior spine as two entirely separate fields and
//! uses `Placement` purely to say which one is currently populated for a node.
//! Interior spine termination uses `Option::None` treated as rank `-1`
//! ([`rank_of`]) rather than a shared sentinel node, since a plain `Option` already
//! expresses "no further spine element" without needing an always-resident dummy.

use crate::dlist::DlistNode;
use crate::heap::{AddressableHeapEngine, Cmp, HeapEngine, Linked};
use std::cmp::Ordering;
use std::ptr::NonNull;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Placement {
    Root,
    Interior,
}

pub struct DrpLink {
    rank: i32,
    /// Head of this node's own spine of children, if any.
    child: Option<NonNull<DrpLink>>,
    /// Forward/back navigation within whatever spine this link is currently
    /// threaded into (as a child of some other node).
    spine_next: Option<NonNull<DrpLink>>,
    spine_prev: Option<NonNull<DrpLink>>,
    /// The node whose `child` pointer leads (transitively, via `spine_prev` chain)
    /// to this link, valid only while `placement == Interior`. Lets the rank-rule
    /// walk climb from any spine position back to the owning half-tree's root.
    spine_owner: Option<NonNull<DrpLink>>,
    root_link: DlistNode,
    placement: Placement,
}

impl DrpLink {
    pub fn new() -> Self {
        DrpLink {
            rank: 0,
            child: None,
            spine_next: None,
            spine_prev: None,
            spine_owner: None,
            root_link: DlistNode::new(),
            placement: Placement::Interior,
        }
    }
}

impl Default for DrpLink {
    fn default() -> Self {
        Self::new()
    }
}

fn root_link_ptr(link: NonNull<DrpLink>) -> NonNull<DlistNode> {
    unsafe { NonNull::new_unchecked(std::ptr::addr_of_mut!((*link.as_ptr()).root_link)) }
}

unsafe fn link_of_root_link(root_link: NonNull<DlistNode>) -> NonNull<DrpLink> {
    NonNull::new_unchecked(
        (root_link.as_ptr() as *mut u8).sub(std::mem::offset_of!(DrpLink, root_link))
            as *mut DrpLink,
    )
}

unsafe fn cmp_links<N: Linked<DrpLink>>(
    a: NonNull<DrpLink>,
    b: NonNull<DrpLink>,
    cmp: &mut Cmp<N>,
) -> Ordering {
    cmp(N::entry(a).as_ref(), N::entry(b).as_ref())
}

fn rank_of(link: Option<NonNull<DrpLink>>) -> i32 {
    match link {
        Some(l) => unsafe { l.as_ref().rank },
        None => -1,
    }
}

/// Type-2 rank rule (spec §4.5/§8 invariant 6): recompute from a node's own
/// `child`/`spine_next` ranks.
fn interior_rank(node: NonNull<DrpLink>) -> i32 {
    unsafe {
        let c = rank_of(node.as_ref().child);
        let s = rank_of(node.as_ref().spine_next);
        std::cmp::max(c, s) + if (c - s).abs() <= 1 { 1 } else { 0 }
    }
}

fn root_rank(node: NonNull<DrpLink>) -> i32 {
    unsafe { rank_of(node.as_ref().child) + 1 }
}

/// Walk upward from a node whose rank might be stale, recomputing and stopping as
/// soon as a recomputation matches the already-stored value (spec §4.5's "rank
/// rule walk").
unsafe fn fix_ranks(mut node: NonNull<DrpLink>) {
    loop {
        let new_rank = if node.as_ref().placement == Placement::Root {
            root_rank(node)
        } else {
            interior_rank(node)
        };

        if new_rank == node.as_ref().rank {
            return;
        }
        node.as_mut().rank = new_rank;

        if node.as_ref().placement == Placement::Root {
            return;
        }

        node = match node.as_ref().spine_prev {
            Some(prev) => prev,
            None => match node.as_ref().spine_owner {
                Some(owner) => owner,
                None => return,
            },
        };
    }
}

/// Join two equal-rank roots/half-trees: the winner becomes parent, the loser
/// becomes the new head of the winner's spine (spec §4.5).
unsafe fn join<N: Linked<DrpLink>>(
    first: NonNull<DrpLink>,
    second: NonNull<DrpLink>,
    cmp: &mut Cmp<N>,
) -> NonNull<DrpLink> {
    debug_assert_eq!(first.as_ref().rank, second.as_ref().rank);

    let (mut parent, mut loser) = if cmp_links(first, second, cmp) != Ordering::Greater {
        (first, second)
    } else {
        (second, first)
    };

    let old_head = parent.as_ref().child;
    loser.as_mut().spine_prev = None;
    loser.as_mut().spine_next = old_head;
    loser.as_mut().spine_owner = Some(parent);
    loser.as_mut().placement = Placement::Interior;
    if let Some(mut old_head) = old_head {
        old_head.as_mut().spine_prev = Some(loser);
    }
    parent.as_mut().child = Some(loser);
    parent.as_mut().rank = loser.as_ref().rank + 1;

    crate::op_count::count_op();
    parent
}

pub struct Drp<N> {
    roots: DlistNode,
    head: Option<NonNull<DrpLink>>,
    _node: std::marker::PhantomData<N>,
}

impl<N> Default for Drp<N> {
    fn default() -> Self {
        let mut heap = Drp {
            roots: DlistNode::new(),
            head: None,
            _node: std::marker::PhantomData,
        };
        unsafe { DlistNode::init(NonNull::from(&heap.roots)) };
        heap
    }
}

fn roots_head_ptr<N>(heap: &Drp<N>) -> NonNull<DlistNode> {
    NonNull::from(&heap.roots)
}

/// Splice `node` into the root list (position does not matter for correctness,
/// only `head` tracks the minimum), marking it as a root.
unsafe fn inject_root<N>(heap: &mut Drp<N>, mut node: NonNull<DrpLink>) {
    node.as_mut().placement = Placement::Root;
    node.as_mut().spine_owner = None;
    DlistNode::append(roots_head_ptr(heap), root_link_ptr(node));
}

unsafe fn remove_root_link<N>(heap: &mut Drp<N>, node: NonNull<DrpLink>) {
    DlistNode::remove(root_link_ptr(node));
    if heap.head == Some(node) {
        heap.head = crate::dlist::iter(roots_head_ptr(heap))
            .next()
            .map(|l| link_of_root_link(l));
    }
}

/// Every root in the list, detached one at a time.
unsafe fn drain_roots<N>(heap: &mut Drp<N>) -> Vec<NonNull<DrpLink>> {
    let head_ptr = roots_head_ptr(heap);
    let mut out = Vec::new();
    while let Some(first) = DlistNode::first(head_ptr) {
        DlistNode::remove(first);
        out.push(link_of_root_link(first));
    }
    heap.head = None;
    out
}

/// Bucket-merge: feed every produced/remaining root into a rank-indexed bucket
/// array, joining on collision (carry, like binary addition), then scan the
/// occupancy bitmap via find-first-set to enumerate survivors in rank order,
/// hoisting the minimum to the front as each bucket is visited (spec §4.5/§8
/// Scenario F).
unsafe fn restore_order<N: Linked<DrpLink>>(
    heap: &mut Drp<N>,
    inputs: Vec<NonNull<DrpLink>>,
    cmp: &mut Cmp<N>,
) {
    let mut bitmap: u64 = 0;
    let mut buckets: [Option<NonNull<DrpLink>>; 64] = [None; 64];

    for mut root in inputs {
        root.as_mut().placement = Placement::Root;
        let mut carry = root;
        loop {
            let rank = carry.as_ref().rank as u32;
            debug_assert!(rank < 64);
            if crate::bmap::test(bitmap, rank) {
                let occupant = buckets[rank as usize].take();
                crate::bmap::clear(&mut bitmap, rank);
                carry = join(carry, occupant.unwrap(), cmp);
            } else {
                buckets[rank as usize] = Some(carry);
                crate::bmap::set(&mut bitmap, rank);
                break;
            }
        }
    }

    let mut survivors = Vec::new();
    let mut scan = bitmap;
    while let Some(bit) = crate::bmap::find_first_set(scan) {
        let rank = bit - 1;
        crate::bmap::clear(&mut scan, rank);
        survivors.push(buckets[rank as usize].take().unwrap());
    }

    if survivors.is_empty() {
        return;
    }

    let mut min = survivors[0];
    for &candidate in &survivors[1..] {
        if cmp_links(candidate, min, cmp) == Ordering::Less {
            min = candidate;
        }
    }

    for root in &survivors {
        inject_root(heap, *root);
    }
    heap.head = Some(min);
}

impl<N: Linked<DrpLink>> HeapEngine for Drp<N> {
    type Node = N;
    type Link = DrpLink;

    fn setup(&mut self) {
        unsafe { DlistNode::init(roots_head_ptr(self)) };
        self.head = None;
    }

    fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the head of the root list directly, with no recompute (spec §9's
    /// open question: resolved by trusting the original's literal behaviour —
    /// every mutator re-hoists the minimum to the head before returning).
    unsafe fn peek(&self) -> NonNull<N> {
        debug_assert!(!self.is_empty());
        N::entry(self.head.unwrap())
    }

    #[tracing::instrument(name = "stroll::drp", skip(self, cmp), level = "trace")]
    unsafe fn insert(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        let mut link = N::link_ptr(node);
        link.as_mut().rank = 0;
        link.as_mut().child = None;

        match self.head {
            None => {
                inject_root(self, link);
                self.head = Some(link);
            }
            Some(head) => {
                inject_root(self, link);
                if cmp_links(link, head, cmp) == Ordering::Less {
                    self.head = Some(link);
                }
            }
        }
    }

    #[tracing::instrument(name = "stroll::drp", skip(self, source, cmp), level = "trace")]
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<N>) {
        let Some(source_head) = source.head else {
            return;
        };
        let source_roots = unsafe { drain_roots(source) };

        match self.head {
            None => {
                for root in source_roots {
                    unsafe { inject_root(self, root) };
                }
                self.head = Some(source_head);
            }
            Some(head) => {
                for root in source_roots {
                    unsafe { inject_root(self, root) };
                }
                if unsafe { cmp_links(source_head, head, cmp) } == Ordering::Less {
                    self.head = Some(source_head);
                }
            }
        }
    }

    #[tracing::instrument(name = "stroll::drp", skip(self, cmp), level = "trace")]
    unsafe fn extract(&mut self, cmp: &mut Cmp<N>) -> NonNull<N> {
        debug_assert!(!self.is_empty());

        let root = self.head.unwrap();
        remove_root_link(self, root);

        let mut spine = Vec::new();
        let mut cursor = root.as_ref().child;
        while let Some(mut node) = cursor {
            cursor = node.as_ref().spine_next;
            node.as_mut().rank = interior_rank_for_detach(node);
            spine.push(node);
        }

        let remaining = drain_roots(self);
        let mut all = spine;
        all.extend(remaining);
        restore_order(self, all, cmp);

        N::entry(root)
    }
}

/// Recompute rank for a spine element being promoted to a root, isolated from its
/// former neighbours (its own `child` rank is unaffected by detachment; only the
/// root-rank formula differs from the interior one, so we just apply that here
/// once `placement` flips in `restore_order`/`inject_root`).
unsafe fn interior_rank_for_detach(node: NonNull<DrpLink>) -> i32 {
    root_rank(node)
}

impl<N: Linked<DrpLink>> AddressableHeapEngine for Drp<N> {
    #[tracing::instrument(name = "stroll::drp", skip(self, cmp), level = "trace")]
    unsafe fn remove(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let link = N::link_ptr(node);
        let was_head = self.head == Some(link);
        let had_children = link.as_ref().child.is_some();

        if link.as_ref().placement == Placement::Root {
            remove_root_link(self, link);
        } else {
            detach_interior(link);
        }

        // A childless node that wasn't the head leaves the rest of the forest
        // untouched: detaching it already walked the rank rule (or simply
        // dropped a root), and there are no orphaned children to re-bucket.
        if !had_children && !was_head {
            return;
        }

        let mut orphans = Vec::new();
        let mut cursor = link.as_ref().child;
        while let Some(mut n) = cursor {
            cursor = n.as_ref().spine_next;
            n.as_mut().rank = root_rank(n);
            orphans.push(n);
        }

        let remaining = drain_roots(self);
        orphans.extend(remaining);
        restore_order(self, orphans, cmp);
    }

    #[tracing::instrument(name = "stroll::drp", skip(self, cmp), level = "trace")]
    unsafe fn promote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let mut link = N::link_ptr(node);

        if link.as_ref().placement == Placement::Root {
            if Some(link) != self.head && cmp_links(link, self.head.unwrap(), cmp) == Ordering::Less
            {
                self.head = Some(link);
            }
            return;
        }

        detach_interior(link);
        link.as_mut().rank = root_rank(link);
        inject_root(self, link);
        if cmp_links(link, self.head.unwrap(), cmp) != Ordering::Greater {
            self.head = Some(link);
        }
    }

    #[tracing::instrument(name = "stroll::drp", skip(self, cmp), level = "trace")]
    unsafe fn demote(&mut self, node: NonNull<N>, cmp: &mut Cmp<N>) {
        debug_assert!(!self.is_empty());
        let mut link = N::link_ptr(node);
        let was_head = self.head == Some(link);
        let had_children = link.as_ref().child.is_some();

        // A demoted key only ever has to satisfy its relationship to its own
        // children and, if it's the head, to the rest of the forest. A
        // childless, non-head node has neither, so the whole operation is a
        // no-op — it stays exactly where it is.
        if !had_children && !was_head {
            return;
        }

        if link.as_ref().placement == Placement::Root {
            remove_root_link(self, link);
        } else {
            detach_interior(link);
        }

        let orphaned_children = {
            let mut orphans = Vec::new();
            let mut cursor = link.as_ref().child;
            while let Some(mut n) = cursor {
                cursor = n.as_ref().spine_next;
                n.as_mut().rank = root_rank(n);
                orphans.push(n);
            }
            orphans
        };

        link.as_mut().rank = 0;
        link.as_mut().child = None;

        let mut inputs = vec![link];
        inputs.extend(orphaned_children);
        inputs.extend(drain_roots(self));
        restore_order(self, inputs, cmp);
    }
}

/// Splice an interior node out of whatever spine it sits in, then walk the rank
/// rule upward from its former position (spec §4.5).
unsafe fn detach_interior(node: NonNull<DrpLink>) {
    debug_assert_eq!(node.as_ref().placement, Placement::Interior);

    let prev = node.as_ref().spine_prev;
    let next = node.as_ref().spine_next;
    let owner = node.as_ref().spine_owner;

    match prev {
        Some(mut prev) => {
            prev.as_mut().spine_next = next;
            if let Some(mut next) = next {
                next.as_mut().spine_prev = Some(prev);
            }
            fix_ranks(prev);
        }
        None => {
            let mut owner = owner.expect("interior node must have an owner");
            owner.as_mut().child = next;
            if let Some(mut next) = next {
                next.as_mut().spine_prev = None;
                next.as_mut().spine_owner = Some(owner);
            }
            fix_ranks(owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroll_intrusive_node;
    use std::cmp::Ordering;

    struct IntNode {
        link: DrpLink,
        key: i32,
    }

    stroll_intrusive_node!(IntNode, DrpLink, link);

    fn cmp(a: &IntNode, b: &IntNode) -> Ordering {
        a.key.cmp(&b.key)
    }

    fn leak(key: i32) -> NonNull<IntNode> {
        NonNull::from(Box::leak(Box::new(IntNode {
            link: DrpLink::new(),
            key,
        })))
    }

    #[test]
    fn insert_then_extract_is_sorted() {
        let mut heap: Drp<IntNode> = Drp::default();
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
    fn decrease_key_then_extract_returns_that_node() {
        let mut heap: Drp<IntNode> = Drp::default();
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
}
