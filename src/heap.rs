//! The abstract heap contract shared by all five engines (HPR, DPR, PPR, DRP, DBN)
//! plus the intrusive link-to-entry projection machinery each engine builds on.
//!
//! Every operation that has a precondition which is only checked by assertion (never
//! recovered at runtime) is marked `unsafe`: `peek`/`insert`/`extract` on the base
//! contract, and `remove`/`promote`/`demote` on the addressable contract. `setup`,
//! `is_empty` and `merge` have no such precondition and stay safe.

use std::cmp::Ordering;
use std::ptr::NonNull;

/// A trichotomous comparator over two live nodes. Must induce a total preorder on
/// the set of nodes currently reachable from any heap it is invoked on, for the
/// duration of the call that uses it.
pub type Cmp<N> = dyn FnMut(&N, &N) -> Ordering;

/// A node type that embeds an intrusive link `L` at a fixed byte offset.
///
/// Engines never store or own a `Self`; they operate purely on `NonNull<L>` and use
/// this trait only at the two points where they must hand a live node back to the
/// caller's comparator or return value: projecting a link pointer to its enclosing
/// node (`entry`) and the reverse (`link_ptr`).
///
/// # Safety
/// `link_offset` must be the true, stable byte offset of the `L` field embedded in
/// `Self`. Implement via [`stroll_intrusive_node`] rather than by hand.
pub unsafe trait Linked<L> {
    fn link_offset() -> usize;

    /// # Safety
    /// `link` must point at the `L` field embedded in a live `Self`.
    unsafe fn entry(link: NonNull<L>) -> NonNull<Self>
    where
        Self: Sized,
    {
        NonNull::new_unchecked(
            (link.as_ptr() as *mut u8).sub(Self::link_offset()) as *mut Self
        )
    }

    fn link_ptr(this: NonNull<Self>) -> NonNull<L>
    where
        Self: Sized,
    {
        unsafe {
            NonNull::new_unchecked((this.as_ptr() as *mut u8).add(Self::link_offset()) as *mut L)
        }
    }
}

/// Implement [`Linked`] for a caller node type that embeds an engine's link as a
/// named field, using the stable `offset_of!` projection.
#[macro_export]
macro_rules! stroll_intrusive_node {
    ($node:ty, $link:ty, $field:ident) => {
        unsafe impl $crate::heap::Linked<$link> for $node {
            fn link_offset() -> usize {
                ::std::mem::offset_of!($node, $field)
            }
        }
    };
}

/// Compare two links by projecting each to its enclosing node first.
///
/// # Safety
/// `a` and `b` must each point at the `L` field embedded in a live `N`.
pub unsafe fn cmp_links<N: Linked<L>, L>(
    a: NonNull<L>,
    b: NonNull<L>,
    cmp: &mut Cmp<N>,
) -> Ordering {
    cmp(N::entry(a).as_ref(), N::entry(b).as_ref())
}

/// Operations exposed by every engine's base (spec §4.1). Every full-API engine
/// (DPR, PPR, DRP, DBN) additionally implements [`AddressableHeapEngine`]; HPR
/// implements only this trait, since its half-tree-without-parent encoding cannot
/// locate an arbitrary node in better than linear time.
pub trait HeapEngine {
    type Node: Linked<Self::Link>;
    type Link;

    /// Initialise `self` to empty. No allocation.
    fn setup(&mut self);

    fn is_empty(&self) -> bool;

    /// Return the minimum-key node. Does not mutate.
    ///
    /// # Safety
    /// Undefined on an empty heap.
    unsafe fn peek(&self) -> NonNull<Self::Node>;

    /// Link `node` as a singleton into `self`, establishing heap order.
    ///
    /// # Safety
    /// `node` must not already be linked into any heap.
    unsafe fn insert(&mut self, node: NonNull<Self::Node>, cmp: &mut Cmp<Self::Node>);

    /// Absorb all nodes of `source` into `self`. On return `source` is logically
    /// empty; the caller must not touch it again until re-[`setup`](Self::setup).
    fn merge(&mut self, source: &mut Self, cmp: &mut Cmp<Self::Node>)
    where
        Self: Sized;

    /// Remove and return the minimum-key node.
    ///
    /// # Safety
    /// Undefined on an empty heap.
    unsafe fn extract(&mut self, cmp: &mut Cmp<Self::Node>) -> NonNull<Self::Node>;
}

/// Node-addressable operations exposed by the full-API engines (spec §4.1, §9's
/// capability-set note: HPR simply does not implement this trait rather than
/// carrying runtime-refusing stubs for it).
pub trait AddressableHeapEngine: HeapEngine {
    /// Detach an arbitrary linked node from `self`, re-establishing all invariants.
    ///
    /// # Safety
    /// `node` must currently be linked into `self`.
    unsafe fn remove(&mut self, node: NonNull<Self::Node>, cmp: &mut Cmp<Self::Node>);

    /// The caller has already decreased `node`'s effective key; restore heap order.
    ///
    /// # Safety
    /// `node` must currently be linked into `self`.
    unsafe fn promote(&mut self, node: NonNull<Self::Node>, cmp: &mut Cmp<Self::Node>);

    /// The caller has already increased `node`'s effective key; restore heap order.
    ///
    /// # Safety
    /// `node` must currently be linked into `self`.
    unsafe fn demote(&mut self, node: NonNull<Self::Node>, cmp: &mut Cmp<Self::Node>);
}
