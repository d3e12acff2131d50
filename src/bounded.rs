//! A capacity-limited wrapper around any [`HeapEngine`], binding one comparator for
//! the lifetime of the wrapper (spec §4.7).

use crate::heap::{Cmp, HeapEngine};
use std::ptr::NonNull;

pub struct Bounded<E: HeapEngine> {
    base: E,
    cmp: Box<Cmp<E::Node>>,
    count: usize,
    capacity: usize,
}

impl<E: HeapEngine> Bounded<E> {
    /// Stack/caller-allocated constructor. Infallible: Rust does not need to
    /// heap-allocate the wrapper itself the way the original's `create()` does.
    pub fn new(mut base: E, capacity: usize, cmp: Box<Cmp<E::Node>>) -> Self {
        base.setup();
        Bounded {
            base,
            cmp,
            count: 0,
            capacity,
        }
    }

    /// Heap-allocating factory mirroring the original's `malloc`-returns-NULL
    /// constructor. The only genuinely fallible operation in this crate (spec §7).
    pub fn try_new_boxed(base: E, capacity: usize, cmp: Box<Cmp<E::Node>>) -> Option<Box<Self>> {
        let layout = std::alloc::Layout::new::<Self>();
        let ptr = unsafe { std::alloc::alloc(layout) } as *mut Self;
        let ptr = NonNull::new(ptr)?;
        unsafe { ptr.as_ptr().write(Self::new(base, capacity, cmp)) };
        Some(unsafe { Box::from_raw(ptr.as_ptr()) })
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// # Safety
    /// Undefined on an empty heap.
    pub unsafe fn peek(&self) -> NonNull<E::Node> {
        self.base.peek()
    }

    /// # Safety
    /// `node` must not already be linked into any heap. Asserts `count < capacity`
    /// always (even in release builds), since an over-capacity bounded heap is data
    /// corruption, not a debug-only nicety (spec §4.7, §7).
    pub unsafe fn insert(&mut self, node: NonNull<E::Node>) {
        assert!(self.count < self.capacity, "stroll: bounded heap is full");
        self.base.insert(node, &mut self.cmp);
        self.count += 1;
    }

    /// # Safety
    /// Undefined on an empty heap.
    pub unsafe fn extract(&mut self) -> NonNull<E::Node> {
        debug_assert!(!self.is_empty());
        let node = self.base.extract(&mut self.cmp);
        self.count -= 1;
        node
    }

    pub fn merge(&mut self, source: &mut Self) {
        assert!(
            self.count + source.count <= self.capacity,
            "stroll: merge would exceed bounded heap capacity"
        );
        self.base.merge(&mut source.base, &mut self.cmp);
        self.count += source.count;
        source.count = 0;
    }
}

impl<E: crate::heap::AddressableHeapEngine> Bounded<E> {
    /// # Safety
    /// `node` must currently be linked into this heap.
    pub unsafe fn remove(&mut self, node: NonNull<E::Node>) {
        debug_assert!(!self.is_empty());
        self.base.remove(node, &mut self.cmp);
        self.count -= 1;
    }

    /// # Safety
    /// `node` must currently be linked into this heap.
    pub unsafe fn promote(&mut self, node: NonNull<E::Node>) {
        self.base.promote(node, &mut self.cmp);
    }

    /// # Safety
    /// `node` must currently be linked into this heap.
    pub unsafe fn demote(&mut self, node: NonNull<E::Node>) {
        self.base.demote(node, &mut self.cmp);
    }
}
