//! Intrusive mergeable-heap primitives: five heap engines sharing one link-to-entry
//! projection contract ([`heap::Linked`], [`heap::HeapEngine`]), plus the small
//! collaborators (`bmap`, `slist`, `dlist`, `fheap`, `bisect`) that round out the
//! repository boundary around them.
//!
//! Engines are compiled in individually via Cargo features (`hpr`, `dpr`, `ppr`,
//! `drp`, `dbn`); all five are in `default`.

pub mod bmap;
pub mod slist;

#[cfg(any(feature = "dpr", feature = "dbn", feature = "dlist"))]
pub mod dlist;

pub mod heap;

#[cfg(feature = "hpr")]
pub mod hpr;
#[cfg(feature = "ppr")]
pub mod ppr;
#[cfg(feature = "dpr")]
pub mod dpr;
#[cfg(feature = "drp")]
pub mod drp;
#[cfg(feature = "dbn")]
pub mod dbn;

pub mod bounded;
pub mod bisect;
pub mod fheap;
pub mod op_count;

#[cfg(test)]
mod tests;
