//! Intrusive, allocation-free building blocks.
//!
//! This crate provides the storage primitives behind the `sigslot` crate:
//! membership structures that live *inside* the objects they link, and a
//! fixed-size buffer for type-erased values. Nothing here ever allocates.
//!
//! # Design Philosophy
//!
//! Traditional collections own their elements:
//!
//! ```text
//! LinkedList<T>  - owns nodes, allocates per push
//! Vec<Box<T>>    - owns pointers, allocates per push, O(n) removal
//! ```
//!
//! Intrusive collections invert the model:
//!
//! ```text
//! Link           - embedded in the element, two neighbour pointers
//! IntrusiveList  - a sentinel Link, nothing else
//! ```
//!
//! Benefits:
//! - **Zero allocation**: pushing splices pointers already inside the element
//! - **O(1) removal from anywhere**: an element unlinks itself, no search
//! - **Automatic cleanup**: dropping an element unlinks it; dropping the list
//!   unlinks every element
//!
//! # Quick Start
//!
//! ```
//! use core::pin::pin;
//! use sigslot_collections::{IntrusiveList, Link, impl_linked};
//!
//! struct Timer {
//!     deadline: u64,
//!     link: Link,
//! }
//!
//! impl_linked!(Timer, link);
//!
//! let timers = pin!(IntrusiveList::<Timer>::new());
//! let timers = timers.into_ref();
//!
//! let soon = pin!(Timer { deadline: 10, link: Link::new() });
//! let later = pin!(Timer { deadline: 20, link: Link::new() });
//! timers.push_back(soon.as_ref());
//! timers.push_back(later.as_ref());
//! assert_eq!(timers.len(), 2);
//!
//! // O(1) removal, no list handle needed
//! soon.link.remove();
//! assert_eq!(timers.len(), 1);
//! ```
//!
//! # Pinning
//!
//! Linked elements are referenced by address from their neighbours, so both
//! the list and its elements must be pinned before they can be linked. An
//! unpinned [`Link`] is always unlinked, which makes moving it harmless.
//! To move a linked element, pin a new one and call
//! [`Link::relocate_from`] with a pointer from [`Linked::link_of`]: it takes
//! over the old element's exact position.
//!
//! # Single-Threaded
//!
//! Links rewire through [`Cell`](core::cell::Cell)s and raw pointers, so
//! [`Link`], [`IntrusiveList`] and every type embedding a link are `!Send`
//! and `!Sync`. [`InlineStorage`] is plain bytes and has no such limit.
//!
//! # Performance
//!
//! | Operation | Cost | Notes |
//! |-----------|------|-------|
//! | push_back / push_front | O(1) | Four pointer writes |
//! | remove | O(1) | From anywhere, idempotent |
//! | swap / relocate_from | O(1) | Adjacent and cross-ring safe |
//! | is_empty | O(1) | Sentinel test |
//! | len / clear | O(n) | Ring walk |
//!
//! Run `cargo test --release -- --ignored --nocapture` for cycle histograms.

#![warn(missing_docs)]

pub mod link;
pub mod list;
pub mod storage;

pub use link::Link;
pub use list::{IntrusiveList, Iter, Linked};
pub use storage::{InlineStorage, MAX_ALIGN, Pod};
