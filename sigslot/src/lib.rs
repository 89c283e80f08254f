//! Zero-allocation intrusive signals and slots.
//!
//! A [`Signal`] broadcasts to every connected slot, in connection order. The
//! signal never owns its slots: each slot embeds the link that threads it
//! into the signal's ring, so connecting, disconnecting and emitting never
//! allocate, and dispatch is a plain function-pointer call per slot.
//!
//! # Example
//!
//! ```
//! use core::cell::Cell;
//! use core::pin::pin;
//! use sigslot::{Signal, connect};
//!
//! #[derive(Default)]
//! struct Frame {
//!     presented: Cell<u32>,
//!     damaged: Cell<u32>,
//! }
//!
//! let frame = pin!(Signal::<Frame>::new());
//! let frame = frame.into_ref();
//!
//! connect!(frame, let present = |f: &Frame| f.presented.set(f.presented.get() + 1));
//! connect!(frame, let damage = |f: &Frame| f.damaged.set(f.damaged.get() + 1));
//!
//! let state = Frame::default();
//! frame.emit(&state);
//! assert_eq!((state.presented.get(), state.damaged.get()), (1, 1));
//!
//! // Dropping or disconnecting a slot removes it in O(1)
//! damage.disconnect();
//! frame.emit(&state);
//! assert_eq!((state.presented.get(), state.damaged.get()), (2, 1));
//! # let _ = present;
//! ```
//!
//! # Slot Flavours
//!
//! | Flavour | Storage | Callable | How to connect |
//! |---------|---------|----------|----------------|
//! | [`Slot<A, R, N>`] | `N` bytes inline | `Copy + 'static`, sees its own [`SlotRef`] | `signal.connect(slot)`, or [`connect!`] |
//! | [`FnSlot<A, R, F>`] | exactly `F` | any `Fn + 'static` | [`Signal::connect_fn`] (one allocation) |
//! | your own type | embeds a [`SlotBase`] | anything | implement [`Connectable`] |
//!
//! The callable of a [`Slot`] receives a [`SlotRef`] to itself. A slot
//! embedded in a larger object can recover that object from
//! [`SlotRef::as_ptr`] with [`container_of!`], which
//! is how event handlers reach their owner without capturing a pointer to
//! it. Implement [`Connectable`] on the owner so the pointer the signal keeps
//! covers the whole owner.
//!
//! # Pinning and Moves
//!
//! A connected slot is referenced by address, so it must be pinned before it
//! can connect and it cannot be moved while connected. Three ways to live
//! with that:
//!
//! - pin in place: `pin!` on the stack, or [`connect!`] which does it for you;
//! - pin on the heap: [`Signal::connect_fn`] returns a `Pin<Box<_>>` that can be
//!   moved freely;
//! - relocate: clone the slot into its new pinned home and call
//!   [`Slot::relocate_from`], which transfers the connection in O(1).
//!
//! # Reentrancy
//!
//! A slot may disconnect itself or any other slot, connect new slots,
//! disconnect everything, or emit the same signal again. Slots connected
//! while an emit is running are first reached by the next emit.
//!
//! # Threading
//!
//! Everything here is single-threaded: signals and slots are `!Send` and
//! `!Sync`, and emit runs every slot on the calling thread.
//!
//! # Feature Flags
//!
//! - `tracing` - emit `trace!` events on connect and bulk disconnect; the
//!   events are covered by `cargo test --features tracing`

#![warn(missing_docs)]

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
    };
}

pub mod signal;
pub mod slot;

pub use signal::Signal;
pub use slot::{CallFn, Connectable, DEFAULT_CAPACITY, FnSlot, Slot, SlotBase, SlotRef};
pub use sigslot_collections::container_of;

/// Builds an inline slot from a closure, pins it in place and connects it.
///
/// `connect!(signal, let name = f)` binds `name` to the pinned slot
/// (`Pin<&Slot<A, R>>`) for the rest of the enclosing block. The slot
/// disconnects when the block ends. `signal` must be a `Pin<&Signal<A, R>>`
/// and `f` a `Copy + 'static` closure taking `&A`.
///
/// ```
/// use core::cell::Cell;
/// use core::pin::pin;
/// use sigslot::{Signal, connect};
///
/// let signal = pin!(Signal::<Cell<u8>>::new());
/// let signal = signal.into_ref();
///
/// {
///     connect!(signal, let slot = |c: &Cell<u8>| c.set(c.get() + 1));
///     assert!(slot.is_connected());
///     assert_eq!(signal.len(), 1);
/// }
///
/// assert!(signal.is_empty());
/// ```
#[macro_export]
macro_rules! connect {
    ($signal:expr, let $slot:ident = $f:expr) => {
        let signal = $signal;
        let $slot = ::core::pin::pin!(signal.make_slot($f));
        let $slot = $slot.into_ref();
        signal.connect($slot);
    };
}
