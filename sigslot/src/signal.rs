//! Signals: broadcast points that call every connected slot in order.

use sigslot_collections::{IntrusiveList, Link, Linked};

use crate::slot::{Connectable, FnSlot, Slot, SlotBase, SlotRef};

use core::fmt;
use core::pin::{Pin, pin};
use core::ptr::NonNull;

/// An event source that calls every connected slot, in connection order.
///
/// The signal owns ring membership only; slots live wherever their owner put
/// them and stay connected until they disconnect, are dropped, or the signal
/// is dropped. Both the signal and its slots must be pinned to connect.
///
/// Slots may disconnect themselves or each other, connect new slots, and
/// emit the same signal again from inside a call. Slots connected during an
/// emit are first called by the next emit.
///
/// # Example
///
/// ```
/// use core::cell::Cell;
/// use core::pin::pin;
/// use sigslot::{Signal, connect};
///
/// let signal = pin!(Signal::<Cell<i32>>::new());
/// let signal = signal.into_ref();
///
/// connect!(signal, let double = |c: &Cell<i32>| c.set(c.get() * 2));
/// connect!(signal, let inc = |c: &Cell<i32>| c.set(c.get() + 1));
///
/// let value = Cell::new(3);
/// signal.emit(&value);
/// assert_eq!(value.get(), 7);
///
/// double.disconnect();
/// signal.emit(&value);
/// assert_eq!(value.get(), 8);
/// # let _ = inc;
/// ```
pub struct Signal<A: ?Sized, R = ()> {
    slots: IntrusiveList<SlotBase<A, R>>,
}

impl<A: ?Sized, R> Signal<A, R> {
    /// Creates a signal with no slots.
    #[inline]
    pub const fn new() -> Self {
        Self {
            slots: IntrusiveList::new(),
        }
    }

    #[inline]
    fn slots(self: Pin<&Self>) -> Pin<&IntrusiveList<SlotBase<A, R>>> {
        // Safety: structural pin projection.
        unsafe { self.map_unchecked(|signal| &signal.slots) }
    }

    /// Connects `slot` at the end of the call order.
    ///
    /// A slot already connected to a signal (this one or another) is
    /// disconnected from it first, so a slot is called at most once per emit.
    #[inline]
    pub fn connect<S>(self: Pin<&Self>, slot: Pin<&S>)
    where
        S: Connectable<A, R> + ?Sized,
    {
        let base = slot.slot_ptr();
        // Safety: `Connectable` hands out a pinned base with provenance over
        // the whole slot.
        unsafe { self.slots().push_back_raw(base) };
        trace!(slot = ?base, "slot connected");
    }

    /// Builds an unconnected inline [`Slot`] forwarding to `f`.
    ///
    /// This is what [`connect!`](crate::connect) pins and connects; it is
    /// exposed so `f`'s argument type is inferred from the signal.
    #[inline]
    pub fn make_slot<F, Ret>(&self, f: F) -> Slot<A, R>
    where
        F: Fn(&A) -> Ret + Copy + 'static,
        Ret: Into<R>,
    {
        Slot::new(move |_: SlotRef<'_, A, R>, args: &A| f(args))
    }

    /// Boxes `f` into a heap-pinned slot and connects it.
    ///
    /// Works for any `Fn`, including callables that own resources or are too
    /// large for inline storage. The returned box can be moved freely; the
    /// slot stays connected until the box is dropped or the slot disconnects.
    ///
    /// `f` must not drop the box it lives in while it runs, for example
    /// through a shared container it captured.
    ///
    /// ```
    /// use core::pin::pin;
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use sigslot::Signal;
    ///
    /// let log = Rc::new(RefCell::new(Vec::new()));
    /// let signal = pin!(Signal::<str>::new());
    /// let signal = signal.into_ref();
    ///
    /// let sink = {
    ///     let log = Rc::clone(&log);
    ///     signal.connect_fn(move |line: &str| log.borrow_mut().push(line.to_owned()))
    /// };
    ///
    /// signal.emit("hello");
    /// drop(sink);
    /// signal.emit("dropped");
    ///
    /// assert_eq!(*log.borrow(), ["hello"]);
    /// ```
    pub fn connect_fn<F, Ret>(self: Pin<&Self>, f: F) -> Pin<Box<FnSlot<A, R, F>>>
    where
        F: Fn(&A) -> Ret + 'static,
        Ret: Into<R>,
    {
        let slot = Box::pin(FnSlot::new(f));
        self.connect(slot.as_ref());
        slot
    }

    /// Calls every connected slot with `args`, in connection order.
    ///
    /// Slot return values are discarded.
    pub fn emit(&self, args: &A) {
        if self.slots.is_empty() {
            return;
        }

        // Safety: only a pinned signal can have slots, and it stays pinned
        // until dropped.
        let this = unsafe { Pin::new_unchecked(self) };
        let slots = this.slots();
        let sentinel = NonNull::from(slots.sentinel().get_ref());

        let end = pin!(SlotBase::<A, R>::marker());
        let end = end.into_ref();
        let cursor = pin!(SlotBase::<A, R>::marker());
        let cursor = cursor.into_ref();

        // Slots connected from now on land behind `end` and wait for the next
        // emit. `cursor` is moved past each slot before it is called, so the
        // slot may disconnect anything, itself included.
        slots.push_back(end);
        slots.push_front(cursor);
        let end_link = SlotBase::<A, R>::link_of(NonNull::from(end.get_ref()));
        let cursor_link = SlotBase::<A, R>::link_of(NonNull::from(cursor.get_ref()));

        loop {
            // Unlinked cursor: every slot was disconnected mid-emit.
            if !cursor.is_connected() {
                break;
            }

            let next = cursor.link.next();
            if next == end_link || next == sentinel {
                break;
            }

            // Safety: `cursor` is a pinned marker, a whole slot base of its
            // own, and `next` is a live link of this ring.
            unsafe { Link::insert_after(cursor_link, next) };

            // Safety: every link in this ring besides the sentinel belongs to
            // a slot base, and was linked with provenance over its slot.
            let slot = unsafe { SlotBase::<A, R>::from_link(next) };
            if unsafe { slot.as_ref() }.is_marker() {
                // a nested emit's bookkeeping
                continue;
            }

            // Safety: see above.
            let _ = unsafe { SlotBase::<A, R>::call_raw(slot, args) };
        }
    }

    /// Returns `true` if no slot is connected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        // Safety: nothing is dropped or linked during the walk.
        self.slots.is_empty() || unsafe { self.slots.iter() }.all(SlotBase::is_marker)
    }

    /// Counts the connected slots. O(n).
    pub fn len(&self) -> usize {
        // Safety: nothing is dropped or linked during the walk.
        unsafe { self.slots.iter() }
            .filter(|slot| !slot.is_marker())
            .count()
    }

    /// Disconnects every slot. O(n).
    ///
    /// Called from inside a slot, this also ends the current emit.
    pub fn disconnect_all(&self) {
        trace!(slots = self.len(), "disconnecting all slots");
        self.slots.clear();
    }
}

impl<A: ?Sized, R> Default for Signal<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized, R> fmt::Debug for Signal<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.len())
            .finish()
    }
}
