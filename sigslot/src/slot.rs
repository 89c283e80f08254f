//! Slots: type-erased callables that can be linked into a [`Signal`].
//!
//! Every slot starts with a [`SlotBase`]: the ring [`Link`] plus a plain
//! function pointer that knows the concrete slot type. A signal only ever
//! sees `SlotBase`s; the function pointer recovers the rest.
//!
//! | Type | Callable storage | Allocation |
//! |------|------------------|------------|
//! | [`Slot<A, R, N>`] | `N` inline bytes, callable must be `Copy` | none |
//! | [`FnSlot<A, R, F>`] | `F` stored directly, any `Fn` | caller's choice, `Signal::connect_fn` boxes it |
//!
//! The pointer a signal keeps for a slot comes from [`Connectable::slot_ptr`]
//! and covers the whole concrete slot, or the whole object embedding it.
//! Operations that move a slot's connection therefore take the concrete
//! slot, not a bare `&SlotBase`.
//!
//! [`Signal`]: crate::Signal

use sigslot_collections::{InlineStorage, Link, Linked};

use core::fmt;
use core::marker::PhantomData;
use core::mem::size_of;
use core::ops::Deref;
use core::pin::Pin;
use core::ptr::NonNull;

/// Function pointer invoked for a slot.
///
/// Receives a pointer to the slot's [`SlotBase`] carrying provenance over the
/// whole concrete slot, so it can cast back to that type.
pub type CallFn<A, R> = unsafe fn(NonNull<SlotBase<A, R>>, &A) -> R;

/// Default inline capacity of a [`Slot`]: four machine words.
pub const DEFAULT_CAPACITY: usize = 4 * size_of::<usize>();

// =============================================================================
// SlotBase
// =============================================================================

/// The part of every slot a [`Signal`](crate::Signal) links and calls.
///
/// Identity is the address: two slot bases are the same slot only if they
/// are the same object.
#[repr(C)]
pub struct SlotBase<A: ?Sized, R = ()> {
    pub(crate) link: Link,
    call: Option<CallFn<A, R>>,
}

// Safety: `link` is a `Link` field at the recorded offset, and `SlotBase`
// is `!Unpin` through it.
unsafe impl<A: ?Sized, R> Linked for SlotBase<A, R> {
    const LINK_OFFSET: usize = core::mem::offset_of!(SlotBase<A, R>, link);
}

impl<A: ?Sized, R> SlotBase<A, R> {
    /// Creates an unconnected slot base dispatching through `call`.
    ///
    /// # Safety
    ///
    /// `call` is only ever handed pointers to this `SlotBase`. The caller
    /// must embed it in the type `call` expects, at the offset `call`
    /// expects, implement [`Connectable`] for that type, and never hand out
    /// a `Pin<&SlotBase>` of the embedded base.
    #[inline]
    pub const unsafe fn new(call: CallFn<A, R>) -> Self {
        Self {
            link: Link::new(),
            call: Some(call),
        }
    }

    /// A callable-less base a signal uses to mark its place during dispatch.
    #[inline]
    pub(crate) const fn marker() -> Self {
        Self {
            link: Link::new(),
            call: None,
        }
    }

    /// An unconnected base with the same call function. Only valid for
    /// embedding in a copy of the same concrete slot.
    #[inline]
    fn unconnected_copy(&self) -> Self {
        Self {
            link: Link::new(),
            call: self.call,
        }
    }

    #[inline]
    pub(crate) fn is_marker(&self) -> bool {
        self.call.is_none()
    }

    /// Invokes the slot behind `this`.
    ///
    /// # Safety
    ///
    /// `this` must point at a live, non-marker slot base and carry provenance
    /// over the concrete slot that embeds it.
    #[inline]
    pub(crate) unsafe fn call_raw(this: NonNull<Self>, args: &A) -> R {
        let call = unsafe { this.as_ref() }
            .call
            .expect("dispatch marker invoked as a slot");
        unsafe { call(this, args) }
    }

    /// Invokes the callable of `slot` with `args`.
    ///
    /// Works for any [`Connectable`], including owners embedding several
    /// slots; the argument type picks the slot.
    #[inline]
    pub fn call<S>(slot: Pin<&S>, args: &A) -> R
    where
        S: Connectable<A, R> + ?Sized,
    {
        // Safety: `slot_ptr` covers the concrete slot.
        unsafe { Self::call_raw(slot.slot_ptr(), args) }
    }

    /// Disconnects from whatever signal holds this slot. Safe to repeat.
    #[inline]
    pub fn disconnect(&self) {
        self.link.remove();
    }

    /// Returns `true` while connected to a signal.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.link.is_linked()
    }

    /// Moves `source`'s connection to `dest`, leaving `source` disconnected.
    ///
    /// `dest` is reached exactly where `source` used to be in its signal's
    /// call order. Any previous connection of `dest` is dropped.
    #[inline]
    pub fn relocate_from<S>(dest: Pin<&S>, source: &Self)
    where
        S: Connectable<A, R> + ?Sized,
    {
        let this = Self::link_of(dest.slot_ptr());
        // Safety: `dest` is pinned and its pointer covers the concrete slot;
        // `source` can only be linked into a ring of slot bases.
        unsafe { Link::relocate_from(this, &source.link) };
    }

    /// Exchanges the connections (and call order positions) of two slots.
    #[inline]
    pub fn swap<S, T>(a: Pin<&S>, b: Pin<&T>)
    where
        S: Connectable<A, R> + ?Sized,
        T: Connectable<A, R> + ?Sized,
    {
        let a = Self::link_of(a.slot_ptr());
        let b = Self::link_of(b.slot_ptr());
        // Safety: see `relocate_from`, for both sides.
        unsafe { Link::swap(a, b) };
    }
}

impl<A: ?Sized, R> fmt::Debug for SlotBase<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBase")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SlotRef
// =============================================================================

/// The slot a [`Slot`] callable is running in.
///
/// Dereferences to the slot's [`SlotBase`], so a callable can disconnect
/// itself. [`as_ptr`](SlotRef::as_ptr) keeps the provenance the slot was
/// connected with, which is what owner recovery with
/// [`container_of!`](crate::container_of) needs.
pub struct SlotRef<'a, A: ?Sized, R = ()> {
    ptr: NonNull<SlotBase<A, R>>,
    _marker: PhantomData<&'a SlotBase<A, R>>,
}

impl<A: ?Sized, R> SlotRef<'_, A, R> {
    /// # Safety
    ///
    /// `ptr` points at a live slot base for the chosen lifetime.
    #[inline]
    unsafe fn new(ptr: NonNull<SlotBase<A, R>>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Returns the base pointer the slot was invoked through.
    ///
    /// During an emit this is the pointer [`Connectable::slot_ptr`] produced
    /// on connect, so it covers whatever that implementation covers.
    #[inline]
    pub fn as_ptr(self) -> NonNull<SlotBase<A, R>> {
        self.ptr
    }
}

impl<A: ?Sized, R> Clone for SlotRef<'_, A, R> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: ?Sized, R> Copy for SlotRef<'_, A, R> {}

impl<A: ?Sized, R> Deref for SlotRef<'_, A, R> {
    type Target = SlotBase<A, R>;

    #[inline]
    fn deref(&self) -> &SlotBase<A, R> {
        // Safety: live for `'a` by construction.
        unsafe { self.ptr.as_ref() }
    }
}

impl<A: ?Sized, R> fmt::Debug for SlotRef<'_, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

// =============================================================================
// Connectable
// =============================================================================

/// Anything a [`Signal`](crate::Signal) can link: a type embedding a
/// [`SlotBase`].
///
/// A bare [`SlotBase`] is not connectable; only the type embedding it is:
///
/// ```compile_fail,E0277
/// use core::pin::pin;
/// use core::ptr::NonNull;
/// use sigslot::{Signal, SlotBase};
///
/// unsafe fn noop(_: NonNull<SlotBase<()>>, _: &()) {}
///
/// let signal = pin!(Signal::<()>::new());
/// let bare = pin!(unsafe { SlotBase::<()>::new(noop) });
/// signal.as_ref().connect(bare.as_ref());
/// ```
///
/// # Safety
///
/// `slot_ptr` must return a pointer to a `SlotBase` embedded in `self`,
/// derived from the whole of `self` (not from a reference to the base
/// alone), whose call function accepts exactly that pointer.
pub unsafe trait Connectable<A: ?Sized, R = ()> {
    /// Returns the embedded slot base.
    fn slot_ptr(self: Pin<&Self>) -> NonNull<SlotBase<A, R>>;
}

// =============================================================================
// Slot
// =============================================================================

/// A slot storing its callable inline, in `N` bytes.
///
/// The callable receives a [`SlotRef`] to its own slot and the emitted
/// arguments. Construction checks at compile time that it fits in `N`
/// bytes, is suitably aligned, is `Copy` (so it never needs dropping) and is
/// `'static` (so a leaked slot never calls into a dead stack frame). There
/// is no runtime failure path.
///
/// Slots are connected while pinned. Moving a connected slot is impossible;
/// to hand over a connection, clone the slot into its new pinned home and
/// call [`relocate_from`](Slot::relocate_from).
///
/// # Example
///
/// ```
/// use core::cell::Cell;
/// use core::pin::pin;
/// use sigslot::{Signal, Slot, SlotRef};
///
/// let signal = pin!(Signal::<Cell<u32>>::new());
/// let signal = signal.into_ref();
///
/// let slot = pin!(Slot::new(|_: SlotRef<'_, Cell<u32>>, hits: &Cell<u32>| {
///     hits.set(hits.get() + 1);
/// }));
/// signal.connect(slot.as_ref());
///
/// let hits = Cell::new(0);
/// signal.emit(&hits);
/// signal.emit(&hits);
/// assert_eq!(hits.get(), 2);
/// ```
///
/// Oversized callables are rejected at compile time:
///
/// ```compile_fail
/// use sigslot::{Slot, SlotRef};
///
/// let big = [0u64; 16];
/// let slot: Slot<u64, (), 16> = Slot::from_fn(move |_: SlotRef<'_, u64>, x: &u64| {
///     let _v = big[*x as usize];
/// });
/// ```
///
/// So are callables with drop glue, and callables borrowing locals:
///
/// ```compile_fail
/// use sigslot::{Slot, SlotRef};
///
/// let name = String::from("not copy");
/// let slot: Slot<()> = Slot::new(move |_: SlotRef<'_, ()>, _: &()| {
///     let _len = name.len();
/// });
/// ```
///
/// ```compile_fail
/// use sigslot::{Slot, SlotRef};
///
/// let local = 5u32;
/// let local = &local;
/// let slot: Slot<(), u32> = Slot::new(move |_: SlotRef<'_, (), u32>, _: &()| *local);
/// ```
#[repr(C)]
pub struct Slot<A: ?Sized, R = (), const N: usize = DEFAULT_CAPACITY> {
    base: SlotBase<A, R>,
    callable: InlineStorage<N>,
}

impl<A: ?Sized, R> Slot<A, R> {
    /// Creates an unconnected slot with [`DEFAULT_CAPACITY`] inline bytes.
    #[inline]
    pub fn new<F, Ret>(f: F) -> Self
    where
        F: Fn(SlotRef<'_, A, R>, &A) -> Ret + Copy + 'static,
        Ret: Into<R>,
    {
        Self::from_fn(f)
    }
}

impl<A: ?Sized, R, const N: usize> Slot<A, R, N> {
    /// Creates an unconnected slot with `N` inline bytes.
    #[inline]
    pub fn from_fn<F, Ret>(f: F) -> Self
    where
        F: Fn(SlotRef<'_, A, R>, &A) -> Ret + Copy + 'static,
        Ret: Into<R>,
    {
        Self {
            // Safety: `trampoline` expects a base at offset 0 of a
            // `Slot<A, R, N>` whose storage holds an `F`, which is what this is.
            base: unsafe { SlotBase::new(trampoline::<A, R, N, F, Ret>) },
            callable: InlineStorage::from_value(f),
        }
    }

    /// Invokes the stored callable with `args`.
    #[inline]
    pub fn call(&self, args: &A) -> R {
        // Safety: the pointer covers the whole slot.
        unsafe { SlotBase::call_raw(NonNull::from(self).cast(), args) }
    }

    /// Takes over `source`'s connection, leaving `source` disconnected.
    ///
    /// Combined with [`Clone`], this is how a connected slot "moves".
    ///
    /// ```
    /// use core::cell::Cell;
    /// use core::pin::pin;
    /// use sigslot::{Signal, Slot, SlotRef};
    ///
    /// let signal = pin!(Signal::<Cell<u32>>::new());
    /// let signal = signal.into_ref();
    ///
    /// let old = pin!(Slot::new(|_: SlotRef<'_, Cell<u32>>, hits: &Cell<u32>| {
    ///     hits.set(hits.get() + 1);
    /// }));
    /// signal.connect(old.as_ref());
    ///
    /// let new = pin!(Slot::clone(&old));
    /// new.as_ref().relocate_from(&old);
    ///
    /// assert!(!old.is_connected());
    /// let hits = Cell::new(0);
    /// signal.emit(&hits);
    /// assert_eq!(hits.get(), 1);
    /// ```
    #[inline]
    pub fn relocate_from(self: Pin<&Self>, source: &Self) {
        SlotBase::relocate_from(self, &source.base);
    }

    /// Exchanges the connections (and call order positions) of two slots.
    #[inline]
    pub fn swap(self: Pin<&Self>, other: Pin<&Self>) {
        SlotBase::swap(self, other);
    }

    /// Inline capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

unsafe fn trampoline<A, R, const N: usize, F, Ret>(this: NonNull<SlotBase<A, R>>, args: &A) -> R
where
    A: ?Sized,
    F: Fn(SlotRef<'_, A, R>, &A) -> Ret + Copy,
    Ret: Into<R>,
{
    // Safety: `this` is the base at offset 0 of a `Slot<A, R, N>` holding an
    // `F`, with provenance over the whole slot. The callable runs on a copy,
    // so the slot's storage is not borrowed during the call.
    let f = unsafe { *this.cast::<Slot<A, R, N>>().as_ref().callable.get::<F>() };
    f(unsafe { SlotRef::new(this) }, args).into()
}

impl<A: ?Sized, R, const N: usize> Clone for Slot<A, R, N> {
    /// Returns an unconnected copy sharing the same callable.
    fn clone(&self) -> Self {
        Self {
            base: self.base.unconnected_copy(),
            callable: self.callable,
        }
    }
}

impl<A: ?Sized, R, const N: usize> Deref for Slot<A, R, N> {
    type Target = SlotBase<A, R>;

    #[inline]
    fn deref(&self) -> &SlotBase<A, R> {
        &self.base
    }
}

// Safety: `Slot` is `repr(C)` with the base first; the pointer is derived
// from the whole slot.
unsafe impl<A: ?Sized, R, const N: usize> Connectable<A, R> for Slot<A, R, N> {
    #[inline]
    fn slot_ptr(self: Pin<&Self>) -> NonNull<SlotBase<A, R>> {
        NonNull::from(self.get_ref()).cast()
    }
}

impl<A: ?Sized, R, const N: usize> fmt::Debug for Slot<A, R, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("connected", &self.is_connected())
            .field("capacity", &N)
            .finish()
    }
}

// =============================================================================
// FnSlot
// =============================================================================

/// A slot storing its callable `F` directly, sized exactly to it.
///
/// Unlike [`Slot`], `F` may own resources (it is dropped with the slot) and
/// may be any size. It takes only the emitted arguments. Usually obtained
/// boxed and connected from [`Signal::connect_fn`](crate::Signal::connect_fn).
#[repr(C)]
pub struct FnSlot<A: ?Sized, R, F> {
    base: SlotBase<A, R>,
    callable: F,
}

impl<A: ?Sized, R, F> FnSlot<A, R, F> {
    /// Creates an unconnected slot wrapping `f`.
    #[inline]
    pub fn new<Ret>(f: F) -> Self
    where
        F: Fn(&A) -> Ret + 'static,
        Ret: Into<R>,
    {
        Self {
            // Safety: `fn_trampoline` expects a base at offset 0 of a
            // `FnSlot<A, R, F>`.
            base: unsafe { SlotBase::new(fn_trampoline::<A, R, F, Ret>) },
            callable: f,
        }
    }

    /// Invokes the callable with `args`.
    #[inline]
    pub fn call(&self, args: &A) -> R {
        // Safety: the pointer covers the whole slot.
        unsafe { SlotBase::call_raw(NonNull::from(self).cast(), args) }
    }
}

unsafe fn fn_trampoline<A, R, F, Ret>(this: NonNull<SlotBase<A, R>>, args: &A) -> R
where
    A: ?Sized,
    F: Fn(&A) -> Ret,
    Ret: Into<R>,
{
    // Safety: `this` is the base at offset 0 of a `FnSlot<A, R, F>`.
    let slot = unsafe { this.cast::<FnSlot<A, R, F>>().as_ref() };
    (slot.callable)(args).into()
}

impl<A: ?Sized, R, F> Deref for FnSlot<A, R, F> {
    type Target = SlotBase<A, R>;

    #[inline]
    fn deref(&self) -> &SlotBase<A, R> {
        &self.base
    }
}

// Safety: `FnSlot` is `repr(C)` with the base first; the pointer is derived
// from the whole slot.
unsafe impl<A: ?Sized, R, F> Connectable<A, R> for FnSlot<A, R, F> {
    #[inline]
    fn slot_ptr(self: Pin<&Self>) -> NonNull<SlotBase<A, R>> {
        NonNull::from(self.get_ref()).cast()
    }
}

impl<A: ?Sized, R, F> fmt::Debug for FnSlot<A, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSlot")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
