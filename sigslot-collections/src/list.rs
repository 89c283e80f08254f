//! Intrusive doubly-linked list over embedded [`Link`]s.
//!
//! The list is a sentinel [`Link`] and nothing else. Elements embed their own
//! `Link` at a fixed byte offset, registered through the [`Linked`] trait, so
//! pushing never allocates and the list never owns or destroys an element.
//!
//! Elements leave the list by unlinking themselves: [`Link::remove`], or
//! simply dropping the element.

use crate::Link;

use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::pin::Pin;
use core::ptr::NonNull;

/// Types that embed a [`Link`] at a fixed byte offset.
///
/// Usually implemented with [`impl_linked!`](crate::impl_linked), which
/// computes the offset with [`core::mem::offset_of!`].
///
/// # Safety
///
/// - A [`Link`] must live at exactly `LINK_OFFSET` bytes from the start of
///   every `Self`.
/// - `Self` must not implement `Unpin`. A linked element is referenced by
///   address from its neighbours, so it must never move while linked.
///
/// # Example
///
/// ```
/// use sigslot_collections::{Link, Linked, impl_linked};
///
/// struct Order {
///     id: u64,
///     link: Link,
/// }
///
/// impl_linked!(Order, link);
///
/// let order = Order { id: 7, link: Link::new() };
/// assert!(!order.link().is_linked());
/// ```
pub unsafe trait Linked: Sized {
    /// Byte offset of the embedded [`Link`] within `Self`.
    const LINK_OFFSET: usize;

    /// Returns the embedded link.
    #[inline]
    fn link(&self) -> &Link {
        // Safety: the pointer is derived from a live `&Self`.
        unsafe { Self::link_of(NonNull::from(self)).as_ref() }
    }

    /// Returns a pointer to the link embedded in `*this`.
    ///
    /// The result keeps whatever provenance `this` carries, so a pointer
    /// derived from the whole element can later be turned back into it with
    /// [`Linked::from_link`]. Only address arithmetic happens here.
    #[inline]
    fn link_of(this: NonNull<Self>) -> NonNull<Link> {
        let link = this.as_ptr().wrapping_byte_add(Self::LINK_OFFSET).cast::<Link>();
        // Safety: an in-bounds offset from a non-null pointer is non-null.
        unsafe { NonNull::new_unchecked(link) }
    }

    /// Recovers the element that embeds `link`.
    ///
    /// # Safety
    ///
    /// `link` must point at the embedded link of a live `Self`, and carry
    /// provenance over that whole element (as produced by
    /// [`Linked::link_of`]).
    #[inline]
    unsafe fn from_link(link: NonNull<Link>) -> NonNull<Self> {
        unsafe { link.byte_sub(Self::LINK_OFFSET).cast() }
    }
}

/// Implements [`Linked`] for a non-generic type with a [`Link`] field.
///
/// The field type is checked at compile time:
///
/// ```compile_fail
/// use sigslot_collections::impl_linked;
///
/// struct NotALink {
///     link: u64,
/// }
///
/// impl_linked!(NotALink, link);
/// ```
#[macro_export]
macro_rules! impl_linked {
    ($ty:ty, $field:ident) => {
        const _: () = {
            fn _link_field_is_link(v: &$ty) -> &$crate::Link {
                &v.$field
            }
        };

        unsafe impl $crate::Linked for $ty {
            const LINK_OFFSET: usize = ::core::mem::offset_of!($ty, $field);
        }
    };
}

/// Computes the owner of an embedded member from a pointer to that member.
///
/// Evaluates to `*const $owner`. The arithmetic itself is safe; dereferencing
/// the result is only valid if `$ptr` really points at `$field` of a live
/// `$owner`. The pointee type of `$ptr` is checked against the field type.
///
/// # Example
///
/// ```
/// use sigslot_collections::{Link, container_of};
///
/// struct Window {
///     id: u32,
///     link: Link,
/// }
///
/// let window = Window { id: 3, link: Link::new() };
/// let owner = container_of!(&window.link, Window, link);
///
/// assert!(core::ptr::eq(owner, &window));
/// assert_eq!(unsafe { (*owner).id }, 3);
/// ```
#[macro_export]
macro_rules! container_of {
    ($ptr:expr, $owner:ty, $field:ident) => {{
        let member: *const _ = $ptr;
        let _ = |owner: &$owner| ::core::ptr::eq(member, &owner.$field);
        member
            .cast::<u8>()
            .wrapping_sub(::core::mem::offset_of!($owner, $field))
            .cast::<$owner>()
    }};
}

// =============================================================================
// IntrusiveList
// =============================================================================

/// A ring of `T`s threaded through their embedded [`Link`]s.
///
/// The list must be pinned to accept elements; an unpinned list is always
/// empty. Dropping the list resets every member to unlinked.
///
/// # Example
///
/// ```
/// use core::pin::pin;
/// use sigslot_collections::{IntrusiveList, Link, impl_linked};
///
/// struct Node {
///     value: u32,
///     link: Link,
/// }
///
/// impl_linked!(Node, link);
///
/// let list = pin!(IntrusiveList::<Node>::new());
/// let list = list.into_ref();
///
/// let a = pin!(Node { value: 1, link: Link::new() });
/// let b = pin!(Node { value: 2, link: Link::new() });
/// list.push_back(a.as_ref());
/// list.push_back(b.as_ref());
///
/// // Safety: no node is dropped while the iterator is alive.
/// let values: Vec<u32> = unsafe { list.iter() }.map(|n| n.value).collect();
/// assert_eq!(values, [1, 2]);
/// ```
pub struct IntrusiveList<T: Linked> {
    sentinel: Link,
    _marker: PhantomData<*const T>,
}

impl<T: Linked> IntrusiveList<T> {
    /// Creates an empty list.
    #[inline]
    pub const fn new() -> Self {
        Self {
            sentinel: Link::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the pinned sentinel.
    ///
    /// The sentinel marks both ends of the ring: `sentinel.next()` is the
    /// front element, `sentinel.prev()` the back one.
    #[inline]
    pub fn sentinel(self: Pin<&Self>) -> Pin<&Link> {
        // Safety: structural pin projection; the sentinel is never moved out.
        unsafe { self.map_unchecked(|list| &list.sentinel) }
    }

    /// Returns `true` if the list has no elements. O(1).
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.sentinel.is_linked()
    }

    /// Counts the elements. O(n).
    pub fn len(&self) -> usize {
        let head = NonNull::from(&self.sentinel);
        let mut current = self.sentinel.next();
        let mut len = 0;
        while current != head {
            len += 1;
            // Safety: every link in the ring is live.
            current = unsafe { current.as_ref() }.next();
        }
        len
    }

    /// Appends `element`, taking it out of any ring it was part of.
    #[inline]
    pub fn push_back(self: Pin<&Self>, element: Pin<&T>) {
        // Safety: `element` is pinned and its link offset comes from `Linked`.
        unsafe { self.push_back_raw(NonNull::from(element.get_ref())) };
    }

    /// Prepends `element`, taking it out of any ring it was part of.
    #[inline]
    pub fn push_front(self: Pin<&Self>, element: Pin<&T>) {
        // Safety: see `push_back`.
        unsafe { self.push_front_raw(NonNull::from(element.get_ref())) };
    }

    /// Appends the element behind `element`.
    ///
    /// Use this when the element is part of a larger object and the pointer
    /// the list stores must cover that object.
    ///
    /// # Safety
    ///
    /// `element` must point at a live `T` that stays at its address until it
    /// is dropped, and must carry provenance over the whole `T`.
    #[inline]
    pub unsafe fn push_back_raw(self: Pin<&Self>, element: NonNull<T>) {
        let head = NonNull::from(self.sentinel().get_ref());
        // Safety: the caller pins `element` and hands over its whole-element
        // provenance; this ring only ever holds `T`s.
        unsafe { Link::insert_before(T::link_of(element), head) };
    }

    /// Prepends the element behind `element`.
    ///
    /// # Safety
    ///
    /// Same contract as [`push_back_raw`](Self::push_back_raw).
    #[inline]
    pub unsafe fn push_front_raw(self: Pin<&Self>, element: NonNull<T>) {
        let head = NonNull::from(self.sentinel().get_ref());
        // Safety: see `push_back_raw`.
        unsafe { Link::insert_after(T::link_of(element), head) };
    }

    /// Returns the first element.
    ///
    /// # Safety
    ///
    /// The element must not be dropped while the returned reference is alive.
    #[inline]
    pub unsafe fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        // Safety: a linked neighbour of the sentinel is an element link.
        Some(unsafe { T::from_link(self.sentinel.next()).as_ref() })
    }

    /// Returns the last element.
    ///
    /// # Safety
    ///
    /// The element must not be dropped while the returned reference is alive.
    #[inline]
    pub unsafe fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        // Safety: see `front`.
        Some(unsafe { T::from_link(self.sentinel.prev()).as_ref() })
    }

    /// Unlinks every element. O(n).
    ///
    /// Each visited link is reset to unlinked without repairing its
    /// neighbours, which are about to be reset as well.
    pub fn clear(&self) {
        let head = NonNull::from(&self.sentinel);
        let mut current = self.sentinel.next();
        while current != head {
            // Safety: every link in the ring is live.
            let link = unsafe { current.as_ref() };
            current = link.next();
            link.reset();
        }
        self.sentinel.reset();
    }

    /// Iterates front to back (or back to front via `.rev()`).
    ///
    /// # Safety
    ///
    /// No element may be dropped, unlinked, or linked into this list while
    /// the iterator or any reference it produced is alive.
    #[inline]
    pub unsafe fn iter(&self) -> Iter<'_, T> {
        Iter {
            front: self.sentinel.next(),
            back: self.sentinel.prev(),
            done: self.is_empty(),
            _marker: PhantomData,
        }
    }
}

impl<T: Linked> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Linked> Drop for IntrusiveList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Linked> fmt::Debug for IntrusiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrusiveList")
            .field("len", &self.len())
            .finish()
    }
}

// =============================================================================
// Iterator
// =============================================================================

/// Bidirectional iterator over an [`IntrusiveList`].
pub struct Iter<'a, T: Linked> {
    front: NonNull<Link>,
    back: NonNull<Link>,
    done: bool,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.front;
        if current == self.back {
            self.done = true;
        } else {
            // Safety: the ring is frozen for the iterator's lifetime.
            self.front = unsafe { current.as_ref() }.next();
        }

        // Safety: `current` lies strictly between the sentinel ends.
        Some(unsafe { T::from_link(current).as_ref() })
    }
}

impl<T: Linked> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.back;
        if current == self.front {
            self.done = true;
        } else {
            // Safety: the ring is frozen for the iterator's lifetime.
            self.back = unsafe { current.as_ref() }.prev();
        }

        // Safety: see `next`.
        Some(unsafe { T::from_link(current).as_ref() })
    }
}

impl<T: Linked> FusedIterator for Iter<'_, T> {}
