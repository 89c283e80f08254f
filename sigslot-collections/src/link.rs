//! Self-referencing intrusive link.
//!
//! A [`Link`] is the unit of intrusive membership: two neighbour pointers
//! embedded directly in the owning object. Rings have no separate node
//! allocation; a ring is simply the set of links reachable from one anchor
//! (usually a list's sentinel).
//!
//! # Representation
//!
//! An unlinked link conceptually points at itself. A freshly constructed
//! link cannot know its own address, so the self-loop is stored as `None`
//! and read back as the link's own address by [`Link::prev`] and
//! [`Link::next`]. Storing a link's own address normalizes back to `None`,
//! which keeps `is_linked` an O(1) check without a separate flag.
//!
//! # Linking
//!
//! Neighbours reference each other by raw pointer, and the pointer a ring
//! stores is later turned back into the element that embeds the link. So
//! the operations that link something take `NonNull<Link>` and are
//! `unsafe`: the caller vouches that the link is pinned and that the pointer
//! was derived from the whole element (see
//! [`Linked::link_of`](crate::Linked::link_of)). Typed wrappers such as
//! [`IntrusiveList::push_back`](crate::IntrusiveList::push_back) do that
//! for you.
//!
//! Unlinking is safe: [`Link::remove`] only stitches existing neighbours
//! together. Dropping a link unlinks it, so a ring never holds a dangling
//! neighbour.
//!
//! # Example
//!
//! ```
//! use core::pin::pin;
//! use core::ptr::NonNull;
//! use sigslot_collections::Link;
//!
//! let head = pin!(Link::new());
//! let head = NonNull::from(head.into_ref().get_ref());
//! let a = pin!(Link::new());
//! let a = NonNull::from(a.into_ref().get_ref());
//!
//! // Safety: both are pinned bare links, not embedded in anything.
//! unsafe { Link::insert_before(a, head) };
//! let (a, head) = unsafe { (a.as_ref(), head.as_ref()) };
//! assert!(a.is_linked());
//!
//! a.remove();
//! assert!(!a.is_linked());
//! assert!(!head.is_linked());
//! ```

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomPinned;
use core::pin::pin;
use core::ptr::{self, NonNull};

/// Intrusive doubly-linked ring membership.
///
/// All state lives in [`Cell`]s: links are rewired through shared references
/// while other code holds references to the same ring. As a consequence a
/// `Link` is neither `Send` nor `Sync`.
pub struct Link {
    prev: Cell<Option<NonNull<Link>>>,
    next: Cell<Option<NonNull<Link>>>,
    _pin: PhantomPinned,
}

impl Link {
    /// Creates an unlinked link.
    #[inline]
    pub const fn new() -> Self {
        Self {
            prev: Cell::new(None),
            next: Cell::new(None),
            _pin: PhantomPinned,
        }
    }

    /// Returns `true` if this link is part of a ring.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.next.get().is_some()
    }

    /// Returns the previous link in the ring, or `self` when unlinked.
    #[inline]
    pub fn prev(&self) -> NonNull<Link> {
        self.prev.get().unwrap_or_else(|| self.as_ptr())
    }

    /// Returns the next link in the ring, or `self` when unlinked.
    #[inline]
    pub fn next(&self) -> NonNull<Link> {
        self.next.get().unwrap_or_else(|| self.as_ptr())
    }

    #[inline]
    fn as_ptr(&self) -> NonNull<Link> {
        NonNull::from(self)
    }

    #[inline]
    fn set_prev(&self, link: NonNull<Link>) {
        self.prev.set((link != self.as_ptr()).then_some(link));
    }

    #[inline]
    fn set_next(&self, link: NonNull<Link>) {
        self.next.set((link != self.as_ptr()).then_some(link));
    }

    /// Resets to the unlinked state without touching the neighbours.
    #[inline]
    pub(crate) fn reset(&self) {
        self.prev.set(None);
        self.next.set(None);
    }

    /// Splices `this` between `prev` and `next`.
    ///
    /// # Safety
    ///
    /// - `this` must be unlinked and pinned.
    /// - `prev` and `next` must be adjacent in one ring (`prev.next == next`),
    ///   or both be the same pinned link.
    #[inline]
    unsafe fn splice(this: NonNull<Link>, prev: NonNull<Link>, next: NonNull<Link>) {
        unsafe {
            let link = this.as_ref();
            link.set_prev(prev);
            link.set_next(next);
            prev.as_ref().set_next(this);
            next.as_ref().set_prev(this);
        }
    }

    /// Unlinks from the current ring, stitching the neighbours together.
    ///
    /// No-op when already unlinked, so calling it repeatedly is fine.
    #[inline]
    pub fn remove(&self) {
        if !self.is_linked() {
            return;
        }

        let prev = self.prev();
        let next = self.next();

        // Safety: neighbours of a linked link are live and pinned; each one
        // unlinks itself before it is dropped.
        unsafe {
            prev.as_ref().set_next(next);
            next.as_ref().set_prev(prev);
        }

        self.reset();
    }

    /// Moves `this` directly after `anchor`.
    ///
    /// If `this` is part of another ring it leaves that ring first. An
    /// unlinked `anchor` forms a new two-link ring with `this`.
    ///
    /// # Safety
    ///
    /// - Both links are live and pinned.
    /// - `this` carries provenance over the element that embeds it, and
    ///   `anchor`'s ring holds only links embedded in that element type
    ///   (plus at most a bare sentinel).
    #[inline]
    pub unsafe fn insert_after(this: NonNull<Link>, anchor: NonNull<Link>) {
        if this == anchor {
            return;
        }

        unsafe { this.as_ref() }.remove();
        let next = unsafe { anchor.as_ref() }.next.get().unwrap_or(anchor);

        // Safety: `this` is unlinked; `anchor` and `next` are adjacent.
        unsafe { Link::splice(this, anchor, next) };
    }

    /// Moves `this` directly before `anchor`.
    ///
    /// If `this` is part of another ring it leaves that ring first. An
    /// unlinked `anchor` forms a new two-link ring with `this`.
    ///
    /// # Safety
    ///
    /// Same contract as [`insert_after`](Link::insert_after).
    #[inline]
    pub unsafe fn insert_before(this: NonNull<Link>, anchor: NonNull<Link>) {
        if this == anchor {
            return;
        }

        unsafe { this.as_ref() }.remove();
        let prev = unsafe { anchor.as_ref() }.prev.get().unwrap_or(anchor);

        // Safety: see `insert_after`.
        unsafe { Link::splice(this, prev, anchor) };
    }

    /// Makes `this` take over `source`'s exact position in its ring.
    ///
    /// This is the explicit move operation for links: both of `source`'s
    /// neighbours are repointed at `this`, and `source` ends up unlinked.
    /// Any ring `this` was previously part of loses it first. Relocating
    /// from an unlinked source leaves `this` unlinked.
    ///
    /// A bare link cannot take over an element's place without `unsafe`:
    ///
    /// ```compile_fail,E0133
    /// use core::pin::pin;
    /// use core::ptr::NonNull;
    /// use sigslot_collections::Link;
    ///
    /// let member = pin!(Link::new());
    /// let stray = pin!(Link::new());
    /// Link::relocate_from(NonNull::from(stray.as_ref().get_ref()), &member);
    /// ```
    ///
    /// # Safety
    ///
    /// Same contract as [`insert_after`](Link::insert_after), with `source`'s
    /// ring in place of `anchor`'s.
    pub unsafe fn relocate_from(this: NonNull<Link>, source: &Link) {
        if ptr::eq(this.as_ptr(), source) {
            return;
        }

        unsafe { this.as_ref() }.remove();
        let (Some(prev), Some(next)) = (source.prev.get(), source.next.get()) else {
            return;
        };
        source.reset();

        // Safety: `this` is unlinked; `prev` and `next` were source's
        // neighbours and still point at each other through it.
        unsafe { Link::splice(this, prev, next) };
    }

    /// Exchanges the ring positions of `a` and `b` in O(1).
    ///
    /// Handles adjacent links, links in different rings, and either or both
    /// being unlinked. Swapping a link with itself is a no-op.
    ///
    /// # Safety
    ///
    /// Both links satisfy the `this` side of
    /// [`insert_after`](Link::insert_after) for each other's ring.
    pub unsafe fn swap(a: NonNull<Link>, b: NonNull<Link>) {
        if a == b {
            return;
        }

        let hole = pin!(Link::new());
        let hole = NonNull::from(hole.into_ref().get_ref());

        // `hole` only sits in a ring between these calls
        unsafe {
            Link::relocate_from(hole, a.as_ref());
            Link::relocate_from(a, b.as_ref());
            Link::relocate_from(b, hole.as_ref());
        }
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.remove();
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("linked", &self.is_linked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::pin::Pin;

    /// Addresses of every link after `anchor`, walking `next` pointers.
    fn ring(anchor: Pin<&Link>) -> Vec<NonNull<Link>> {
        let start = NonNull::from(anchor.get_ref());
        let mut out = Vec::new();
        let mut current = anchor.next();
        while current != start {
            out.push(current);
            current = unsafe { current.as_ref() }.next();
        }
        out
    }

    /// Same walk, following `prev` pointers.
    fn ring_rev(anchor: Pin<&Link>) -> Vec<NonNull<Link>> {
        let start = NonNull::from(anchor.get_ref());
        let mut out = Vec::new();
        let mut current = anchor.prev();
        while current != start {
            out.push(current);
            current = unsafe { current.as_ref() }.prev();
        }
        out
    }

    fn addr(link: Pin<&Link>) -> NonNull<Link> {
        NonNull::from(link.get_ref())
    }

    // The links below are bare and pinned, which is all the raw operations
    // ask for.

    fn insert_before(link: Pin<&Link>, anchor: Pin<&Link>) {
        unsafe { Link::insert_before(addr(link), addr(anchor)) }
    }

    fn insert_after(link: Pin<&Link>, anchor: Pin<&Link>) {
        unsafe { Link::insert_after(addr(link), addr(anchor)) }
    }

    fn relocate(link: Pin<&Link>, source: Pin<&Link>) {
        unsafe { Link::relocate_from(addr(link), source.get_ref()) }
    }

    fn swap(a: Pin<&Link>, b: Pin<&Link>) {
        unsafe { Link::swap(addr(a), addr(b)) }
    }

    // ========================================================================
    // Basics
    // ========================================================================

    #[test]
    fn new_link_is_unlinked() {
        let link = pin!(Link::new());
        let link = link.into_ref();

        assert!(!link.is_linked());
        assert_eq!(link.prev(), addr(link));
        assert_eq!(link.next(), addr(link));
    }

    #[test]
    fn insert_before_builds_ring_in_order() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let c = pin!(Link::new());
        let c = c.into_ref();

        insert_before(a, head);
        insert_before(b, head);
        insert_before(c, head);

        assert!(head.is_linked());
        assert_eq!(ring(head), vec![addr(a), addr(b), addr(c)]);
        assert_eq!(ring_rev(head), vec![addr(c), addr(b), addr(a)]);
    }

    #[test]
    fn insert_after_places_directly_behind_anchor() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();

        insert_after(a, head);
        insert_after(b, head);

        assert_eq!(ring(head), vec![addr(b), addr(a)]);
    }

    #[test]
    fn insert_moves_between_rings() {
        let head_a = pin!(Link::new());
        let head_a = head_a.into_ref();
        let head_b = pin!(Link::new());
        let head_b = head_b.into_ref();
        let x = pin!(Link::new());
        let x = x.into_ref();

        insert_before(x, head_a);
        insert_before(x, head_b);

        assert!(!head_a.is_linked());
        assert_eq!(ring(head_b), vec![addr(x)]);
    }

    #[test]
    fn insert_relative_to_self_is_noop() {
        let a = pin!(Link::new());
        let a = a.into_ref();

        insert_after(a, a);
        insert_before(a, a);

        assert!(!a.is_linked());
    }

    // ========================================================================
    // Removal
    // ========================================================================

    #[test]
    fn remove_middle_stitches_neighbours() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let c = pin!(Link::new());
        let c = c.into_ref();

        insert_before(a, head);
        insert_before(b, head);
        insert_before(c, head);

        b.remove();

        assert!(!b.is_linked());
        assert_eq!(ring(head), vec![addr(a), addr(c)]);
        assert_eq!(ring_rev(head), vec![addr(c), addr(a)]);
    }

    #[test]
    fn remove_is_idempotent() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();

        a.remove();
        insert_before(a, head);
        a.remove();
        a.remove();

        assert!(!a.is_linked());
        assert!(!head.is_linked());
    }

    #[test]
    fn removing_last_member_unlinks_anchor() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();

        insert_before(a, head);
        assert!(head.is_linked());

        a.remove();
        assert!(!head.is_linked());
        assert_eq!(head.next(), addr(head));
        assert_eq!(head.prev(), addr(head));
    }

    #[test]
    fn drop_unlinks() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();

        insert_before(a, head);
        {
            let b = pin!(Link::new());
            let b = b.into_ref();
            insert_before(b, head);
            assert_eq!(ring(head).len(), 2);
        }

        assert_eq!(ring(head), vec![addr(a)]);
    }

    // ========================================================================
    // Relocation
    // ========================================================================

    #[test]
    fn relocate_takes_exact_position() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let c = pin!(Link::new());
        let c = c.into_ref();
        let moved = pin!(Link::new());
        let moved = moved.into_ref();

        insert_before(a, head);
        insert_before(b, head);
        insert_before(c, head);

        relocate(moved, b);

        assert!(!b.is_linked());
        assert_eq!(ring(head), vec![addr(a), addr(moved), addr(c)]);
        assert_eq!(ring_rev(head), vec![addr(c), addr(moved), addr(a)]);
    }

    #[test]
    fn relocate_from_unlinked_leaves_destination_unlinked() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let dst = pin!(Link::new());
        let dst = dst.into_ref();
        let src = pin!(Link::new());
        let src = src.into_ref();

        insert_before(dst, head);
        relocate(dst, src);

        assert!(!dst.is_linked());
        assert!(!head.is_linked());
    }

    #[test]
    fn relocate_sole_member() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let moved = pin!(Link::new());
        let moved = moved.into_ref();

        insert_before(a, head);
        relocate(moved, a);

        assert_eq!(ring(head), vec![addr(moved)]);
        assert_eq!(head.next(), addr(moved));
        assert_eq!(head.prev(), addr(moved));
    }

    #[test]
    fn relocate_from_self_is_noop() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();

        insert_before(a, head);
        relocate(a, a);

        assert_eq!(ring(head), vec![addr(a)]);
    }

    // ========================================================================
    // Swap
    // ========================================================================

    #[test]
    fn swap_non_adjacent() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let c = pin!(Link::new());
        let c = c.into_ref();

        insert_before(a, head);
        insert_before(b, head);
        insert_before(c, head);

        swap(a, c);

        assert_eq!(ring(head), vec![addr(c), addr(b), addr(a)]);
        assert_eq!(ring_rev(head), vec![addr(a), addr(b), addr(c)]);
    }

    #[test]
    fn swap_adjacent_both_directions() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let c = pin!(Link::new());
        let c = c.into_ref();

        insert_before(a, head);
        insert_before(b, head);
        insert_before(c, head);

        swap(a, b);
        assert_eq!(ring(head), vec![addr(b), addr(a), addr(c)]);

        swap(c, a);
        assert_eq!(ring(head), vec![addr(b), addr(c), addr(a)]);
        assert_eq!(ring_rev(head), vec![addr(a), addr(c), addr(b)]);
    }

    #[test]
    fn swap_with_unlinked() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let loose = pin!(Link::new());
        let loose = loose.into_ref();

        insert_before(a, head);
        insert_before(b, head);

        swap(a, loose);
        assert!(!a.is_linked());
        assert_eq!(ring(head), vec![addr(loose), addr(b)]);

        // and back again, unlinked side first
        swap(a, loose);
        assert!(!loose.is_linked());
        assert_eq!(ring(head), vec![addr(a), addr(b)]);
    }

    #[test]
    fn swap_both_unlinked() {
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();

        swap(a, b);

        assert!(!a.is_linked());
        assert!(!b.is_linked());
    }

    #[test]
    fn swap_across_rings() {
        let head_1 = pin!(Link::new());
        let head_1 = head_1.into_ref();
        let head_2 = pin!(Link::new());
        let head_2 = head_2.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();
        let b = pin!(Link::new());
        let b = b.into_ref();
        let x = pin!(Link::new());
        let x = x.into_ref();

        insert_before(a, head_1);
        insert_before(b, head_1);
        insert_before(x, head_2);

        swap(b, x);

        assert_eq!(ring(head_1), vec![addr(a), addr(x)]);
        assert_eq!(ring(head_2), vec![addr(b)]);
    }

    #[test]
    fn swap_with_self_is_noop() {
        let head = pin!(Link::new());
        let head = head.into_ref();
        let a = pin!(Link::new());
        let a = a.into_ref();

        insert_before(a, head);
        swap(a, a);

        assert_eq!(ring(head), vec![addr(a)]);
    }
}
