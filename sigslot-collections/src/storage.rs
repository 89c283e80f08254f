//! Fixed-size, type-erased inline storage.
//!
//! [`InlineStorage<N>`] is `N` raw bytes aligned to [`MAX_ALIGN`] that hold at
//! most one value at a time. There is no type tag and no destructor: only
//! [`Pod`] values may be written, and readers must ask for the type that was
//! last written.
//!
//! Size, alignment and drop-glue checks are post-monomorphization `const`
//! assertions, so a value that does not fit is a compile error, never a
//! runtime failure.
//!
//! ```compile_fail
//! use sigslot_collections::InlineStorage;
//!
//! let mut storage = InlineStorage::<8>::new();
//! storage.emplace([0u64; 2]); // 16 bytes into 8
//! ```
//!
//! ```compile_fail
//! use sigslot_collections::InlineStorage;
//!
//! #[derive(Clone, Copy)]
//! #[repr(align(32))]
//! struct Wide(u8);
//!
//! let mut storage = InlineStorage::<64>::new();
//! storage.emplace(Wide(0)); // over-aligned
//! ```
//!
//! ```compile_fail
//! use sigslot_collections::InlineStorage;
//!
//! let mut storage = InlineStorage::<64>::new();
//! storage.emplace(String::new()); // not Pod
//! ```

use core::fmt;
use core::mem::{MaybeUninit, align_of, size_of};

/// Largest alignment a value stored inline may require.
pub const MAX_ALIGN: usize = 16;

/// Marker trait for types safe to store without ever running a destructor.
///
/// # Safety
///
/// The type must have no drop glue. Any `Copy` type qualifies through the
/// blanket impl; the `_ASSERT_NO_DROP` constant rejects the rest at compile
/// time.
pub unsafe trait Pod: Sized {
    #[doc(hidden)]
    const _ASSERT_NO_DROP: () = {
        assert!(
            !core::mem::needs_drop::<Self>(),
            "Pod types must not require drop"
        );
    };
}

// Any Copy type is Pod
unsafe impl<T: Copy> Pod for T {}

#[derive(Clone, Copy)]
#[repr(align(16))]
struct MaxAlign;

const _: () = assert!(align_of::<MaxAlign>() == MAX_ALIGN);

/// `N` bytes of storage for one [`Pod`] value, aligned to [`MAX_ALIGN`].
///
/// Copying the storage copies the bytes, and with them the stored value.
///
/// # Example
///
/// ```
/// use sigslot_collections::InlineStorage;
///
/// let mut storage = InlineStorage::<16>::new();
/// *storage.emplace(1u32) += 41;
///
/// // Safety: the last value written was a u32.
/// assert_eq!(unsafe { *storage.get::<u32>() }, 42);
/// ```
#[derive(Clone, Copy)]
#[repr(C)]
pub struct InlineStorage<const N: usize> {
    _align: [MaxAlign; 0],
    bytes: [MaybeUninit<u8>; N],
}

impl<const N: usize> InlineStorage<N> {
    /// Creates empty (uninitialized) storage.
    #[inline]
    pub const fn new() -> Self {
        Self {
            _align: [],
            bytes: [MaybeUninit::uninit(); N],
        }
    }

    /// Creates storage holding `value`.
    #[inline]
    pub fn from_value<T: Pod>(value: T) -> Self {
        let mut storage = Self::new();
        storage.emplace(value);
        storage
    }

    /// Capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Writes `value` over the buffer and returns a reference to it.
    ///
    /// Whatever was stored before is overwritten without being dropped,
    /// which is fine because only [`Pod`] values are ever stored.
    #[inline]
    pub fn emplace<T: Pod>(&mut self, value: T) -> &mut T {
        let () = T::_ASSERT_NO_DROP;
        const {
            assert!(size_of::<T>() <= N, "value does not fit in inline storage");
            assert!(
                align_of::<T>() <= MAX_ALIGN,
                "value is over-aligned for inline storage"
            );
        }

        let ptr = self.bytes.as_mut_ptr().cast::<T>();
        // Safety: the buffer is large and aligned enough for T (checked above).
        unsafe {
            ptr.write(value);
            &mut *ptr
        }
    }

    /// Returns the stored value.
    ///
    /// # Safety
    ///
    /// The last value written must have been a `T`.
    #[inline]
    pub unsafe fn get<T>(&self) -> &T {
        unsafe { &*self.bytes.as_ptr().cast::<T>() }
    }

    /// Returns the stored value mutably.
    ///
    /// # Safety
    ///
    /// The last value written must have been a `T`.
    #[inline]
    pub unsafe fn get_mut<T>(&mut self) -> &mut T {
        unsafe { &mut *self.bytes.as_mut_ptr().cast::<T>() }
    }
}

impl<const N: usize> Default for InlineStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for InlineStorage<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineStorage")
            .field("capacity", &N)
            .finish_non_exhaustive()
    }
}
