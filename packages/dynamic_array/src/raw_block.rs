use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::{Error, Result};

/// An owned block of uninitialized memory with room for a fixed number of `T`.
///
/// This is the backing storage of a [`DynamicArray`][crate::DynamicArray]. The block knows how
/// much memory it owns but nothing about which of its slots hold live objects - that is for the
/// owner to track. Consequently, dropping a block releases the memory without running any
/// destructors. Whoever placed objects into the block must drop them first.
///
/// A block is never resized. Growing a collection means allocating a larger block, relocating
/// the live objects into it and [swapping][Self::swap] it in place of the old one.
///
/// # Zero capacity
///
/// A block with zero capacity does not own any memory and creating one never calls the allocator.
///
/// # Zero-sized types
///
/// If `T` is zero-sized, the block never calls the allocator but still reports the capacity it
/// was created with, so the owner can keep the same bookkeeping for all types.
///
/// # Out of band access
///
/// The block hands out raw pointers to its slots and never creates references to them, so the
/// owner is free to decide how to alias the contents.
pub struct RawBlock<T> {
    first_slot_ptr: NonNull<T>,

    capacity: usize,

    _items: PhantomData<T>,
}

impl<T> RawBlock<T> {
    /// Creates an empty block that does not own any memory.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::RawBlock;
    ///
    /// let block = RawBlock::<String>::new();
    /// assert_eq!(block.capacity(), 0);
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first_slot_ptr: NonNull::dangling(),
            capacity: 0,
            _items: PhantomData,
        }
    }

    /// Allocates a block with room for exactly `capacity` items, none of which are initialized.
    ///
    /// A `capacity` of zero does not call the allocator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if `capacity` items of `T` cannot be described as a
    /// single memory layout and [`Error::AllocationFailed`] if the allocator is out of memory.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::RawBlock;
    ///
    /// let block = RawBlock::<u64>::allocate(16)?;
    /// assert_eq!(block.capacity(), 16);
    /// # Ok::<(), dynamic_array::Error>(())
    /// ```
    pub fn allocate(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Ok(Self::new());
        }

        let layout = Layout::array::<T>(capacity)
            .ok()
            .ok_or(Error::CapacityOverflow {
                requested: capacity,
                item_type: type_name::<T>(),
            })?;

        if layout.size() == 0 {
            return Ok(Self {
                first_slot_ptr: NonNull::dangling(),
                capacity,
                _items: PhantomData,
            });
        }

        // SAFETY: The layout is valid for an array of T (we just calculated it) and is not
        // zero-sized (guarded above).
        let ptr = unsafe { alloc(layout) };

        let first_slot_ptr = NonNull::new(ptr.cast::<T>()).ok_or(Error::AllocationFailed {
            layout,
            capacity,
            item_type: type_name::<T>(),
        })?;

        Ok(Self {
            first_slot_ptr,
            capacity,
            _items: PhantomData,
        })
    }

    /// The number of items the block has room for.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a pointer to the slot at `index`.
    ///
    /// The slot may or may not contain a live object - the block does not know.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the capacity of the block.
    #[must_use]
    #[inline]
    pub fn slot(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.capacity,
            "slot {index} out of bounds in block of {} items of {}",
            self.capacity,
            type_name::<T>()
        );

        // SAFETY: Guarded by bounds check above, so the result is inside the allocation.
        unsafe { self.first_slot_ptr.add(index) }
    }

    /// Returns a pointer `count` slots past the start of the block.
    ///
    /// Unlike [`slot()`][Self::slot], this accepts `count == capacity`, producing the
    /// one-past-the-end pointer. That pointer must not be read from or written to but is valid
    /// as the end of a range, or as the destination of a zero-length copy.
    ///
    /// # Panics
    ///
    /// Panics if `count` is greater than the capacity of the block.
    #[must_use]
    #[inline]
    pub fn offset(&self, count: usize) -> NonNull<T> {
        assert!(
            count <= self.capacity,
            "offset {count} out of bounds in block of {} items of {}",
            self.capacity,
            type_name::<T>()
        );

        // SAFETY: Guarded by bounds check above. One past the end of an allocation is a valid
        // pointer offset, as is any offset from a dangling pointer of an empty block.
        unsafe { self.first_slot_ptr.add(count) }
    }

    /// Returns a pointer to the first slot. Dangling but well-aligned if the block is empty.
    #[must_use]
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.first_slot_ptr.as_ptr()
    }

    /// Returns a mutable pointer to the first slot. Dangling but well-aligned if the block
    /// is empty.
    #[must_use]
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.first_slot_ptr.as_ptr()
    }

    /// Exchanges the memory owned by two blocks. No objects are moved.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::RawBlock;
    ///
    /// let mut a = RawBlock::<u8>::allocate(4)?;
    /// let mut b = RawBlock::<u8>::new();
    ///
    /// a.swap(&mut b);
    ///
    /// assert_eq!(a.capacity(), 0);
    /// assert_eq!(b.capacity(), 4);
    /// # Ok::<(), dynamic_array::Error>(())
    /// ```
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.first_slot_ptr, &mut other.first_slot_ptr);
        mem::swap(&mut self.capacity, &mut other.capacity);
    }

    /// Moves the memory out of this block into a new one, leaving this block empty.
    #[must_use]
    #[inline]
    pub fn take(&mut self) -> Self {
        let mut taken = Self::new();
        taken.swap(self);
        taken
    }

    fn layout(&self) -> Layout {
        Layout::array::<T>(self.capacity)
            .expect("layout was calculable when the block was allocated, so it still is")
    }
}

impl<T> Default for RawBlock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RawBlock<T> {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }

        let layout = self.layout();

        if layout.size() == 0 {
            return;
        }

        // SAFETY: The layout must match between alloc and dealloc. It does, as neither the
        // item type nor the capacity can change after allocation.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast(), layout);
        }
    }
}

impl<T> fmt::Debug for RawBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBlock")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("first_slot_ptr", &self.first_slot_ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}

// SAFETY: Yes, there are raw pointers involved here but the block owns its memory exclusively,
// so as long as T itself can move between threads, the block can do so, too.
unsafe impl<T: Send> Send for RawBlock<T> {}

// SAFETY: The block exposes no interior mutability of its own. Any access to the contents
// goes through raw pointers whose use is governed by the owner.
unsafe impl<T: Sync> Sync for RawBlock<T> {}
