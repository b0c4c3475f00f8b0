use std::iter::FusedIterator;
use std::{fmt, ptr, slice};

use crate::RawBlock;

/// An iterator that moves items out of a [`DynamicArray`][crate::DynamicArray].
///
/// Created by the [`IntoIterator`] implementation of the array. The iterator takes over the
/// storage of the array, so no items are moved until they are yielded. Items that are never
/// yielded are dropped together with the iterator.
///
/// # Example
///
/// ```rust
/// use dynamic_array::DynamicArray;
///
/// let array = DynamicArray::from([1, 2, 3, 4]);
/// let mut iter = array.into_iter();
///
/// assert_eq!(iter.next(), Some(1));
/// assert_eq!(iter.next_back(), Some(4));
/// assert_eq!(iter.as_slice(), [2, 3]);
/// ```
pub struct IntoIter<T> {
    block: RawBlock<T>,

    /// Index of the next item to yield from the front. Slots before this have been moved out.
    front: usize,

    /// One past the index of the next item to yield from the back. Slots from this onwards
    /// have been moved out (or were never initialized).
    back: usize,
}

impl<T> IntoIter<T> {
    /// The first `len` slots of `block` must hold live items, which become owned by the iterator.
    pub(crate) fn new(block: RawBlock<T>, len: usize) -> Self {
        assert!(
            len <= block.capacity(),
            "cannot iterate over {len} items in block of {}",
            block.capacity()
        );

        Self {
            block,
            front: 0,
            back: len,
        }
    }

    /// Returns the items that have not been yielded yet as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // Cannot underflow, front never passes back.
        let remaining = self.back.wrapping_sub(self.front);

        // SAFETY: Slots `[front, back)` hold live items owned by the iterator.
        unsafe { slice::from_raw_parts(self.block.offset(self.front).as_ptr(), remaining) }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        let slot = self.block.slot(self.front);

        // Cannot overflow, front is below back.
        self.front = self.front.wrapping_add(1);

        // SAFETY: The slot was live and we just excluded it from the live range, transferring
        // ownership of the item to the caller.
        Some(unsafe { slot.read() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back.wrapping_sub(self.front);
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        // Cannot underflow, back is above front.
        self.back = self.back.wrapping_sub(1);

        // SAFETY: The slot was live and we just excluded it from the live range, transferring
        // ownership of the item to the caller.
        Some(unsafe { self.block.slot(self.back).read() })
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let remaining = self.back.wrapping_sub(self.front);
        let first_remaining = self.block.offset(self.front);

        // Mark everything as moved out first so a panicking destructor cannot cause a double drop.
        self.front = self.back;

        // SAFETY: Slots `[front, back)` held live items owned by the iterator and have been
        // excluded from the live range above. The block releases the memory afterwards.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                first_remaining.as_ptr(),
                remaining,
            ));
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}
