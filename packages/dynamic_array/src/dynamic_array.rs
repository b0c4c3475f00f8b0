use std::any::type_name;
use std::hash::{Hash, Hasher};
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::{fmt, ptr, slice, thread};

use tracing::trace;

use crate::{DropPolicy, DynamicArrayBuilder, Error, IntoIter, RawBlock, Result};

/// A growable array that manages its own storage and the lifetime of every item in it.
///
/// The array is split into two layers:
///
/// * A [`RawBlock`] that owns a region of uninitialized memory with a fixed capacity.
/// * A count of live items. Slots `[0, len)` of the block always hold live items and slots
///   `[len, capacity)` are always uninitialized.
///
/// Every operation that adds items writes them into uninitialized slots and every operation
/// that removes items drops them in place, so the split between the two ranges is never
/// violated, even if an item constructor, `Clone` implementation or destructor panics.
///
/// # Growth
///
/// When an insert finds the array full, a new block of `max(1, 2 * capacity)` items is
/// allocated, the existing items are relocated into it and the old block is released. Moving
/// an item in Rust is a bitwise copy that cannot fail, so relocation never runs any user code
/// and cannot leave the array half-transferred.
///
/// Operations that duplicate items via [`Clone`] (copying the whole array, [`clone_from()`][1]
/// into an array that is too small, [`extend_from_slice()`][2], [`insert_from_within()`][3])
/// clone into uninitialized memory first and only publish the clones once all of them exist.
/// If a clone panics, the clones made so far are dropped and the array is left as it was.
///
/// # Access
///
/// The array dereferences to a slice, so indexing, iteration and all read-only slice methods
/// work as usual. Indexing out of bounds panics; [`get()`][slice::get] returns `None` instead.
///
/// # Thread safety
///
/// The array is [`Send`] and [`Sync`] if `T` is. It has no internal synchronization, so
/// concurrent mutation requires an external lock such as a `Mutex<DynamicArray<T>>`.
///
/// # Example
///
/// ```rust
/// use dynamic_array::DynamicArray;
///
/// let mut array = DynamicArray::new();
///
/// array.push_back(1);
/// array.push_back(2);
/// array.push_back(3);
///
/// assert_eq!(array, [1, 2, 3]);
/// assert_eq!(array.capacity(), 4);
///
/// array.emplace(1, || 99);
/// assert_eq!(array, [1, 99, 2, 3]);
///
/// array.erase(0);
/// assert_eq!(array, [99, 2, 3]);
/// ```
///
/// [1]: Clone::clone_from
/// [2]: Self::extend_from_slice
/// [3]: Self::insert_from_within
pub struct DynamicArray<T> {
    /// Storage for the items. Slots below `len` are live.
    block: RawBlock<T>,

    len: usize,

    drop_policy: DropPolicy,
}

impl<T> DynamicArray<T> {
    #[must_use]
    pub(crate) fn new_inner(block: RawBlock<T>, drop_policy: DropPolicy) -> Self {
        Self {
            block,
            len: 0,
            drop_policy,
        }
    }

    /// Creates a new empty [`DynamicArray`] with the default configuration.
    ///
    /// The array does not allocate until the first item is inserted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let array = DynamicArray::<String>::new();
    ///
    /// assert_eq!(array.len(), 0);
    /// assert_eq!(array.capacity(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(RawBlock::new(), DropPolicy::default())
    }

    /// Starts building a new [`DynamicArray`].
    ///
    /// Use this when you want to customize the array configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::{DropPolicy, DynamicArray};
    ///
    /// let array = DynamicArray::<u32>::builder()
    ///     .capacity(10)
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    ///
    /// assert_eq!(array.capacity(), 10);
    /// ```
    pub fn builder() -> DynamicArrayBuilder<T> {
        DynamicArrayBuilder::new()
    }

    /// Creates an empty array with room for exactly `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::try_with_capacity(capacity).unwrap_or_else(|e| e.escalate())
    }

    /// Creates an empty array with room for exactly `capacity` items, reporting allocation
    /// failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be allocated.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::builder().capacity(capacity).try_build()
    }

    /// Creates an array of `len` default-valued items, with a capacity of exactly `len`.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let array = DynamicArray::<u32>::with_len(3);
    ///
    /// assert_eq!(array, [0, 0, 0]);
    /// ```
    #[must_use]
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::try_with_len(len).unwrap_or_else(|e| e.escalate())
    }

    /// Creates an array of `len` default-valued items, reporting allocation failure as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be allocated.
    pub fn try_with_len(len: usize) -> Result<Self>
    where
        T: Default,
    {
        let mut array = Self::try_with_capacity(len)?;
        array.fill_to(len, T::default);
        Ok(array)
    }

    /// Creates an array with a copy of every item in `items`, with a capacity of exactly
    /// `items.len()`.
    ///
    /// If cloning any item panics, the clones made so far are dropped before the panic
    /// continues.
    #[must_use]
    pub fn from_slice(items: &[T]) -> Self
    where
        T: Clone,
    {
        let mut array = Self::with_capacity(items.len());
        array.clone_into_spare(items);
        array
    }

    /// The number of items in the array.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array contains no items.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of items the array can hold without reallocating.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.capacity()
    }

    /// Extracts a slice containing all the items.
    #[must_use]
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: The first `len` slots are always live and the block pointer is well-aligned
        // and non-null even when nothing is allocated.
        unsafe { slice::from_raw_parts(self.block.as_ptr(), self.len) }
    }

    /// Extracts a mutable slice containing all the items.
    #[must_use]
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len;

        // SAFETY: The first `len` slots are always live, the block pointer is well-aligned
        // and non-null even when nothing is allocated, and we hold an exclusive borrow.
        unsafe { slice::from_raw_parts_mut(self.block.as_mut_ptr(), len) }
    }

    /// Ensures the array can hold at least `capacity` items in total.
    ///
    /// Does nothing if the capacity is already sufficient. Otherwise, allocates storage for
    /// exactly `capacity` items and relocates the existing items into it, preserving order.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::from([1, 2]);
    ///
    /// array.reserve(10);
    /// assert_eq!(array.capacity(), 10);
    ///
    /// // Smaller requests are ignored.
    /// array.reserve(3);
    /// assert_eq!(array.capacity(), 10);
    /// ```
    pub fn reserve(&mut self, capacity: usize) {
        self.try_reserve(capacity).unwrap_or_else(|e| e.escalate());
    }

    /// Ensures the array can hold at least `capacity` items in total, reporting allocation
    /// failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the new storage cannot be allocated. The array is unchanged.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity() {
            return Ok(());
        }

        self.relocate_into(capacity)
    }

    /// Constructs an item at the end of the array and returns a reference to it.
    ///
    /// If the array is full, the storage is grown first, so `f` is only called once there is
    /// room for its result.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::new();
    ///
    /// let item = array.emplace_back(|| String::from("hello"));
    /// item.push_str(", world");
    ///
    /// assert_eq!(array, ["hello, world"]);
    /// ```
    pub fn emplace_back<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_back(f).unwrap_or_else(|e| e.escalate())
    }

    /// Constructs an item at the end of the array, reporting allocation failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is full and larger storage cannot be allocated. The array
    /// is unchanged and `f` is not called.
    pub fn try_emplace_back<F>(&mut self, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        if self.len == self.capacity() {
            self.grow()?;
        }

        let value = f();

        let mut slot = self.block.slot(self.len);

        // SAFETY: The slot is within capacity and at or beyond `len`, so it is uninitialized.
        unsafe {
            slot.write(value);
        }

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by len < capacity <= usize::MAX above");

        // SAFETY: We just initialized the slot and the returned reference borrows `self`
        // exclusively, so no other reference to the item can exist.
        Ok(unsafe { slot.as_mut() })
    }

    /// Appends an item to the end of the array.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    pub fn push_back(&mut self, value: T) {
        _ = self.emplace_back(|| value);
    }

    /// Appends an item to the end of the array, reporting allocation failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is full and larger storage cannot be allocated. The array
    /// is unchanged and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<()> {
        self.try_emplace_back(|| value)?;
        Ok(())
    }

    /// Constructs an item at `index`, shifting all items after it one position to the right.
    ///
    /// Returns the index of the new item, which is always `index`. Emplacing at `len()` is
    /// equivalent to [`emplace_back()`][Self::emplace_back].
    ///
    /// The item is fully constructed before any existing item is moved, so a panic in `f`
    /// leaves the array unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::from([1, 2, 3]);
    ///
    /// let index = array.emplace(1, || 99);
    ///
    /// assert_eq!(index, 1);
    /// assert_eq!(array, [1, 99, 2, 3]);
    /// ```
    pub fn emplace<F>(&mut self, index: usize, f: F) -> usize
    where
        F: FnOnce() -> T,
    {
        self.try_emplace(index, f).unwrap_or_else(|e| e.escalate())
    }

    /// Constructs an item at `index`, reporting allocation failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is full and larger storage cannot be allocated. The array
    /// is unchanged and `f` is not called.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn try_emplace<F>(&mut self, index: usize, f: F) -> Result<usize>
    where
        F: FnOnce() -> T,
    {
        assert!(
            index <= self.len,
            "emplace index {index} out of bounds in array of {} items of {}",
            self.len,
            type_name::<T>()
        );

        if index == self.len {
            self.try_emplace_back(f)?;
            return Ok(index);
        }

        // Guarded by the assertion above and by the early return.
        let tail_len = self.len.wrapping_sub(index);

        if self.len == self.capacity() {
            let mut new_block = self.allocate_grown()?;

            // If this panics, the new block is released and the array is untouched.
            let value = f();

            // SAFETY: The new block is larger than `len`, so `index` is within its capacity,
            // and nothing has been written to it yet.
            unsafe {
                new_block.slot(index).write(value);
            }

            // SAFETY: The first `index` slots of the old block are live and the new block has
            // room for them. The blocks are separate allocations so they cannot overlap.
            unsafe {
                ptr::copy_nonoverlapping(self.block.as_ptr(), new_block.as_mut_ptr(), index);
            }

            // SAFETY: Slots `[index, len)` of the old block are live and the new block has
            // room for them after the newly written item, as its capacity exceeds `len`.
            unsafe {
                ptr::copy_nonoverlapping(
                    self.block.slot(index).as_ptr(),
                    new_block.slot(index.wrapping_add(1)).as_ptr(),
                    tail_len,
                );
            }

            // All items now live in the new block. The old block is released without
            // touching the relocated items.
            self.block.swap(&mut new_block);
        } else {
            let value = f();

            let gap = self.block.slot(index);

            // Cannot overflow because `index < len < capacity`.
            let shifted = self.block.slot(index.wrapping_add(1));

            // SAFETY: Slots `[index, len)` are live and `len < capacity`, so the shifted range
            // `[index + 1, len + 1)` is still inside the block. `ptr::copy` permits overlap.
            unsafe {
                ptr::copy(gap.as_ptr(), shifted.as_ptr(), tail_len);
            }

            // SAFETY: The item previously in the gap has been relocated, so the slot is
            // logically uninitialized and can be written without dropping anything.
            unsafe {
                gap.write(value);
            }
        }

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by len < capacity <= usize::MAX");

        Ok(index)
    }

    /// Inserts an item at `index`, shifting all items after it one position to the right.
    ///
    /// Returns the index of the new item, which is always `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()` or if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    pub fn insert(&mut self, index: usize, value: T) -> usize {
        self.emplace(index, || value)
    }

    /// Inserts an item at `index`, reporting allocation failure as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is full and larger storage cannot be allocated. The array
    /// is unchanged and `value` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<usize> {
        self.try_emplace(index, || value)
    }

    /// Inserts a clone of the item at `source` into position `index`.
    ///
    /// The clone is made before anything is shifted, so the source item is read in its
    /// original position even when `index <= source`.
    ///
    /// # Panics
    ///
    /// Panics if `source >= len()`, if `index > len()` or if the capacity overflows the
    /// address space. Aborts via [`handle_alloc_error()`][std::alloc::handle_alloc_error] if
    /// the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::from(["a".to_string(), "b".to_string()]);
    ///
    /// array.insert_from_within(0, 1);
    ///
    /// assert_eq!(array, ["b", "a", "b"]);
    /// ```
    pub fn insert_from_within(&mut self, index: usize, source: usize) -> usize
    where
        T: Clone,
    {
        let value = self
            .as_slice()
            .get(source)
            .unwrap_or_else(|| {
                panic!(
                    "source index {source} out of bounds in array of {} items of {}",
                    self.len,
                    type_name::<T>()
                )
            })
            .clone();

        self.insert(index, value)
    }

    /// Drops the last item of the array. Does nothing if the array is empty.
    pub fn pop_back(&mut self) {
        drop(self.pop());
    }

    /// Removes the last item of the array and returns it, or `None` if the array is empty.
    pub fn pop(&mut self) -> Option<T> {
        let new_len = self.len.checked_sub(1)?;
        self.len = new_len;

        // SAFETY: The slot was live until we lowered `len` above, which transferred ownership
        // of the item to us.
        Some(unsafe { self.block.slot(new_len).read() })
    }

    /// Removes the item at `index`, shifting all items after it one position to the left,
    /// and drops it.
    ///
    /// Returns `index`, which now refers to the item that followed the removed one (or is
    /// equal to `len()` if the last item was removed).
    ///
    /// Exactly one item is dropped and no slot at or beyond the new `len()` is touched after
    /// the shift.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::from([1, 2, 3]);
    ///
    /// let next = array.erase(1);
    ///
    /// assert_eq!(next, 1);
    /// assert_eq!(array, [1, 3]);
    /// ```
    pub fn erase(&mut self, index: usize) -> usize {
        drop(self.remove(index));
        index
    }

    /// Removes the item at `index` and returns it, shifting all items after it one position
    /// to the left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "remove index {index} out of bounds in array of {} items of {}",
            self.len,
            type_name::<T>()
        );

        let hole = self.block.slot(index);

        // Cannot overflow because `index < len <= capacity`. May be one past the end.
        let after_hole = self.block.offset(index.wrapping_add(1));

        // SAFETY: The slot is live (guarded by the assertion above). Reading it leaves the slot
        // logically uninitialized; we close the hole below before anyone can observe it.
        let value = unsafe { hole.read() };

        // Cannot underflow, guarded by the assertion above.
        let tail_len = self.len.wrapping_sub(index).wrapping_sub(1);

        // SAFETY: Slots `[index + 1, len)` are live and shifting them one slot to the left
        // keeps them inside the block. `ptr::copy` permits overlap.
        unsafe {
            ptr::copy(after_hole.as_ptr(), hole.as_ptr(), tail_len);
        }

        // The former last slot now holds a stale bitwise duplicate that is excluded from the
        // live range and will never be dropped.
        self.len = self.len.wrapping_sub(1);

        value
    }

    /// Shortens the array to `len` items, dropping the rest. Does nothing if the array is
    /// already no longer than `len`. The capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        // Guarded by the early return above.
        let surplus = self.len.wrapping_sub(len);
        let first_surplus = self.block.slot(len);

        // Lower `len` first so that a panicking destructor cannot lead to a double drop.
        self.len = len;

        // SAFETY: Slots `[len, old_len)` were live and have been excluded from the live range
        // above, so we are the only ones who can still drop them.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                first_surplus.as_ptr(),
                surplus,
            ));
        }
    }

    /// Drops all items. The capacity is unchanged.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes the array to `len` items.
    ///
    /// If `len` is smaller than the current length, the trailing items are dropped. If it is
    /// larger, the capacity is raised to exactly `len` (if needed) and the new slots are
    /// filled with [`T::default()`][Default::default].
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut array = DynamicArray::from([1, 2, 3]);
    ///
    /// array.resize(5);
    /// assert_eq!(array, [1, 2, 3, 0, 0]);
    ///
    /// array.resize(2);
    /// assert_eq!(array, [1, 2]);
    /// ```
    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        self.resize_with(len, T::default);
    }

    /// Resizes the array to `len` items, filling any new slots with values returned by `f`.
    ///
    /// If `f` panics, the items it produced so far remain in the array.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    pub fn resize_with<F>(&mut self, len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        if len <= self.len {
            self.truncate(len);
            return;
        }

        self.reserve(len);
        self.fill_to(len, f);
    }

    /// Exchanges the contents of two arrays without moving any items.
    ///
    /// Each array keeps its own drop policy.
    pub fn swap(&mut self, other: &mut Self) {
        self.block.swap(&mut other.block);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Moves all items and storage into a new array, leaving this one empty with zero
    /// capacity.
    ///
    /// The new array has the same drop policy as this one.
    ///
    /// # Example
    ///
    /// ```rust
    /// use dynamic_array::DynamicArray;
    ///
    /// let mut source = DynamicArray::from([1, 2, 3]);
    /// let target = source.take();
    ///
    /// assert!(source.is_empty());
    /// assert_eq!(source.capacity(), 0);
    /// assert_eq!(target, [1, 2, 3]);
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
            len: mem::take(&mut self.len),
            drop_policy: self.drop_policy,
        }
    }

    /// Appends a clone of every item in `items`.
    ///
    /// Either all of the clones are appended or, if a clone panics, none of them are. The
    /// capacity may have grown in the latter case.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    pub fn extend_from_slice(&mut self, items: &[T])
    where
        T: Clone,
    {
        self.reserve_additional(items.len());
        self.clone_into_spare(items);
    }

    /// Makes room for `additional` more items, growing by at least the standard growth factor
    /// so that repeated small extensions stay amortized.
    fn reserve_additional(&mut self, additional: usize) {
        let required = self.len.checked_add(additional).unwrap_or_else(|| {
            Error::CapacityOverflow {
                requested: usize::MAX,
                item_type: type_name::<T>(),
            }
            .escalate()
        });

        if required <= self.capacity() {
            return;
        }

        self.reserve(required.max(self.grown_capacity()));
    }

    /// Clones `items` into the slots directly after the live range and publishes them.
    ///
    /// The caller must have ensured there is room for all of them.
    fn clone_into_spare(&mut self, items: &[T])
    where
        T: Clone,
    {
        let spare_len = self.capacity().wrapping_sub(self.len);
        assert!(
            items.len() <= spare_len,
            "not enough spare capacity for {} items in array of {}",
            items.len(),
            type_name::<T>()
        );

        let mut run = PartialRun::new(self.block.offset(self.len));

        for item in items {
            run.push(item.clone());
        }

        let cloned = run.commit();

        self.len = self
            .len
            .checked_add(cloned)
            .expect("guarded by spare capacity assertion above");
    }

    /// Writes values from `f` into the slots after the live range until `len` items are live.
    ///
    /// The caller must have ensured the capacity is at least `len`.
    fn fill_to<F>(&mut self, len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        while self.len < len {
            let value = f();

            // SAFETY: The slot is below `len <= capacity` and at the end of the live range,
            // so it is uninitialized.
            unsafe {
                self.block.slot(self.len).write(value);
            }

            // Cannot overflow because we are still below `len`.
            self.len = self.len.wrapping_add(1);
        }
    }

    /// The capacity the array grows to when it is full.
    fn grown_capacity(&self) -> usize {
        match self.capacity() {
            0 => 1,
            capacity => capacity.saturating_mul(2),
        }
    }

    /// Allocates a block for the next growth step without modifying the array.
    #[cold]
    fn allocate_grown(&self) -> Result<RawBlock<T>> {
        let new_capacity = self.grown_capacity();

        if new_capacity == self.capacity() {
            // Doubling saturated at the maximum. Only reachable for zero-sized items.
            return Err(Error::CapacityOverflow {
                requested: usize::MAX,
                item_type: type_name::<T>(),
            });
        }

        trace!(
            item_type = type_name::<T>(),
            len = self.len,
            old_capacity = self.capacity(),
            new_capacity,
            "growing dynamic array"
        );

        RawBlock::allocate(new_capacity)
    }

    #[cold]
    fn grow(&mut self) -> Result<()> {
        let mut new_block = self.allocate_grown()?;
        self.relocate_live_items(&mut new_block);
        Ok(())
    }

    #[cold]
    fn relocate_into(&mut self, new_capacity: usize) -> Result<()> {
        let mut new_block = RawBlock::allocate(new_capacity)?;

        trace!(
            item_type = type_name::<T>(),
            len = self.len,
            old_capacity = self.capacity(),
            new_capacity,
            "reserving dynamic array capacity"
        );

        self.relocate_live_items(&mut new_block);
        Ok(())
    }

    /// Moves every live item into `new_block`, which must be larger than `len`, and swaps it
    /// in. The old block ends up in `new_block` with no live items and is released when the
    /// caller drops it.
    fn relocate_live_items(&mut self, new_block: &mut RawBlock<T>) {
        assert!(
            new_block.capacity() >= self.len,
            "relocation target of {} items too small for {} items of {}",
            new_block.capacity(),
            self.len,
            type_name::<T>()
        );

        // SAFETY: The first `len` slots of the current block are live, the target has room for
        // them (asserted above) and two distinct blocks never overlap.
        unsafe {
            ptr::copy_nonoverlapping(self.block.as_ptr(), new_block.as_mut_ptr(), self.len);
        }

        self.block.swap(new_block);
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    #[allow(dead_code, reason = "only called from tests")]
    pub(crate) fn integrity_check(&self) {
        assert!(
            self.len <= self.capacity(),
            "len {} exceeds capacity {} in array of {}",
            self.len,
            self.capacity(),
            type_name::<T>()
        );
    }
}

impl<T> Default for DynamicArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DynamicArray<T> {
    fn drop(&mut self) {
        let was_empty = self.is_empty();

        self.clear();

        // The block releases the memory after we return, even if we panic below.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropItems && !thread::panicking() {
            assert!(
                was_empty,
                "dropped a non-empty array of {} with a policy that says it must be empty when dropped",
                type_name::<T>()
            );
        }
    }
}

impl<T: Clone> Clone for DynamicArray<T> {
    fn clone(&self) -> Self {
        let mut copy = Self::from_slice(self.as_slice());
        copy.drop_policy = self.drop_policy;
        copy
    }

    /// Replaces the contents of `self` with clones of the items in `source`.
    ///
    /// If `source` has more items than `self` has capacity for, the clones are built in a new
    /// array that is swapped in only once complete, so a panicking clone leaves `self`
    /// unchanged. Otherwise, the overlapping items are updated in place via
    /// [`Clone::clone_from`], surplus items are dropped and missing ones appended.
    ///
    /// The drop policy of `self` is unchanged and does not apply to the items being replaced,
    /// in either case.
    fn clone_from(&mut self, source: &Self) {
        if source.len > self.capacity() {
            // The temporary keeps the default policy, as it ends up owning our old items.
            let mut copy = Self::from_slice(source.as_slice());
            self.swap(&mut copy);
            return;
        }

        self.truncate(source.len);

        let (overlap, shortfall) = source.as_slice().split_at(self.len);

        for (target, item) in self.as_mut_slice().iter_mut().zip(overlap) {
            target.clone_from(item);
        }

        self.clone_into_spare(shortfall);
    }
}

impl<T> Deref for DynamicArray<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for DynamicArray<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T> AsRef<[T]> for DynamicArray<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> AsMut<[T]> for DynamicArray<T> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U> PartialEq<DynamicArray<U>> for DynamicArray<T>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &DynamicArray<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynamicArray<T> {}

impl<T, U> PartialEq<[U]> for DynamicArray<T>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U> PartialEq<&[U]> for DynamicArray<T>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, U, const N: usize> PartialEq<[U; N]> for DynamicArray<T>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Hash> Hash for DynamicArray<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T> Extend<T> for DynamicArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();

        let (lower_bound, _) = iter.size_hint();
        self.reserve_additional(lower_bound);

        for item in iter {
            self.push_back(item);
        }
    }
}

impl<'a, T: Copy + 'a> Extend<&'a T> for DynamicArray<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T> FromIterator<T> for DynamicArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T: Clone> From<&[T]> for DynamicArray<T> {
    fn from(items: &[T]) -> Self {
        Self::from_slice(items)
    }
}

impl<T, const N: usize> From<[T; N]> for DynamicArray<T> {
    fn from(items: [T; N]) -> Self {
        let mut array = Self::with_capacity(N);
        array.extend(items);
        array
    }
}

impl<T> IntoIterator for DynamicArray<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        // The iterator takes over ownership of the items, so our destructor must not run.
        let mut this = ManuallyDrop::new(self);
        let len = this.len;

        IntoIter::new(this.block.take(), len)
    }
}

impl<'a, T> IntoIterator for &'a DynamicArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynamicArray<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A run of items being written into consecutive uninitialized slots.
///
/// Until the run is committed, dropping it (e.g. while unwinding from a panicking constructor)
/// drops every item written so far, leaving the slots uninitialized again.
struct PartialRun<T> {
    first_slot: ptr::NonNull<T>,
    initialized: usize,
}

impl<T> PartialRun<T> {
    fn new(first_slot: ptr::NonNull<T>) -> Self {
        Self {
            first_slot,
            initialized: 0,
        }
    }

    /// The caller must have ensured there is an uninitialized slot after the ones already
    /// written.
    fn push(&mut self, value: T) {
        // SAFETY: The caller reserved room for every item of the run and we only ever write
        // one slot past the ones already initialized.
        unsafe {
            self.first_slot.add(self.initialized).write(value);
        }

        self.initialized = self.initialized.wrapping_add(1);
    }

    /// Hands ownership of the written items to the caller, returning how many there are.
    fn commit(self) -> usize {
        let initialized = self.initialized;
        mem::forget(self);
        initialized
    }
}

impl<T> Drop for PartialRun<T> {
    fn drop(&mut self) {
        // SAFETY: Exactly `initialized` slots have been written and not yet handed over.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.first_slot.as_ptr(),
                self.initialized,
            ));
        }
    }
}
