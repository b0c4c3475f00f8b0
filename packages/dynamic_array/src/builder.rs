use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{DropPolicy, DynamicArray, RawBlock, Result};

/// Builder for creating an instance of [`DynamicArray`].
///
/// You only need to use this builder if you want to customize the array configuration.
/// The default configuration used by [`DynamicArray::new()`][1] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use dynamic_array::{DropPolicy, DynamicArray};
///
/// let array = DynamicArray::<u32>::builder()
///     .capacity(64)
///     .drop_policy(DropPolicy::MayDropItems)
///     .build();
///
/// assert_eq!(array.capacity(), 64);
/// ```
///
/// [1]: DynamicArray::new
#[must_use]
pub struct DynamicArrayBuilder<T> {
    capacity: usize,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for DynamicArrayBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicArrayBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> DynamicArrayBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: 0,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the initial capacity of the array. The array will not need to reallocate until
    /// it holds more than this many items.
    ///
    /// The default is zero, in which case the array does not allocate until the first insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynamic_array::DynamicArray;
    ///
    /// let array = DynamicArray::<String>::builder().capacity(8).build();
    ///
    /// assert_eq!(array.capacity(), 8);
    /// assert!(array.is_empty());
    /// ```
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the array. This governs how
    /// to treat remaining items in the array when the array is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynamic_array::{DropPolicy, DynamicArray};
    ///
    /// let array = DynamicArray::<u32>::builder()
    ///     .drop_policy(DropPolicy::MustNotDropItems)
    ///     .build();
    /// ```
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the array with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the requested capacity overflows the address space. Aborts via
    /// [`handle_alloc_error()`][std::alloc::handle_alloc_error] if the allocator fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynamic_array::DynamicArray;
    ///
    /// let array = DynamicArray::<u32>::builder().build();
    /// assert_eq!(array.capacity(), 0);
    /// ```
    #[must_use]
    pub fn build(self) -> DynamicArray<T> {
        self.try_build().unwrap_or_else(|e| e.escalate())
    }

    /// Builds the array with the specified configuration, reporting allocation failure
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial capacity cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynamic_array::{DynamicArray, Error};
    ///
    /// let result = DynamicArray::<u64>::builder().capacity(usize::MAX).try_build();
    ///
    /// assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
    /// ```
    pub fn try_build(self) -> Result<DynamicArray<T>> {
        let block = RawBlock::allocate(self.capacity)?;

        Ok(DynamicArray::new_inner(block, self.drop_policy))
    }
}
