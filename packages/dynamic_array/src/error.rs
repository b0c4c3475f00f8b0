use std::alloc::{Layout, handle_alloc_error};

use thiserror::Error;

/// Errors that can occur when a [`DynamicArray`][crate::DynamicArray] or
/// [`RawBlock`][crate::RawBlock] acquires storage.
///
/// Only the `try_*` family of methods reports these as values. The infallible methods turn
/// [`CapacityOverflow`][Self::CapacityOverflow] into a panic and
/// [`AllocationFailed`][Self::AllocationFailed] into a call to
/// [`handle_alloc_error()`][std::alloc::handle_alloc_error], matching the standard collections.
///
/// In either case the container that attempted the allocation is left unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested capacity cannot be expressed as a memory layout on this platform.
    #[error("capacity overflow: {requested} items of {item_type} do not fit in the address space")]
    CapacityOverflow {
        /// The capacity that was requested, saturated at `usize::MAX` if the request itself
        /// was the result of an overflowing calculation.
        requested: usize,

        /// Name of the item type, for diagnostics.
        item_type: &'static str,
    },

    /// The global allocator could not satisfy the request.
    #[error("failed to allocate {layout:?} for {capacity} items of {item_type}")]
    AllocationFailed {
        /// The layout that was passed to the allocator.
        layout: Layout,

        /// The number of items the allocation was meant to hold.
        capacity: usize,

        /// Name of the item type, for diagnostics.
        item_type: &'static str,
    },
}

impl Error {
    /// Escalates the error the way an infallible collection method does.
    #[cfg_attr(test, mutants::skip)] // Diverges in every branch, nothing to observe.
    pub(crate) fn escalate(self) -> ! {
        match self {
            Self::AllocationFailed { layout, .. } => handle_alloc_error(layout),
            Self::CapacityOverflow { .. } => panic!("{self}"),
        }
    }
}

/// A specialized `Result` type for storage operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::any::type_name;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn capacity_overflow_message_names_item_type() {
        let error = Error::CapacityOverflow {
            requested: usize::MAX,
            item_type: type_name::<u64>(),
        };

        let message = error.to_string();
        assert!(message.contains("u64"));
        assert!(message.contains(&usize::MAX.to_string()));
    }

    #[test]
    fn allocation_failed_message_names_capacity() {
        let error = Error::AllocationFailed {
            layout: Layout::new::<[u32; 4]>(),
            capacity: 4,
            item_type: type_name::<u32>(),
        };

        let message = error.to_string();
        assert!(message.contains("4 items of u32"));
    }

    #[test]
    #[should_panic]
    fn escalate_capacity_overflow_panics() {
        let error = Error::CapacityOverflow {
            requested: usize::MAX,
            item_type: type_name::<u64>(),
        };

        error.escalate();
    }
}
