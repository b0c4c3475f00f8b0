#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A growable array that manages its own raw storage, the lifetime of every item it holds and
//! the amortized growth of its capacity.
//!
//! This package provides [`DynamicArray`], a contiguous sequence container with the same
//! fundamental behavior as [`Vec`], built from two explicit layers:
//!
//! - [`RawBlock`] owns a fixed-capacity region of uninitialized memory. It allocates and releases
//!   that memory but never constructs or drops items.
//! - [`DynamicArray`] owns a [`RawBlock`] and the count of live items in it. Every item is
//!   written into an uninitialized slot when inserted and dropped in place when removed.
//!
//! # Key Features
//!
//! - **Amortized growth**: a full array doubles its capacity (starting from one).
//! - **In-place construction**: [`emplace()`][DynamicArray::emplace] and
//!   [`emplace_back()`][DynamicArray::emplace_back] construct items from a closure once room
//!   has been made for them.
//! - **Failure safety**: operations that clone items publish the clones only once all of them
//!   exist, so a panicking [`Clone`] leaves the array as it was.
//! - **Fallible allocation**: every allocating operation has a `try_*` counterpart that reports
//!   [`Error`] instead of panicking or aborting.
//! - **Flexible drop policies**: configure behavior when an array is dropped with remaining items.
//!
//! # Example
//!
//! ```rust
//! use dynamic_array::DynamicArray;
//!
//! let mut array = DynamicArray::new();
//!
//! array.push_back(1);
//! array.push_back(2);
//! array.push_back(3);
//! assert_eq!(array, [1, 2, 3]);
//!
//! array.emplace(1, || 99);
//! assert_eq!(array, [1, 99, 2, 3]);
//!
//! array.erase(2);
//! assert_eq!(array, [1, 99, 3]);
//!
//! array.resize(5);
//! assert_eq!(array, [1, 99, 3, 0, 0]);
//!
//! // The array dereferences to a slice for reading and iteration.
//! assert_eq!(array.iter().sum::<i32>(), 103);
//! ```
//!
//! # Working with raw storage
//!
//! [`RawBlock`] is public for callers that want to build their own containers on the same
//! foundation:
//!
//! ```rust
//! use dynamic_array::RawBlock;
//!
//! let block = RawBlock::<String>::allocate(2)?;
//!
//! // SAFETY: Slot 0 is in bounds and uninitialized.
//! unsafe { block.slot(0).write("hello".to_string()) };
//!
//! // SAFETY: We initialized slot 0 above and read it out exactly once. The block itself
//! // never drops items, so ownership is now ours.
//! let greeting = unsafe { block.slot(0).read() };
//! assert_eq!(greeting, "hello");
//! # Ok::<(), dynamic_array::Error>(())
//! ```

mod builder;
mod drop_policy;
mod dynamic_array;
mod error;
mod into_iter;
mod raw_block;

pub use builder::*;
pub use drop_policy::*;
pub use dynamic_array::DynamicArray;
pub use error::*;
pub use into_iter::IntoIter;
pub use raw_block::RawBlock;
