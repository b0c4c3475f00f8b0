/// What a [`DynamicArray`][crate::DynamicArray] does with items it still holds when dropped.
///
/// The policy applies only to the drop of the array itself. Items removed through
/// [`erase()`][crate::DynamicArray::erase], [`truncate()`][crate::DynamicArray::truncate],
/// shrinking [`resize()`][crate::DynamicArray::resize] or replaced by
/// [`clone_from()`][Clone::clone_from] are dropped regardless of the policy.
///
/// # Examples
///
/// ```
/// use dynamic_array::{DropPolicy, DynamicArray};
///
/// let mut array = DynamicArray::<String>::builder()
///     .drop_policy(DropPolicy::MustNotDropItems)
///     .build();
///
/// array.push_back("handed back".to_string());
///
/// // Move the items out before the array goes away.
/// let items = array.take().into_iter().collect::<Vec<_>>();
/// assert_eq!(items, ["handed back"]);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Remaining items are dropped in place, front to back, before the storage is released.
    #[default]
    MayDropItems,

    /// Dropping an array that still holds items drops them and then panics. The storage is
    /// released either way. No check is made if the thread is already panicking.
    ///
    /// Use this when every item must be handed back to its owner explicitly. The array can be
    /// emptied with [`take()`][crate::DynamicArray::take] followed by
    /// [`into_iter()`][IntoIterator::into_iter], with [`pop()`][crate::DynamicArray::pop] or
    /// with [`clear()`][crate::DynamicArray::clear]. A clone of the array inherits the policy.
    MustNotDropItems,
}
