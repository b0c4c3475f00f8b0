//! Basic usage of the `dynamic_array` crate:
//!
//! * Creating an array.
//! * Adding items at the end and in the middle.
//! * Removing items.
//! * Watching the capacity grow.

use dynamic_array::DynamicArray;

fn main() {
    let mut array = DynamicArray::<String>::new();

    // Appending grows the capacity by doubling whenever the array is full.
    for name in ["Alice", "Bob", "Charlie"] {
        array.push_back(name.to_string());

        println!(
            "Array contains {} items, with an auto-adjusting capacity of {}",
            array.len(),
            array.capacity()
        );
    }

    // Items can be constructed directly at any position. Everything after it shifts right.
    let index = array.emplace(1, || "Zed".to_string());
    println!("Emplaced item at index {index}: {array:?}");

    // Copying an item that is already in the array is done via a dedicated method, which
    // makes the copy before anything is shifted.
    array.insert_from_within(0, 3);
    println!("Copied the last item to the front: {array:?}");

    // Erasing shifts everything after the erased item left by one.
    array.erase(2);
    println!("Erased index 2: {array:?}");

    // The array dereferences to a slice, so all the usual read operations are available.
    let longest = array.iter().max_by_key(|name| name.len());
    println!("Longest name: {longest:?}");

    // Resizing fills new slots with default values or drops surplus items.
    array.resize(6);
    println!("Resized to 6: {array:?}");

    array.resize(2);
    println!("Resized to 2: {array:?}");

    // Owning iteration takes over the storage without copying anything.
    for name in array {
        println!("Goodbye, {name}");
    }
}
