//! Integration tests for the `dynamic_array` package.
//!
//! These tests exercise `DynamicArray` purely through its public API, covering the documented
//! scenarios and checking the sequence properties against `Vec` as a reference model.

use std::cell::Cell;
use std::rc::Rc;

use dynamic_array::{DropPolicy, DynamicArray, Error, RawBlock};
use proptest::prelude::*;

#[test]
fn push_three_then_iterate() {
    let mut array = DynamicArray::new();
    let mut capacities = Vec::new();

    for value in [1, 2, 3] {
        array.push_back(value);
        capacities.push(array.capacity());
    }

    assert_eq!(array.iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
    assert_eq!(capacities, [1, 2, 4]);
    assert_eq!(array.len(), 3);
}

#[test]
fn erase_middle_of_three() {
    let mut array = DynamicArray::from([1, 2, 3]);

    array.erase(1);

    assert_eq!(array, [1, 3]);
    assert_eq!(array.len(), 2);
}

#[test]
fn emplace_middle_of_three() {
    let mut array = DynamicArray::from([1, 2, 3]);

    array.emplace(1, || 99);

    assert_eq!(array, [1, 99, 2, 3]);
}

#[test]
fn resize_up_then_down() {
    let mut array = DynamicArray::from([1, 2, 3]);

    array.resize(5);
    assert_eq!(array, [1, 2, 3, 0, 0]);
    assert_eq!(array.len(), 5);

    array.resize(2);
    assert_eq!(array, [1, 2]);
}

#[test]
fn copy_is_independent() {
    let a = DynamicArray::from([String::from("x"), String::from("y")]);
    let mut b = a.clone();

    b.push_back(String::from("z"));
    b.erase(0);

    assert_eq!(a, ["x", "y"]);
    assert_eq!(b, ["y", "z"]);
}

#[test]
fn take_moves_everything() {
    let mut a = DynamicArray::from([1, 2, 3]);

    let b = a.take();

    assert_eq!(a.len(), 0);
    assert_eq!(b, [1, 2, 3]);
}

#[test]
fn swap_is_move_assignment() {
    let mut target = DynamicArray::from([7]);
    let mut source = DynamicArray::from([1, 2, 3]);

    target.swap(&mut source);

    assert_eq!(target, [1, 2, 3]);
    assert_eq!(source, [7]);
}

#[test]
fn nested_arrays() {
    let mut outer = DynamicArray::new();

    for len in 0..5 {
        outer.push_back(DynamicArray::<u64>::with_len(len));
    }

    outer.erase(0);
    outer.insert_from_within(0, 3);

    assert_eq!(
        outer.iter().map(DynamicArray::len).collect::<Vec<_>>(),
        [4, 1, 2, 3, 4]
    );
}

#[test]
fn every_item_dropped_exactly_once() {
    struct Droppable {
        drops: Rc<Cell<usize>>,
    }

    impl Drop for Droppable {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    let drops = Rc::new(Cell::new(0));
    let make = || Droppable {
        drops: Rc::clone(&drops),
    };

    {
        let mut array = DynamicArray::new();

        for _ in 0..10 {
            array.push_back(make());
        }

        array.emplace(3, make);
        array.insert(0, make());
        array.erase(5);
        array.pop_back();
        array.resize_with(20, make);
        array.truncate(4);

        let mut iter = array.into_iter();
        drop(iter.next());
    }

    // 10 pushed, 1 emplaced, 1 inserted, 10 added by resizing.
    assert_eq!(drops.get(), 22);
}

#[test]
fn fallible_allocation_reports_errors() {
    let mut array = DynamicArray::<u64>::new();

    assert!(matches!(
        array.try_reserve(usize::MAX),
        Err(Error::CapacityOverflow { .. })
    ));
    assert!(array.try_push_back(1).is_ok());
    assert_eq!(array, [1]);

    assert!(matches!(
        RawBlock::<u64>::allocate(usize::MAX),
        Err(Error::CapacityOverflow { .. })
    ));
}

#[test]
fn must_not_drop_items_allows_emptied_array() {
    let mut array = DynamicArray::builder()
        .capacity(4)
        .drop_policy(DropPolicy::MustNotDropItems)
        .build();

    array.push_back(String::from("handed back"));

    let items = array.take().into_iter().collect::<Vec<_>>();
    assert_eq!(items, ["handed back"]);
}

#[derive(Clone, Debug)]
enum Op {
    PushBack(u32),
    Emplace(usize, u32),
    Erase(usize),
    PopBack,
    Resize(usize),
    Reserve(usize),
    InsertFromWithin(usize, usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u32>().prop_map(Op::PushBack),
        (any::<usize>(), any::<u32>()).prop_map(|(at, value)| Op::Emplace(at, value)),
        any::<usize>().prop_map(Op::Erase),
        Just(Op::PopBack),
        (0_usize..40).prop_map(Op::Resize),
        (0_usize..80).prop_map(Op::Reserve),
        (any::<usize>(), any::<usize>()).prop_map(|(at, from)| Op::InsertFromWithin(at, from)),
    ]
}

/// Applies the operation to both the array and the reference model, clamping positions so
/// every operation is valid.
fn apply(op: &Op, array: &mut DynamicArray<u32>, model: &mut Vec<u32>) {
    match *op {
        Op::PushBack(value) => {
            array.push_back(value);
            model.push(value);
        }
        Op::Emplace(at, value) => {
            let at = at % (model.len() + 1);
            assert_eq!(array.emplace(at, || value), at);
            model.insert(at, value);
        }
        Op::Erase(at) => {
            if !model.is_empty() {
                let at = at % model.len();
                assert_eq!(array.erase(at), at);
                model.remove(at);
            }
        }
        Op::PopBack => {
            array.pop_back();
            model.pop();
        }
        Op::Resize(len) => {
            array.resize(len);
            model.resize(len, 0);
        }
        Op::Reserve(capacity) => {
            let capacity_before = array.capacity();
            array.reserve(capacity);
            assert!(array.capacity() >= capacity);
            if capacity <= capacity_before {
                assert_eq!(array.capacity(), capacity_before);
            }
        }
        Op::InsertFromWithin(at, from) => {
            if !model.is_empty() {
                let from = from % model.len();
                let at = at % (model.len() + 1);
                array.insert_from_within(at, from);
                model.insert(at, model[from]);
            }
        }
    }
}

proptest! {
    #[test]
    fn push_back_preserves_order(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let mut array = DynamicArray::new();

        for value in &values {
            array.push_back(*value);
            prop_assert!(array.len() <= array.capacity());
        }

        prop_assert_eq!(array.iter().copied().collect::<Vec<_>>(), values);
    }

    #[test]
    fn matches_vec_model(ops in prop::collection::vec(arb_op(), 0..100)) {
        let mut array = DynamicArray::new();
        let mut model = Vec::new();

        for op in &ops {
            apply(op, &mut array, &mut model);

            prop_assert!(array.len() <= array.capacity());
            prop_assert_eq!(array.as_slice(), model.as_slice());
        }
    }

    #[test]
    fn erase_removes_exactly_one(
        values in prop::collection::vec(any::<u32>(), 1..50),
        at in any::<usize>(),
    ) {
        let at = at % values.len();
        let mut array = values.iter().copied().collect::<DynamicArray<_>>();

        array.erase(at);

        let mut expected = values.clone();
        expected.remove(at);

        prop_assert_eq!(array.len(), values.len() - 1);
        prop_assert_eq!(array.as_slice(), expected.as_slice());
    }

    #[test]
    fn emplace_at_end_is_emplace_back(
        values in prop::collection::vec(any::<u32>(), 0..50),
        extra in any::<u32>(),
    ) {
        let mut a = values.iter().copied().collect::<DynamicArray<_>>();
        let mut b = a.clone();

        a.emplace(a.len(), || extra);
        b.emplace_back(|| extra);

        prop_assert_eq!(&a, &b);
    }

    #[test]
    fn clone_from_matches_source(
        target in prop::collection::vec(any::<u32>(), 0..30),
        source in prop::collection::vec(any::<u32>(), 0..30),
    ) {
        let mut target = target.into_iter().collect::<DynamicArray<_>>();
        let source = source.into_iter().collect::<DynamicArray<_>>();

        target.clone_from(&source);

        prop_assert_eq!(&target, &source);
        prop_assert!(target.len() <= target.capacity());
    }
}
