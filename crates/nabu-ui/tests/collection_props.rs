//! Property tests for templatable collections driven by random operation
//! sequences.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nabu_ui::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert { index: usize, items: Vec<i32> },
    Remove { index: usize, count: usize },
    Replace { index: usize, items: Vec<i32> },
    Move { from: usize, to: usize, count: usize },
    Reset { items: Vec<i32> },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let items = || prop::collection::vec(-50i32..50, 0..4);
    prop_oneof![
        (0usize..12, items()).prop_map(|(index, items)| Op::Insert { index, items }),
        (0usize..12, 0usize..4).prop_map(|(index, count)| Op::Remove { index, count }),
        (0usize..12, items()).prop_map(|(index, items)| Op::Replace { index, items }),
        (0usize..12, 0usize..12, 0usize..4).prop_map(|(from, to, count)| Op::Move { from, to, count }),
        items().prop_map(|items| Op::Reset { items }),
    ]
}

fn apply(source: &ObservableList<i32>, op: &Op) {
    // Invalid ranges are part of the input space; they must change nothing.
    let _ = match op.clone() {
        Op::Insert { index, items } => source.insert(index, items),
        Op::Remove { index, count } => source.remove(index, count),
        Op::Replace { index, items } => source.replace(index, items),
        Op::Move { from, to, count } => source.move_range(from, to, count),
        Op::Reset { items } => {
            source.reset(items);
            Ok(())
        }
    };
}

#[derive(Default)]
struct Counts {
    attached: AtomicUsize,
    teardown: AtomicUsize,
}

struct Counting(Arc<Counts>);

impl<T> ItemLifecycle<T> for Counting {
    fn attached(&self, _item: &TemplatedItem<T>, _index: usize) {
        self.0.attached.fetch_add(1, Ordering::SeqCst);
    }
    fn teardown(&self, _item: &TemplatedItem<T>) {
        self.0.teardown.fetch_add(1, Ordering::SeqCst);
    }
}

fn tripled() -> (TemplatableCollection<i64, i32, String>, Arc<Counts>) {
    let collection = TemplatableCollection::with_projection(|v: &i64| format!("<{v}>"));
    collection
        .change_template(Some(Template::new("triple", |v: &i32| i64::from(*v) * 3).into()))
        .unwrap();
    let counts = Arc::new(Counts::default());
    collection.add_lifecycle(Counting(Arc::clone(&counts)));
    (collection, counts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn source_driven_collection_tracks_source(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let (dispatcher, dispatch_loop) = Dispatcher::current();
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let (collection, _) = tripled();
        collection.change_source(Some(&source)).unwrap();
        let mirror = collection.mirror(&dispatcher);

        for op in &ops {
            apply(&source, op);

            let expected: Vec<i64> = source.snapshot().iter().map(|v| i64::from(*v) * 3).collect();
            let contents: Vec<i64> = collection.contents().iter().map(|v| **v).collect();
            let projected = collection.projected();
            prop_assert_eq!(contents.len(), projected.len());
            prop_assert_eq!(&contents, &expected);
            for (content, value) in contents.iter().zip(&projected) {
                prop_assert_eq!(value, &format!("<{content}>"));
            }
        }

        dispatch_loop.run_pending();
        prop_assert_eq!(mirror.read().unwrap(), collection.projected());
        prop_assert!(collection.last_source_error().is_none());
    }

    #[test]
    fn out_of_range_direct_ops_change_nothing(
        len in 0usize..6,
        index in 0usize..10,
        count in 1usize..5,
    ) {
        let collection = TemplatableCollection::<i32, i32, i32>::with_projection(|v| v + 1);
        collection.insert_range(0, (0..len as i32).collect::<Vec<_>>()).unwrap();
        let before = collection.contents();

        if index + count > len {
            prop_assert!(collection.remove_range(index, count).is_err());
            prop_assert!(collection.replace_range(index, count, [9]).is_err());
            prop_assert!(collection.move_range(index, 0, count).is_err());
        }
        if index > len {
            prop_assert!(collection.insert_range(index, [9]).is_err());
        }

        let after = collection.contents();
        prop_assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            prop_assert!(Arc::ptr_eq(a, b));
        }
        prop_assert_eq!(collection.projected().len(), len);
    }

    #[test]
    fn move_preserves_identity(
        values in prop::collection::vec(any::<i32>(), 1..10),
        from_seed in any::<usize>(),
        to_seed in any::<usize>(),
        count_seed in any::<usize>(),
    ) {
        let len = values.len();
        let count = 1 + count_seed % len;
        let from = from_seed % (len - count + 1);
        let to = to_seed % (len - count + 1);

        let collection = TemplatableCollection::<i32>::new();
        let counts = Arc::new(Counts::default());
        collection.add_lifecycle(Counting(Arc::clone(&counts)));
        collection.insert_range(0, values).unwrap();
        let before = collection.contents();

        collection.move_range(from, to, count).unwrap();
        let after = collection.contents();

        let mut expected = before.clone();
        let block: Vec<_> = expected.drain(from..from + count).collect();
        expected.splice(to..to, block);
        for (a, b) in expected.iter().zip(&after) {
            prop_assert!(Arc::ptr_eq(a, b));
        }
        prop_assert_eq!(counts.teardown.load(Ordering::SeqCst), 0);
        prop_assert_eq!(counts.attached.load(Ordering::SeqCst), len);
    }

    #[test]
    fn reset_matches_clear_then_insert(
        initial in prop::collection::vec(-50i32..50, 0..8),
        next in prop::collection::vec(-50i32..50, 0..8),
    ) {
        let reset_source = ObservableList::from_vec(initial.clone());
        let (reset, reset_counts) = tripled();
        reset.change_source(Some(&reset_source)).unwrap();

        let manual_source = ObservableList::from_vec(initial);
        let (manual, manual_counts) = tripled();
        manual.change_source(Some(&manual_source)).unwrap();

        reset_source.reset(next.clone());
        manual_source.clear();
        manual_source.insert(0, next).unwrap();

        let values = |c: &TemplatableCollection<i64, i32, String>| -> Vec<i64> {
            c.contents().iter().map(|v| **v).collect()
        };
        prop_assert_eq!(values(&reset), values(&manual));
        prop_assert_eq!(reset.projected(), manual.projected());
        prop_assert_eq!(
            reset_counts.teardown.load(Ordering::SeqCst),
            manual_counts.teardown.load(Ordering::SeqCst)
        );
        prop_assert_eq!(
            reset_counts.attached.load(Ordering::SeqCst),
            manual_counts.attached.load(Ordering::SeqCst)
        );
    }
}
