//! End-to-end scenarios: collections, sources, the designated thread and the
//! in-memory host together.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use nabu_engine::logging::{init_logging, LoggingConfig};
use nabu_ui::prelude::*;

#[derive(Default)]
struct Teardowns(AtomicUsize);

struct CountTeardown(Arc<Teardowns>);

impl<T> ItemLifecycle<T> for CountTeardown {
    fn teardown(&self, _item: &TemplatedItem<T>) {
        self.0.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn values<S, P>(c: &TemplatableCollection<i32, S, P>) -> Vec<i32>
where
    i32: From<S>,
    S: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    c.contents().iter().map(|v| **v).collect()
}

fn spawn_host() -> (NativeBridge, MemoryHost, DispatchThread) {
    init_logging(LoggingConfig::for_tests());
    let (dispatcher, thread) = Dispatcher::spawn(DispatcherConfig::default().thread_name("scenario-dispatch")).unwrap();
    let host = MemoryHost::new();
    (NativeBridge::new(dispatcher, host.clone()), host, thread)
}

// ── Core scenarios ────────────────────────────────────────────────────────

#[test]
fn direct_insert_projects_every_item() {
    let c = TemplatableCollection::<String, String, usize>::with_projection(String::len);
    c.insert_range(0, ["a", "bb", "ccc"].map(String::from)).unwrap();
    let contents: Vec<String> = c.contents().iter().map(|s| s.to_string()).collect();
    assert_eq!(contents, vec!["a", "bb", "ccc"]);
    assert_eq!(c.projected(), vec![1, 2, 3]);
}

#[test]
fn source_with_template_then_insert_and_retemplate() {
    let c = TemplatableCollection::<i32>::new();
    let teardowns = Arc::new(Teardowns::default());
    c.add_lifecycle(CountTeardown(Arc::clone(&teardowns)));

    let source = ObservableList::from_vec(vec![1, 2, 3]);
    c.change_template(Some(Template::new("double", |v: &i32| v * 2).into())).unwrap();
    c.change_source(Some(&source)).unwrap();
    assert_eq!(values(&c), vec![2, 4, 6]);

    source.insert(1, vec![9]).unwrap();
    assert_eq!(values(&c), vec![2, 18, 4, 6]);

    c.change_template(Some(Template::new("triple", |v: &i32| v * 3).into())).unwrap();
    assert_eq!(values(&c), vec![3, 27, 12, 18]);
    assert_eq!(teardowns.0.load(Ordering::SeqCst), 4);
}

#[test]
fn out_of_range_remove_leaves_collection_untouched() {
    let c = TemplatableCollection::<i32, i32, i32>::with_projection(|v| -v);
    c.insert_range(0, [1, 2, 3]).unwrap();
    let err = c.remove_range(5, 1).unwrap_err();
    assert_eq!(err, CollectionError::OutOfRange { op: "remove", index: 5, count: 1, len: 3 });
    assert_eq!(values(&c), vec![1, 2, 3]);
    assert_eq!(c.projected(), vec![-1, -2, -3]);
}

#[test]
fn attaching_a_source_replaces_direct_items() {
    let c = TemplatableCollection::<i32>::new();
    let teardowns = Arc::new(Teardowns::default());
    c.add_lifecycle(CountTeardown(Arc::clone(&teardowns)));
    c.insert_range(0, [7, 8]).unwrap();
    let direct = c.items();

    let source = ObservableList::from_vec(vec![1]);
    c.change_source(Some(&source)).unwrap();

    assert_eq!(teardowns.0.load(Ordering::SeqCst), 2);
    assert!(c.items().iter().all(|i| direct.iter().all(|d| !d.same_content(i))));
    assert_eq!(values(&c), vec![1]);
}

// ── Reentrancy and drift ──────────────────────────────────────────────────

fn small_only() -> ItemTemplate<i32, i32> {
    Template::fallible("small", |v: &i32| {
        if *v < 100 { Ok(*v) } else { Err(TemplateError::new("small", "too big")) }
    })
    .into()
}

#[test]
fn listener_mutating_the_source_keeps_collection_in_step() {
    let source = ObservableList::<i32>::new();
    let writer = source.clone();
    let _echo = source.subscribe(move |change| {
        if let ListChange::Inserted { items, .. } = change {
            if items.as_slice() == [1] {
                writer.push(2);
            }
        }
    });
    let c = TemplatableCollection::<i32>::new();
    c.change_source(Some(&source)).unwrap();

    source.push(1);

    assert_eq!(source.snapshot(), vec![1, 2]);
    assert_eq!(values(&c), source.snapshot());
    assert!(c.last_source_error().is_none());
}

/// Pushes a second item while the first one is being attached.
struct PushOnAttach(Weak<TemplatableCollection<i32, i32, i32>>);

impl ItemLifecycle<i32> for PushOnAttach {
    fn attached(&self, item: &TemplatedItem<i32>, _index: usize) {
        if **item.content() == 1 {
            if let Some(c) = self.0.upgrade() {
                c.push(2).unwrap();
            }
        }
    }
}

#[test]
fn hook_mutation_reaches_observers_in_commit_order() {
    let (dispatcher, dispatch_loop) = Dispatcher::current();
    let c = Arc::new(TemplatableCollection::<i32, i32, i32>::with_projection(|v: &i32| *v * 10));
    c.add_lifecycle(PushOnAttach(Arc::downgrade(&c)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    c.add_observer(move |change: &CollectionChange<i32>| s.lock().unwrap().push(change.clone()));
    let mirror = c.mirror(&dispatcher);

    c.push(1).unwrap();
    dispatch_loop.run_pending();

    assert_eq!(c.projected(), vec![10, 20]);
    assert_eq!(mirror.read().unwrap(), c.projected());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            CollectionChange::Inserted { index: 0, values: vec![10] },
            CollectionChange::Inserted { index: 1, values: vec![20] },
        ]
    );
}

#[test]
fn dropped_change_is_not_followed_by_positional_drift() {
    let c = TemplatableCollection::<i32>::new();
    c.change_template(Some(small_only())).unwrap();
    let source = ObservableList::from_vec(vec![1, 2]);
    c.change_source(Some(&source)).unwrap();

    source.insert(0, vec![500]).unwrap();
    source.remove(1, 1).unwrap();
    assert_eq!(source.snapshot(), vec![500, 2]);
    // 500 still cannot be built; nothing is applied against shifted indices.
    assert_eq!(values(&c), vec![1, 2]);
    assert!(matches!(c.last_source_error(), Some(CollectionError::Template(_))));

    source.remove(0, 1).unwrap();
    assert_eq!(values(&c), vec![2]);
    source.push(3);
    assert_eq!(values(&c), source.snapshot());
    assert_eq!(c.projected().len(), source.len());
}

#[test]
fn template_change_resyncs_a_drifted_collection() {
    let c = TemplatableCollection::<i32>::new();
    c.change_template(Some(small_only())).unwrap();
    let source = ObservableList::from_vec(vec![1, 2, 3]);
    c.change_source(Some(&source)).unwrap();
    source.replace(1, vec![700]).unwrap();
    assert_eq!(values(&c), vec![1, 2, 3]);

    c.change_template(Some(Template::new("plain", |v: &i32| *v).into())).unwrap();
    assert_eq!(values(&c), vec![1, 700, 3]);
    source.move_range(0, 2, 1).unwrap();
    assert_eq!(values(&c), source.snapshot());
}

#[test]
fn nothing_arrives_after_detach_while_a_worker_pushes() {
    init_logging(LoggingConfig::for_tests());
    let source = ObservableList::<i32>::new();
    let c = TemplatableCollection::<i32>::new();
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    c.add_observer(move |_: &CollectionChange<()>| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    c.change_source(Some(&source)).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let worker = {
        let source = source.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut next = 0;
            while !stop.load(Ordering::SeqCst) {
                source.push(next);
                next += 1;
            }
        })
    };
    while source.len() < 100 {
        thread::yield_now();
    }

    c.change_source(None).unwrap();
    let seen = changes.load(Ordering::SeqCst);
    assert!(c.is_empty());

    let target = source.len() + 200;
    while source.len() < target {
        thread::yield_now();
    }
    stop.store(true, Ordering::SeqCst);
    worker.join().unwrap();

    assert_eq!(changes.load(Ordering::SeqCst), seen);
    assert!(c.is_empty());
    assert!(!c.is_source_driven());
    assert_eq!(source.listener_count(), 0);
}

// ── Designated thread ─────────────────────────────────────────────────────

#[test]
fn workers_drive_dropdown_through_designated_thread() {
    let (bridge, host, thread) = spawn_host();
    let dropdown = Dropdown::<String>::new(&bridge).unwrap();
    let names = ObservableList::<String>::new();
    dropdown.set_items_source(Some(&names)).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let names = names.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    names.push(format!("w{w}-{i}"));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    names.remove(0, 10).unwrap();
    names.move_range(0, 80, 10).unwrap();

    let mirrored = dropdown.mirror().read().unwrap();
    assert_eq!(mirrored.len(), 90);
    assert_eq!(mirrored, dropdown.options().projected());
    let handle = dropdown.native().handle();
    assert_eq!(host.field(handle, "options"), Some(FieldValue::List(mirrored)));

    let designated = bridge.dispatcher().thread_id();
    assert!(host.journal().iter().all(|call| call.thread == designated));

    drop(dropdown);
    thread.shutdown().unwrap();
    assert!(host.is_destroyed(handle));
}

#[test]
fn concurrent_direct_mutation_is_serialized() {
    let (bridge, _host, _thread) = spawn_host();
    let mesh = Arc::new(UiMesh::<MeshItem>::new(&bridge).unwrap());
    let workers: Vec<_> = (0..4)
        .map(|w| {
            let mesh = Arc::clone(&mesh);
            thread::spawn(move || {
                for i in 0..20 {
                    let x = (w * 20 + i) as f32;
                    mesh.push(MeshItem::new(MeshShape::Rect { x, y: 0.0, w: 1.0, h: 1.0 }, [1.0; 4])).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(mesh.items().len(), 80);
    assert_eq!(mesh.mirror().read().unwrap(), mesh.items().projected());
}

#[test]
fn slider_round_trip() {
    let (bridge, host, _thread) = spawn_host();
    let slider = Slider::new(&bridge).unwrap().range(0.0, 1.0);
    let model = Property::new(PropertyKey::new("volume", BindingMode::TwoWay), 0.25);
    let _binding = PropertyBinding::new(&model, slider.value(), BindingMode::TwoWay);

    assert_eq!(slider.native().read("value").unwrap(), FieldValue::Float(0.25));

    slider.engine_value_changed(0.75);
    assert_eq!(model.get(), 0.75);

    let handle = slider.native().handle();
    bridge.dispatcher().send(|| ()).unwrap();
    assert_eq!(host.field(handle, "value"), Some(FieldValue::Float(0.25)));
}

#[test]
fn trigger_entries_from_a_source() {
    let (bridge, host, _thread) = spawn_host();
    let trigger = EventTrigger::new(&bridge).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));

    let entries = ObservableList::new();
    for event in ["open", "close", "open"] {
        let f = Arc::clone(&fired);
        entries.push(
            TriggerEntry::new(&bridge, event)
                .unwrap()
                .on_fire(move |_| {
                    f.fetch_add(1, Ordering::SeqCst);
                }),
        );
    }
    trigger.set_items_source(Some(&entries)).unwrap();
    assert_eq!(trigger.fire("open"), 2);
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    let handles = trigger.mirror().read().unwrap();
    assert_eq!(handles.len(), 3);
    assert_eq!(host.field(trigger.native().handle(), "triggers"), Some(FieldValue::List(handles)));

    entries.remove(0, 1).unwrap();
    assert_eq!(trigger.fire("open"), 1);
}

#[test]
fn send_after_shutdown_reports_disconnect() {
    let (bridge, _host, thread) = spawn_host();
    thread.shutdown().unwrap();
    assert_eq!(
        bridge.create(NativeKind::SLIDER),
        Err(HostError::Dispatch(DispatchError::Disconnected))
    );
}
