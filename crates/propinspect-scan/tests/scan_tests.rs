use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use propinspect_core::{ChildSource, IndexReport, PropertySource, RawCategory};
use propinspect_scan::{
    HostError, ItemId, MemoryModel, ModelHost, PropertyKey, RawValue, ScanConfig, ScanError,
    ScanOutcome, ScanScope, ScanSession, ScanState, Value,
};

/// Host wrapper that blocks one property read until released, so tests can
/// act on a scan that is deterministically mid-flight.
struct GatedModel {
    inner: MemoryModel,
    gate_at: u64,
    reads: AtomicU64,
    reached: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

struct Gate {
    reached: mpsc::Receiver<()>,
    release: mpsc::Sender<()>,
}

fn gated(inner: MemoryModel, gate_at: u64) -> (Arc<GatedModel>, Gate) {
    let (reached_tx, reached_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let model = GatedModel {
        inner,
        gate_at,
        reads: AtomicU64::new(0),
        reached: Mutex::new(reached_tx),
        release: Mutex::new(release_rx),
    };
    let gate = Gate {
        reached: reached_rx,
        release: release_tx,
    };
    (Arc::new(model), gate)
}

impl ChildSource for GatedModel {
    fn children(&self, item: ItemId) -> Result<Vec<ItemId>, HostError> {
        self.inner.children(item)
    }
}

impl PropertySource for GatedModel {
    fn categories(&self, item: ItemId) -> Result<Vec<RawCategory>, HostError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == self.gate_at {
            let _ = self.reached.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
        self.inner.categories(item)
    }
}

impl ModelHost for GatedModel {
    fn root_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.inner.root_items()
    }

    fn selected_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.inner.selected_items()
    }
}

/// Host wrapper whose property reader panics on one read.
struct PanickingModel {
    inner: MemoryModel,
    panic_at: u64,
    reads: AtomicU64,
}

impl ChildSource for PanickingModel {
    fn children(&self, item: ItemId) -> Result<Vec<ItemId>, HostError> {
        self.inner.children(item)
    }
}

impl PropertySource for PanickingModel {
    fn categories(&self, item: ItemId) -> Result<Vec<RawCategory>, HostError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == self.panic_at {
            panic!("host crashed reading {item}");
        }
        self.inner.categories(item)
    }
}

impl ModelHost for PanickingModel {
    fn root_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.inner.root_items()
    }

    fn selected_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.inner.selected_items()
    }
}

fn material() -> PropertyKey {
    PropertyKey::new("Geometry", "Material")
}

fn index_key() -> PropertyKey {
    PropertyKey::new("Item", "Index")
}

/// Site (id 0) with `count` beams (ids 1..=count), each carrying its index
/// and a steel material.
fn beams(count: i32) -> MemoryModel {
    let mut model = MemoryModel::new();
    let site = model.add_root("Site");
    for i in 0..count {
        let beam = model.add_child(site, format!("Beam {i}")).unwrap();
        model.add_property(beam, "Item", "Index", RawValue::Int32(i)).unwrap();
        model
            .add_property(beam, "Geometry", "Material", RawValue::DisplayString("Steel".into()))
            .unwrap();
    }
    model
}

/// Root with two children A and B, both `Geometry/Material = Steel`.
fn steel_pair() -> (MemoryModel, ItemId, ItemId) {
    let mut model = MemoryModel::new();
    let root = model.add_root("Root");
    let a = model.add_child(root, "A").unwrap();
    let b = model.add_child(root, "B").unwrap();
    for item in [a, b] {
        model
            .add_property(item, "Geometry", "Material", RawValue::DisplayString("Steel".into()))
            .unwrap();
    }
    (model, a, b)
}

fn run<H: ModelHost + Send + Sync + 'static>(host: Arc<H>, config: ScanConfig) -> ScanSession {
    let mut session = ScanSession::new();
    session.start(host, config).unwrap();
    session.join();
    session
}

#[test]
fn test_full_scan_shared_value() {
    let (model, a, b) = steel_pair();
    let session = run(Arc::new(model), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();

    assert_eq!(session.state(), ScanState::Completed);
    assert_eq!(snapshot.values(&material()), vec![&Value::text("Steel")]);
    assert_eq!(snapshot.items(&material(), &Value::text("Steel")), vec![a, b]);
    assert_eq!(snapshot.items_visited, 3);
}

#[test]
fn test_selection_scan_only_visits_selection() {
    let (mut model, a, b) = steel_pair();
    model.select(a).unwrap();
    let session = run(Arc::new(model), ScanConfig::new(ScanScope::Selection));
    let snapshot = session.snapshot().unwrap();

    assert_eq!(snapshot.scope, ScanScope::Selection);
    assert_eq!(snapshot.values(&material()), vec![&Value::text("Steel")]);
    assert_eq!(snapshot.items(&material(), &Value::text("Steel")), vec![a]);
    assert!(!snapshot.index.contains_item(&material(), &Value::text("Steel"), b));
    assert_eq!(snapshot.items_visited, 1);
}

#[test]
fn test_unrecognized_value_becomes_none() {
    let (mut model, a, _) = steel_pair();
    model
        .add_property(a, "Geometry", "Centroid", RawValue::Point3D { x: 0.0, y: 1.0, z: 2.0 })
        .unwrap();
    let session = run(Arc::new(model), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();

    assert_eq!(snapshot.outcome, ScanOutcome::Completed);
    let centroid = PropertyKey::new("Geometry", "Centroid");
    assert_eq!(snapshot.values(&centroid), vec![&Value::None]);
    assert_eq!(snapshot.items(&centroid, &Value::None), vec![a]);
}

#[test]
fn test_repeated_scans_are_deterministic() {
    let host = Arc::new(beams(25));
    let first = run(Arc::clone(&host), ScanConfig::default()).snapshot().unwrap();
    let second = run(host, ScanConfig::default()).snapshot().unwrap();

    assert_eq!(
        IndexReport::from_snapshot(&first).categories,
        IndexReport::from_snapshot(&second).categories
    );
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn test_completeness_and_reverse_consistency() {
    // Three levels below the root with a fan-out of four: 1 + 4 + 16 + 64.
    let mut model = MemoryModel::new();
    let root = model.add_root("Model");
    let mut level = vec![root];
    let mut all = vec![root];
    for depth in 1..=3 {
        let mut next = Vec::new();
        for parent in &level {
            for i in 0..4 {
                let child = model.add_child(*parent, format!("L{depth}-{i}")).unwrap();
                model.add_property(child, "Item", "Level", RawValue::Int32(depth)).unwrap();
                model
                    .add_property(child, "Item", "Ordinal", RawValue::Int64(i64::from(i)))
                    .unwrap();
                next.push(child);
            }
        }
        all.extend(&next);
        level = next;
    }

    let session = run(Arc::new(model), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.items_visited, 85);
    assert_eq!(snapshot.max_depth, 3);
    assert_eq!(snapshot.properties_seen, 168);

    let level_key = PropertyKey::new("Item", "Level");
    let levels: Vec<_> = snapshot.values(&level_key).into_iter().cloned().collect();
    assert_eq!(levels, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
    assert_eq!(snapshot.items(&level_key, &Value::Integer(3)).len(), 64);

    // Every child carries an ordinal, and each appears under exactly one value.
    let ordinal_key = PropertyKey::new("Item", "Ordinal");
    for item in all.iter().skip(1) {
        let hits = snapshot
            .values(&ordinal_key)
            .into_iter()
            .filter(|value| snapshot.index.contains_item(&ordinal_key, value, *item))
            .count();
        assert_eq!(hits, 1, "item {item}");
    }

    for (key, buckets) in snapshot.index.iter() {
        let forward: Vec<_> = snapshot.values(key);
        assert!(forward.windows(2).all(|pair| pair[0] < pair[1]), "{key} not sorted");
        for (value, items) in buckets {
            assert!(forward.contains(&value));
            assert!(!items.is_empty());
        }
    }
}

#[test]
fn test_dedup_across_many_items() {
    let session = run(Arc::new(beams(10)), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();

    assert_eq!(snapshot.values(&material()), vec![&Value::text("Steel")]);
    assert_eq!(snapshot.items(&material(), &Value::text("Steel")).len(), 10);
    assert_eq!(snapshot.values(&index_key()).len(), 10);
}

#[test]
fn test_deep_tree_does_not_overflow() {
    let mut model = MemoryModel::new();
    let mut parent = model.add_root("Level 0");
    for depth in 1..100_000u32 {
        parent = model.add_child(parent, format!("Level {depth}")).unwrap();
    }
    model
        .add_property(parent, "Item", "Leaf", RawValue::Boolean(true))
        .unwrap();

    let session = run(Arc::new(model), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.items_visited, 100_000);
    assert_eq!(snapshot.max_depth, 99_999);
    assert_eq!(
        snapshot.items(&PropertyKey::new("Item", "Leaf"), &Value::Boolean(true)),
        vec![parent]
    );
}

#[test]
fn test_cancel_keeps_partial_results() {
    // Reads: Site, Beam 0, Beam 1, then Beam 2 blocks at the gate.
    let (host, gate) = gated(beams(10), 3);
    let mut session = ScanSession::new();
    session.start(host, ScanConfig::default()).unwrap();

    gate.reached.recv().unwrap();
    assert_eq!(session.state(), ScanState::Running);
    assert!(session.snapshot().is_none());
    assert_eq!(session.with_snapshot(|s| s.items_visited), Some(3));

    session.cancel();
    gate.release.send(()).unwrap();
    assert_eq!(session.join(), ScanState::Cancelled);

    // Beam 2 was mid-read when the stop was requested and finishes atomically.
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.outcome, ScanOutcome::Cancelled);
    assert_eq!(snapshot.items_visited, 4);

    let indices: Vec<_> = snapshot.values(&index_key()).into_iter().cloned().collect();
    assert_eq!(
        indices,
        vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]
    );
    assert_eq!(
        snapshot.items(&material(), &Value::text("Steel")),
        vec![ItemId::new(1), ItemId::new(2), ItemId::new(3)]
    );
    assert!(snapshot.finished_at.is_some());
}

#[test]
fn test_second_start_while_running_is_rejected() {
    let (host, gate) = gated(beams(3), 1);
    let mut session = ScanSession::new();
    session.start(Arc::clone(&host), ScanConfig::default()).unwrap();

    gate.reached.recv().unwrap();
    let result = session.start(Arc::clone(&host), ScanConfig::default());
    assert!(matches!(result, Err(ScanError::AlreadyInProgress)));
    assert_eq!(session.state(), ScanState::Running);

    gate.release.send(()).unwrap();
    assert_eq!(session.join(), ScanState::Completed);
    assert_eq!(session.snapshot().unwrap().items_visited, 4);
}

#[test]
fn test_host_failure_keeps_partial_results() {
    let mut model = beams(10);
    model.fail_after(3);
    let session = run(Arc::new(model), ScanConfig::default());
    let snapshot = session.snapshot().unwrap();

    assert_eq!(session.state(), ScanState::Failed);
    assert_eq!(snapshot.items_visited, 3);
    assert_eq!(snapshot.values(&index_key()).len(), 2);
    assert_eq!(snapshot.failure(), Some("Document has been disposed"));
}

#[test]
fn test_previous_snapshot_survives_restart() {
    let mut session = ScanSession::new();
    let (mut model, a, _) = steel_pair();
    model.select(a).unwrap();
    let host = Arc::new(model);

    session.start(Arc::clone(&host), ScanConfig::default()).unwrap();
    session.join();
    let full = session.snapshot().unwrap();

    session.start(host, ScanConfig::new(ScanScope::Selection)).unwrap();
    session.join();
    let selection = session.snapshot().unwrap();

    assert_eq!(full.items_visited, 3);
    assert_eq!(selection.items_visited, 1);
    assert_eq!(full.items(&material(), &Value::text("Steel")).len(), 2);
}

#[test]
fn test_category_filter_and_depth_limit() {
    let mut model = beams(3);
    let beam = ItemId::new(1);
    let bolt = model.add_child(beam, "Bolt").unwrap();
    model
        .add_property(bolt, "Geometry", "Material", RawValue::DisplayString("Zinc".into()))
        .unwrap();

    let config = ScanConfig::builder()
        .max_depth(Some(1u32))
        .include_categories(vec!["Geo*".to_string()])
        .build()
        .unwrap();
    let session = run(Arc::new(model), config);
    let snapshot = session.snapshot().unwrap();

    assert_eq!(snapshot.items_visited, 4);
    assert!(snapshot.values(&index_key()).is_empty());
    assert_eq!(snapshot.values(&material()), vec![&Value::text("Steel")]);
}

#[tokio::test]
async fn test_progress_updates_and_async_wait() {
    let mut session = ScanSession::new();
    let mut progress_rx = session.subscribe();
    let config = ScanConfig::builder().progress_interval(2u64).build().unwrap();

    session.start(Arc::new(beams(10)), config).unwrap();
    assert_eq!(session.finished().await, ScanState::Completed);

    let mut updates = Vec::new();
    while let Ok(progress) = progress_rx.try_recv() {
        updates.push(progress);
    }

    // Every second item plus the final update.
    assert_eq!(updates.len(), 6);
    let last = updates.last().unwrap();
    assert_eq!(last.items_visited, 11);
    assert_eq!(last.properties_seen, 20);
    assert_eq!(last.distinct_keys, 2);
    assert!(updates.windows(2).all(|w| w[0].items_visited <= w[1].items_visited));
}

#[tokio::test]
async fn test_finished_when_idle_returns_immediately() {
    let session = ScanSession::new();
    assert_eq!(session.finished().await, ScanState::Idle);
}

#[tokio::test]
async fn test_host_panic_ends_scan_as_failed() {
    let mut session = ScanSession::new();
    let host = PanickingModel {
        inner: beams(10),
        panic_at: 3,
        reads: AtomicU64::new(0),
    };
    session.start(Arc::new(host), ScanConfig::default()).unwrap();

    let state = tokio::time::timeout(Duration::from_secs(10), session.finished())
        .await
        .expect("scan never left Running");
    assert_eq!(state, ScanState::Failed);

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.items_visited, 3);
    assert_eq!(snapshot.failure(), Some("scan worker panicked"));

    session.start(Arc::new(beams(2)), ScanConfig::default()).unwrap();
    assert_eq!(session.join(), ScanState::Completed);
    assert_eq!(session.snapshot().unwrap().items_visited, 3);
}
