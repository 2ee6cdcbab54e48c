//! Tests for ImportService and ImportJob against an in-memory store

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use iacreate::application::services::{ImportJob, ImportOutcome, ImportService, StopSignal};
use iacreate::application::ApplicationError;
use iacreate::config::Settings;
use iacreate::domain::{
    Cell, ChildOrderRule, ContentInstance, ContentNode, ContentRef, DomainError, PropertyValue,
};
use iacreate::infrastructure::store::MemoryContentStore;
use iacreate::infrastructure::traits::{
    ContentRepository, RowSource, SaveFlags, SourceError, StoreError, TypeRepository,
};
use iacreate::infrastructure::types::ConfiguredTypeRepository;
use iacreate::util::testing::init_test_setup;

/// Rows held in memory.
struct MemoryRowSource {
    path: PathBuf,
    rows: Option<Vec<Vec<Cell>>>,
}

impl MemoryRowSource {
    fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            path: PathBuf::from("memory.xlsx"),
            rows: Some(rows),
        }
    }

    fn missing() -> Self {
        Self {
            path: PathBuf::from("missing.xlsx"),
            rows: None,
        }
    }
}

impl RowSource for MemoryRowSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn exists(&self) -> bool {
        self.rows.is_some()
    }

    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, SourceError> {
        self.rows.clone().ok_or_else(|| SourceError::Open {
            path: self.path.clone(),
            message: "not found".to_string(),
        })
    }
}

/// Store wrapper counting calls; optionally triggers a stop after a number of saves.
struct RecordingStore {
    inner: MemoryContentStore,
    calls: AtomicUsize,
    saves: AtomicUsize,
    stop_after: Option<(usize, StopSignal)>,
}

impl RecordingStore {
    fn new(types: Arc<dyn TypeRepository>) -> Self {
        Self {
            inner: MemoryContentStore::new(types),
            calls: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            stop_after: None,
        }
    }

    fn stopping_after(types: Arc<dyn TypeRepository>, saves: usize, stop: StopSignal) -> Self {
        Self {
            stop_after: Some((saves, stop)),
            ..Self::new(types)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContentRepository for RecordingStore {
    fn get_default(&self, parent: ContentRef, type_id: u32) -> Result<ContentInstance, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_default(parent, type_id)
    }

    fn save(&self, instance: ContentInstance, flags: SaveFlags) -> Result<ContentRef, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reference = self.inner.save(instance, flags)?;
        let saves = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, stop)) = &self.stop_after {
            if saves == *limit {
                stop.stop();
            }
        }
        Ok(reference)
    }

    fn get(&self, reference: ContentRef) -> Option<ContentNode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(reference)
    }

    fn children(&self, reference: ContentRef) -> Vec<ContentNode> {
        self.inner.children(reference)
    }
}

fn types() -> Arc<dyn TypeRepository> {
    Arc::new(ConfiguredTypeRepository::new(&Settings::default().types))
}

fn row(type_name: &str, name: &str, level: f64, fields: &[&str]) -> Vec<Cell> {
    let mut cells = vec![Cell::from(type_name), Cell::from(name), Cell::from(level)];
    cells.extend(fields.iter().map(|f| Cell::from(*f)));
    cells
}

fn names(nodes: &[ContentNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

fn setup() -> (ImportService, Arc<RecordingStore>) {
    init_test_setup();
    let types = types();
    let store = Arc::new(RecordingStore::new(types.clone()));
    (ImportService::new(types, store.clone()), store)
}

#[test]
fn given_three_rows_when_executing_job_then_builds_tree_and_reports_count() {
    // Arrange
    let (service, store) = setup();
    let source = Arc::new(MemoryRowSource::new(vec![
        row("Page", "Home", 0.0, &[]),
        row("Page", "Child", 1.0, &["title:Welcome"]),
        row("Page", "Sibling", 1.0, &[]),
    ]));
    let job = ImportJob::new(service, source, ContentRef::START);

    // Act
    let summary = job.execute().unwrap();

    // Assert
    assert_eq!(summary, "3 items imported.");
    let top = store.children(ContentRef::START);
    assert_eq!(names(&top), vec!["Home"]);
    let home = &top[0];
    assert_eq!(home.child_order_rule, ChildOrderRule::Index);
    let children = store.children(home.reference);
    assert_eq!(names(&children), vec!["Child", "Sibling"]);
    assert_eq!(
        children[0].properties.get("title"),
        Some(&PropertyValue::Text("Welcome".to_string()))
    );
}

#[test]
fn given_missing_source_when_executing_job_then_no_file_and_store_untouched() {
    let (service, store) = setup();
    let job = ImportJob::new(service, Arc::new(MemoryRowSource::missing()), ContentRef::START);

    let summary = job.execute().unwrap();

    assert_eq!(summary, "No file found to process");
    assert_eq!(store.calls(), 0);
}

#[test]
fn given_stop_after_second_row_when_running_then_two_rows_persisted() {
    // Arrange
    init_test_setup();
    let types = types();
    let stop = StopSignal::new();
    let store = Arc::new(RecordingStore::stopping_after(types.clone(), 2, stop.clone()));
    let service = ImportService::new(types, store.clone());
    let rows: Vec<Vec<Cell>> = (0..5)
        .map(|i| row("Page", &format!("Page {}", i), 0.0, &[]))
        .collect();

    // Act
    let outcome = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &stop)
        .unwrap();

    // Assert
    assert_eq!(outcome, ImportOutcome::Stopped { imported: 2 });
    assert_eq!(outcome.to_string(), "Stop of job was called");
    assert_eq!(
        names(&store.children(ContentRef::START)),
        vec!["Page 0", "Page 1"]
    );
}

#[test]
fn given_stopped_job_when_executing_then_nothing_is_imported() {
    let (service, store) = setup();
    let source = Arc::new(MemoryRowSource::new(vec![row("Page", "Home", 0.0, &[])]));
    let job = ImportJob::new(service, source, ContentRef::START);
    let handle = job.stop_handle();

    std::thread::spawn(move || handle.stop()).join().unwrap();
    let summary = job.execute().unwrap();

    assert_eq!(summary, "Stop of job was called");
    assert!(store.children(ContentRef::START).is_empty());
}

#[test]
fn given_stop_called_on_job_when_executing_then_no_store_calls() {
    let (service, store) = setup();
    let source = Arc::new(MemoryRowSource::new(vec![
        row("Page", "Home", 0.0, &[]),
        row("Page", "About", 0.0, &[]),
    ]));
    let job = ImportJob::new(service, source, ContentRef::START);

    job.stop();
    let summary = job.execute().unwrap();

    assert_eq!(summary, "Stop of job was called");
    assert_eq!(store.calls(), 0);
    assert!(job.stop_handle().is_stopped());
}

#[test]
fn given_lower_level_when_running_then_ascends_one_level() {
    let (service, store) = setup();
    let rows = vec![
        row("Page", "A", 0.0, &[]),
        row("Page", "B", 1.0, &[]),
        row("Page", "C", 2.0, &[]),
        row("Page", "D", 1.0, &[]),
    ];

    let outcome = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap();

    assert_eq!(outcome.imported(), 4);
    let a = &store.children(ContentRef::START)[0];
    let under_a = store.children(a.reference);
    assert_eq!(names(&under_a), vec!["B", "D"]);
    assert_eq!(names(&store.children(under_a[0].reference)), vec!["C"]);
    // peer order is the running row counter
    assert_eq!(under_a[0].peer_order, Some(1));
    assert_eq!(under_a[1].peer_order, Some(3));
}

#[test]
fn given_drop_of_two_levels_when_running_then_still_ascends_only_one() {
    let (service, store) = setup();
    let rows = vec![
        row("Page", "A", 0.0, &[]),
        row("Page", "B", 1.0, &[]),
        row("Page", "C", 2.0, &[]),
        row("Page", "D", 3.0, &[]),
        row("Page", "E", 1.0, &[]),
    ];

    service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap();

    let a = &store.children(ContentRef::START)[0];
    let b = &store.children(a.reference)[0];
    assert_eq!(names(&store.children(b.reference)), vec!["C", "E"]);
}

#[test]
fn given_malformed_fields_when_running_then_row_is_still_created() {
    let (service, store) = setup();
    let rows = vec![row(
        "Article",
        "News",
        0.0,
        &["nocolon", "priority:high", "unknown:x", "priority:3", "body:line1\nline2"],
    )];

    let outcome = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Completed {
            imported: 1,
            field_failures: 3
        }
    );
    let news = &store.children(ContentRef::START)[0];
    assert_eq!(news.properties.get("priority"), Some(&PropertyValue::Number(3.0)));
    assert_eq!(
        news.properties.get("body"),
        Some(&PropertyValue::Text("line1<br />line2".to_string()))
    );
}

#[test]
fn given_padded_property_name_when_running_then_field_fails_and_blank_name_is_skipped() {
    let (service, store) = setup();
    let rows = vec![row("Page", "Home", 0.0, &[" title :Padded", "   :ignored", "title:Plain"])];

    let outcome = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Completed {
            imported: 1,
            field_failures: 1
        }
    );
    let home = &store.children(ContentRef::START)[0];
    assert_eq!(
        home.properties.get("title"),
        Some(&PropertyValue::Text("Plain".to_string()))
    );
}

#[test]
fn given_unknown_type_when_running_then_aborts_after_earlier_rows() {
    let (service, store) = setup();
    let rows = vec![
        row("Page", "Home", 0.0, &[]),
        row("Widget", "Gadget", 0.0, &[]),
        row("Page", "Never", 0.0, &[]),
    ];

    let err = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::UnknownType(ref t)) if t == "Widget"
    ));
    assert_eq!(names(&store.children(ContentRef::START)), vec!["Home"]);
}

#[test]
fn given_first_row_nested_when_running_then_malformed_row() {
    let (service, _store) = setup();
    let rows = vec![row("Page", "Orphan", 1.0, &[])];

    let err = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MalformedRow { row: 1, .. })
    ));
}

#[test]
fn given_blank_rows_when_running_then_they_are_skipped() {
    let (service, store) = setup();
    let rows = vec![
        row("Page", "Home", 0.0, &[]),
        vec![Cell::Empty, Cell::Text("  ".to_string())],
        Vec::new(),
        row("Page", "Child", 1.0, &[]),
    ];

    let outcome = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap();

    assert_eq!(outcome.imported(), 2);
    let home = &store.children(ContentRef::START)[0];
    assert_eq!(names(&store.children(home.reference)), vec!["Child"]);
}

#[test]
fn given_non_numeric_level_when_running_then_reports_row_number() {
    let (service, _store) = setup();
    let rows = vec![
        row("Page", "Home", 0.0, &[]),
        vec![Cell::from("Page"), Cell::from("Bad"), Cell::from("one")],
    ];

    let err = service
        .run(&MemoryRowSource::new(rows), ContentRef::START, &StopSignal::new())
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MalformedRow { row: 2, .. })
    ));
}

#[test]
fn given_unknown_root_when_running_then_store_error() {
    let (service, _store) = setup();
    let rows = vec![row("Page", "Home", 0.0, &[])];

    let err = service
        .run(&MemoryRowSource::new(rows), ContentRef(99), &StopSignal::new())
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Store(StoreError::NotFound(ContentRef(99)))
    ));
}

#[test]
fn given_custom_root_when_running_then_level_zero_rows_go_under_it() {
    let (service, store) = setup();
    service
        .run(
            &MemoryRowSource::new(vec![row("Page", "Section", 0.0, &[])]),
            ContentRef::START,
            &StopSignal::new(),
        )
        .unwrap();
    let section = store.children(ContentRef::START)[0].reference;

    service
        .run(
            &MemoryRowSource::new(vec![
                row("Page", "One", 0.0, &[]),
                row("Page", "Two", 0.0, &[]),
            ]),
            section,
            &StopSignal::new(),
        )
        .unwrap();

    assert_eq!(names(&store.children(section)), vec!["One", "Two"]);
}
