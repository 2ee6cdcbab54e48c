//! Import driver
//!
//! Reads all rows of a source, places each one in the tree and materializes it, strictly in
//! row order. A stop request is honoured between rows.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::services::materializer::ContentMaterializer;
use crate::application::ApplicationResult;
use crate::domain::{ContentRef, RowRecord, TreeBuilder, TreeCursor};
use crate::infrastructure::traits::{ContentRepository, RowSource, TypeRepository};

/// Cooperative stop flag, shared between the job and whoever wants to stop it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; takes effect at the next row boundary.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an import run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The source does not exist
    NoFile,
    /// Stop was requested; `imported` rows were persisted before it
    Stopped { imported: usize },
    Completed {
        imported: usize,
        field_failures: usize,
    },
}

impl ImportOutcome {
    pub fn imported(&self) -> usize {
        match self {
            ImportOutcome::NoFile => 0,
            ImportOutcome::Stopped { imported } | ImportOutcome::Completed { imported, .. } => {
                *imported
            }
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::NoFile => f.write_str("No file found to process"),
            ImportOutcome::Stopped { .. } => f.write_str("Stop of job was called"),
            ImportOutcome::Completed { imported, .. } => write!(f, "{} items imported.", imported),
        }
    }
}

/// Service running imports against a type registry and a content store.
pub struct ImportService {
    store: Arc<dyn ContentRepository>,
    materializer: ContentMaterializer,
}

impl ImportService {
    pub fn new(types: Arc<dyn TypeRepository>, store: Arc<dyn ContentRepository>) -> Self {
        let materializer = ContentMaterializer::new(types, store.clone());
        Self {
            store,
            materializer,
        }
    }

    /// Import every row of `source` below `root`.
    ///
    /// A missing source is not an error. Any row that cannot be decoded, placed or created
    /// aborts the run; rows persisted before it stay in the store.
    #[instrument(skip(self, source, stop), fields(source = %source.location().display(), root = %root))]
    pub fn run(
        &self,
        source: &dyn RowSource,
        root: ContentRef,
        stop: &StopSignal,
    ) -> ApplicationResult<ImportOutcome> {
        if !source.exists() {
            warn!("source not found: {}", source.location().display());
            return Ok(ImportOutcome::NoFile);
        }

        let rows = source.read_rows()?;
        info!("read {} rows", rows.len());

        let mut builder = TreeBuilder::new(root);
        let mut cursor = TreeCursor::start();
        let mut imported = 0;
        let mut field_failures = 0;

        for (index, cells) in rows.iter().enumerate() {
            if stop.is_stopped() {
                info!("stop requested after {} rows", imported);
                return Ok(ImportOutcome::Stopped { imported });
            }
            let row = index + 1;
            if cells.iter().all(|c| c.is_blank()) {
                debug!("row {}: blank, skipped", row);
                continue;
            }

            let record = RowRecord::decode(row, cells)?;
            let placed = builder.place(&cursor, record, &*self.store)?;
            let created = self.materializer.materialize(&placed)?;

            cursor = cursor.advance(&placed, created.reference);
            imported += 1;
            field_failures += created.field_failures;
        }

        if stop.is_stopped() {
            info!("stop requested after {} rows", imported);
            return Ok(ImportOutcome::Stopped { imported });
        }

        if field_failures > 0 {
            warn!("{} fields could not be assigned", field_failures);
        }
        info!("imported {} items", imported);
        Ok(ImportOutcome::Completed {
            imported,
            field_failures,
        })
    }
}

/// One scheduled import: a source, the node to import under and a stop flag.
pub struct ImportJob {
    service: ImportService,
    source: Arc<dyn RowSource>,
    root: ContentRef,
    stop: StopSignal,
}

impl ImportJob {
    pub fn new(service: ImportService, source: Arc<dyn RowSource>, root: ContentRef) -> Self {
        Self {
            service,
            source,
            root,
            stop: StopSignal::new(),
        }
    }

    /// Ask the running job to stop at the next row boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle for stopping the job from another thread.
    pub fn stop_handle(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn run(&self) -> ApplicationResult<ImportOutcome> {
        self.service.run(self.source.as_ref(), self.root, &self.stop)
    }

    /// Run and return the summary line.
    pub fn execute(&self) -> ApplicationResult<String> {
        let summary = self.run()?.to_string();
        info!("{}", summary);
        Ok(summary)
    }
}
