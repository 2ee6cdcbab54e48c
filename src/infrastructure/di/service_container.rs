//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::application::services::{ImportJob, ImportService};
use crate::config::Settings;
use crate::domain::ContentRef;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::store::MemoryContentStore;
use crate::infrastructure::traits::{ContentRepository, RowSource, TypeRepository};
use crate::infrastructure::types::ConfiguredTypeRepository;
use crate::infrastructure::xlsx::XlsxRowSource;

/// Container holding the type registry and the content store built from the settings.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Content types from `[types.*]`
    pub types: Arc<dyn TypeRepository>,

    /// Content tree
    pub store: Arc<MemoryContentStore>,
}

impl ServiceContainer {
    /// Create a container whose store is loaded from `settings.store_path()`.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let types: Arc<dyn TypeRepository> = Arc::new(ConfiguredTypeRepository::new(&settings.types));
        let store = MemoryContentStore::open(&settings.store_path(), types.clone())?;
        Ok(Self::with_deps(settings, types, Arc::new(store)))
    }

    /// Create a container with an empty store that is never written.
    pub fn scratch(settings: Settings) -> Self {
        let types: Arc<dyn TypeRepository> = Arc::new(ConfiguredTypeRepository::new(&settings.types));
        let store = Arc::new(MemoryContentStore::new(types.clone()));
        Self::with_deps(settings, types, store)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        types: Arc<dyn TypeRepository>,
        store: Arc<MemoryContentStore>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            types,
            store,
        }
    }

    pub fn import_service(&self) -> ImportService {
        let store: Arc<dyn ContentRepository> = self.store.clone();
        ImportService::new(self.types.clone(), store)
    }

    /// Job importing the spreadsheet at `source` below `root`.
    pub fn import_job(&self, source: &Path, root: ContentRef) -> ImportJob {
        debug!("import job: source={} root={}", source.display(), root);
        let source: Arc<dyn RowSource> = Arc::new(XlsxRowSource::new(source));
        ImportJob::new(self.import_service(), source, root)
    }

    /// Job for the configured source and parent.
    pub fn configured_job(&self) -> ImportJob {
        self.import_job(&self.settings.source_path(), self.settings.parent_ref())
    }

    /// Write the store to `settings.store_path()`.
    pub fn save_store(&self) -> InfraResult<()> {
        let path = self.settings.store_path();
        debug!("saving store to {}", path.display());
        self.store.save_to(&path)
    }
}
