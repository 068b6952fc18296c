use std::path::Path;
use std::sync::Arc;

use course_core::model::{CourseCatalog, VideoKey};
use storage::repository::{Storage, StorageKind};

use crate::Clock;
use crate::config::PlaybackConfig;
use crate::course_listing::CourseListingService;
use crate::error::AppServicesError;
use crate::player::PlayerAdapter;
use crate::progress_store::ProgressStore;

/// Assembles the app-facing services around one progress store.
#[derive(Clone)]
pub struct AppServices {
    storage_kind: StorageKind,
    config: PlaybackConfig,
    progress: Arc<ProgressStore>,
    listings: Arc<CourseListingService>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        storage: &Storage,
        catalog: CourseCatalog,
        clock: Clock,
        config: PlaybackConfig,
    ) -> Self {
        let progress = Arc::new(ProgressStore::new(storage, Arc::new(catalog), clock));
        let listings = Arc::new(CourseListingService::new(Arc::clone(&progress)));
        Self {
            storage_kind: storage.kind(),
            config,
            progress,
            listings,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: CourseCatalog,
        clock: Clock,
        config: PlaybackConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, catalog, clock, config))
    }

    /// Like [`AppServices::new_sqlite`], but falls back to the null backend
    /// when the database cannot be opened.
    pub async fn sqlite_or_null(
        db_url: &str,
        catalog: CourseCatalog,
        clock: Clock,
        config: PlaybackConfig,
    ) -> Self {
        let storage = match Storage::sqlite(db_url).await {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!(
                    db_url,
                    error = %err,
                    "persistent storage unavailable; progress will not be saved"
                );
                Storage::null()
            }
        };
        Self::new(&storage, catalog, clock, config)
    }

    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage_kind
    }

    #[must_use]
    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn listings(&self) -> Arc<CourseListingService> {
        Arc::clone(&self.listings)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CourseCatalog> {
        self.progress.catalog_handle()
    }

    pub async fn open_player(&self, video: VideoKey) -> PlayerAdapter {
        PlayerAdapter::open(self.progress(), self.config, video).await
    }
}

/// Reads a catalog JSON file.
///
/// # Errors
///
/// Returns `AppServicesError::CatalogFile` if the file cannot be read and
/// `AppServicesError::Catalog` if its contents are invalid.
pub fn load_catalog(path: &Path) -> Result<CourseCatalog, AppServicesError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AppServicesError::CatalogFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(CourseCatalog::from_json(&raw)?)
}
