//! Shared error types for the services crate.
//!
//! Progress reads and writes never fail; only bootstrap does.

use thiserror::Error;

use course_core::model::CatalogError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to read catalog {path}: {source}")]
    CatalogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
