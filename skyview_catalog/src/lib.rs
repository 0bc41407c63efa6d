//! SkyView submission catalog
//!
//! Stores uploaded simulation logs and serves them back to the gallery and
//! the 3D viewer. The catalog is a typed service; transport (HTTP, CLI) sits
//! on top of it.
//!
//! # Storage layout
//!
//! ```text
//! FileStore      sub-20240305070809.json       raw log bytes
//! MetadataStore  sub-20240305070809_metadata   SubmissionMetadata (JSON)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use skyview_catalog::{Catalog, Upload};
//! use skyview_env::{InMemoryFileStore, InMemoryMetadataStore, TokioContext};
//!
//! let catalog = Catalog::new(
//!     Arc::new(InMemoryFileStore::new()),
//!     Arc::new(InMemoryMetadataStore::new()),
//!     TokioContext::shared(),
//! );
//! let receipt = catalog.create(Upload::new("run.json", bytes)).await?;
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod query;
pub mod service;
pub mod validation;

pub use config::CatalogConfig;
pub use error::CatalogError;
pub use model::{
    StatusReport, Submission, SubmissionData, SubmissionFile, SubmissionMetadata, SubmissionMetrics,
    SubmissionReceipt, SubmissionStatus, SubmissionSummary, Upload,
};
pub use query::{GalleryQuery, GallerySort};
pub use service::Catalog;
