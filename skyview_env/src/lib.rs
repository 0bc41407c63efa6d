//! SkyView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" boundary that lets the SkyView viewer
//! and catalog run against either **Production** services (tokio clock,
//! embedded sled database) or **Simulation** doubles (virtual clock,
//! in-memory stores).
//!
//! # What Gets Intercepted
//!
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Task scheduling (`spawn()`)
//! - Blob storage (`FileStore`)
//! - Key-value metadata (`MetadataStore`)
//!
//! # Example
//!
//! ```ignore
//! use skyview_env::{ViewerContext, FileStore};
//!
//! async fn archive<Ctx: ViewerContext, F: FileStore>(ctx: &Ctx, files: &F, body: Vec<u8>) {
//!     let key = format!("upload-{}.json", ctx.now().as_millis());
//!     files.put(&key, body, "application/json").await.ok();
//! }
//! ```

mod context;
mod error;
mod memory;
mod sled_impl;
mod store;
mod tokio_impl;
mod types;

pub use context::ViewerContext;
pub use error::EnvError;
pub use memory::{InMemoryFileStore, InMemoryMetadataStore};
pub use sled_impl::SledStore;
pub use store::{FileStore, MetadataStore};
pub use tokio_impl::TokioContext;
pub use types::{ListPage, StoredObject};
