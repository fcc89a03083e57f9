//! Mapsmith Catalog
//!
//! External-collaborator seams: schema introspection behind the
//! `CatalogAdapter` trait, a per-run schema cache, and the caller-owned
//! `MappingStore` key-value seam. The engine never performs I/O itself;
//! everything async lives here.

pub mod adapter;
pub mod cache;
pub mod mock;
pub mod snapshot;
pub mod store;

pub use adapter::{CatalogAdapter, FetchError, TableIdentifier};
pub use cache::CachingAdapter;
pub use mock::MockAdapter;
pub use snapshot::{CatalogSnapshot, SnapshotAdapter};
pub use store::{MappingStore, MemoryStore, StoreError};
