mod document;
mod error;
pub mod filter;
mod pipeline;
mod projection;
mod store;
pub mod update;

pub use document::{IdKey, compare_values, get_path, values_eq};
pub use error::StoreError;
pub use pipeline::{ArrayOp, Stage};
pub use projection::apply_projection;
pub use store::{CollectionConfig, DeleteResult, DocumentStore, UpdateResult};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

#[cfg(feature = "mongodb")]
mod mongo;

#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
