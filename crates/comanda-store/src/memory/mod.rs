mod aggregate;
mod collection;
mod store;

pub use store::MemoryStore;
