mod pipeline;
mod store;

pub use store::MongoStore;
