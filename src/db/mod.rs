//! Persistence layer
//!
//! Schemas, the MongoDB wrapper and the [`CivicStore`] seam with its
//! MongoDB and in-memory implementations.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoClient;
pub use mongo_store::MongoStore;
pub use store::CivicStore;
