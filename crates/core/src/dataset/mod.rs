//! Recipe dataset: the immutable in-memory store, the JSON layouts it can be
//! loaded from, and the locations it can be fetched from.

pub mod loader;
pub mod source;
pub mod store;

pub use loader::parse_dataset;
pub use source::{load, DatasetSource};
pub use store::DatasetStore;
