pub mod code;
pub mod error;
pub mod store;
pub mod sweep;

pub use error::StoreError;
pub use store::{ClipSnapshot, Mutation, Store, StoreConfig};
