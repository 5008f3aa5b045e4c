pub mod error;
pub mod manager;
pub mod store;
pub mod types;

pub use error::A2AError;
pub use manager::{StreamItem, TaskManager};
pub use store::TaskStore;
pub use types::*;
