pub mod checkpoint;
pub mod react;
pub mod types;

pub use checkpoint::SessionStore;
pub use react::{GraphRun, ReactGraph, ReactGraphConfig};
pub use types::GraphState;
