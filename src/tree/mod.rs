pub mod selector;
pub mod snapshot;
pub mod types;
pub mod walker;
