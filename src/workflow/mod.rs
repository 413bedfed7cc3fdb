pub mod engine;
pub mod integration;
pub mod journal;
pub mod result;
pub mod step;
