pub mod config;
pub mod error;
pub mod fleet;
pub mod history;
pub mod job;
pub mod lifecycle;
pub mod position;
pub mod records;
pub mod rotation;
pub mod service;
pub mod tpi;
pub mod tyre;
pub mod utils;
pub mod vehicle;
