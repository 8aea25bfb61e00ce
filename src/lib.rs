pub mod api;
pub mod archive;
pub mod cli;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod readers;
pub mod source;
pub mod store;
pub mod utils;

pub use error::{ComputationError, ConfigError, FetchError, ProcessingError, Result, StoreError};
