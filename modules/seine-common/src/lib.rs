pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::Config;
pub use error::{SeineError, StoreError};
pub use types::*;
