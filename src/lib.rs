pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{HandbookError, Result};
