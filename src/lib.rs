pub mod cache;
pub mod config;
pub mod enrich;
pub mod error;
pub mod logging;
pub mod platform;
pub mod processor;

pub use error::{CfEnricherError, Result};
pub use processor::CfAttributesProcessor;
