pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod ids;
pub mod model;

pub use config::{Config, ParsedConfig, PrivateBlocks};
pub use error::CrawlError;
pub use model::*;
