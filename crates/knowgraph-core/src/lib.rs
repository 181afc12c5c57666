pub mod config;
pub mod error;
pub mod types;

pub use config::KnowgraphConfig;
pub use error::{KnowgraphError, Result};
pub use types::*;
