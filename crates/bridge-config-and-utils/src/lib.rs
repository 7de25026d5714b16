//! Configuration, paths, logging and core errors shared by the rating bridge binaries.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_PEER_IDENTITY, DEFAULT_SERVICE_NAME};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level, LogFileWriter};
pub use paths::Paths;
