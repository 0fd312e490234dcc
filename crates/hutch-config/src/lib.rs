//! Configuration, filesystem layout, and logging setup for the Hutch
//! telemetry client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_API_BASE, DEFAULT_IMPLICIT_START_EVENT, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
