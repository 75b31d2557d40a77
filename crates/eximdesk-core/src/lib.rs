//! EximDesk Core — shared error taxonomy and configuration.

pub mod config;
pub mod error;
pub mod source;

pub use config::{DataPaths, EximDeskConfig};
pub use error::{Error, Result};
pub use source::Source;
