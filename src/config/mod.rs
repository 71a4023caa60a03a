//! Configuration management module

pub mod env;
pub mod parser;

// Re-export main functionality
pub use env::EnvManager;
pub use parser::{display_client_summary, ConfigParser};

// Re-export from models for convenience
pub use crate::models::{ClientConfig, LogSettings, ServerConfig};
