//! Coursework Common Library
//!
//! Shared types, persistence and collaborators for tracking assignments
//! through release, fetch and submission.

pub mod db;
pub mod error;
pub mod exchange;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use db::Database;
pub use error::{Error, Result};
pub use exchange::{Exchange, FilesystemExchange};
pub use types::*;
pub use validator::{NotebookValidator, Validator};

/// Coursework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".coursework")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
