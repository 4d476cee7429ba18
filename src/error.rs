//! Error types for flatvfs
//!
//! Provides a unified error type for all store operations.

use thiserror::Error;

/// Result type alias using VfsError
pub type Result<T> = std::result::Result<T, VfsError>;

/// Unified error type for flatvfs operations
///
/// Every error is terminal for the operation that raised it. The CLI is the
/// only place that turns one into a process exit code.
#[derive(Debug, Error)]
pub enum VfsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Invalid store format: {0}")]
    Format(String),

    #[error("Store corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Entry Errors
    // -------------------------------------------------------------------------
    #[error("Invalid entry name {name:?}: length must be between 1 and {max} bytes without NUL")]
    InvalidName { name: String, max: usize },

    #[error("Entry already exists: {0}")]
    DuplicateName(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Entry table is full")]
    TableFull,

    #[error("Not enough free blocks in store")]
    OutOfSpace,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
