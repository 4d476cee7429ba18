//! # flatvfs
//!
//! A single-file virtual block store with:
//! - A flat namespace of named entries
//! - A bitmap block allocator
//! - A fixed entry table with direct block pointers
//! - A space map report of free and used regions
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (flatvfs)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Store (session)                        │
//! │         put / get / delete / list / space_map / check       │
//! └──────────┬──────────────────┬──────────────────┬────────────┘
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!     ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Bitmap    │   │  EntryTable  │   │    Layout    │
//!     │ (allocator) │   │   (inodes)   │   │ (addressing) │
//!     └──────┬──────┘   └──────┬───────┘   └──────────────┘
//!            │                 │
//!            ▼                 ▼
//!     ┌───────────────────────────────┐
//!     │  BlockDevice (file / memory)  │
//!     └───────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod device;
pub mod bitmap;
pub mod table;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VfsError, Result};
pub use config::Config;
pub use device::{BlockDevice, MemDevice};
pub use store::{remove_store, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatvfs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
