//! Store Module
//!
//! The open-store session and the operations users run against it.
//!
//! ## Responsibilities
//! - Create, open and remove store files
//! - Put, get, delete and list entries
//! - Report the space map and verify allocation consistency
//!
//! ## Data Flow
//! ```text
//!   open ──► Header ──► Layout
//!                │
//!                ├──► Bitmap (in memory) ◄──┐
//!                └──► EntryTable (in memory)┤ mutate, then persist
//!                                           │ touched regions
//!   put / delete ───────────────────────────┘
//! ```

mod listing;
mod manager;
mod space_map;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::Result;

pub use listing::{Entries, EntryInfo};
pub use manager::{Store, StoreStats};
pub use space_map::{Region, RegionKind, SpaceMap};

/// Delete a whole store file
pub fn remove_store(path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    info!(path = %path.display(), "Removed store");
    Ok(())
}
