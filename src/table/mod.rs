//! Entry Table Module
//!
//! Fixed array of entry slots, one per data block.
//!
//! ## Responsibilities
//! - Lookup by name (linear scan, first match)
//! - First-free slot reservation
//! - Single-slot persistence at a fixed offset
//!
//! A slot whose name is empty is free. Names are unique among live slots.

mod entry;
mod entry_table;

pub use entry::{validate_name, Entry};
pub use entry_table::EntryTable;
