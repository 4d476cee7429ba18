//! Entry listing
//!
//! Lazy iteration over live entries in slot order.

use crate::table::EntryTable;

/// Name and size of one live entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Slot index in the entry table
    pub slot: usize,
    pub name: String,
    pub size: u32,
}

/// Iterator over live entries, in entry-table slot order
///
/// Borrowing the store keeps it from changing underneath the listing.
/// Call `Store::list` again to restart.
pub struct Entries<'a> {
    table: &'a EntryTable,
    next: usize,
}

impl<'a> Entries<'a> {
    pub(super) fn new(table: &'a EntryTable) -> Self {
        Self { table, next: 0 }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = EntryInfo;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(entry) = self.table.get(self.next) {
            let slot = self.next;
            self.next += 1;

            if !entry.is_free() {
                return Some(EntryInfo {
                    slot,
                    name: entry.name().into_owned(),
                    size: entry.size(),
                });
            }
        }
        None
    }
}
