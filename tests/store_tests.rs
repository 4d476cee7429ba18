//! Tests for Store
//!
//! These tests verify:
//! - Put/get round trips across block boundaries
//! - Name and size validation
//! - Entry table exhaustion and block exhaustion
//! - Partial write policies
//! - Deletion and block reuse
//! - Listing, space map and consistency checks

use std::cell::Cell;
use std::io;
use std::rc::Rc;

use flatvfs::config::{Config, PartialWritePolicy};
use flatvfs::layout::{BLOCK_SIZE, MAX_ENTRY_SIZE};
use flatvfs::store::{RegionKind, Store};
use flatvfs::{BlockDevice, MemDevice, Result, VfsError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_mem_store(blocks: u64) -> Store<MemDevice> {
    Store::format(MemDevice::new(), blocks * BLOCK_SIZE, Config::default()).unwrap()
}

fn setup_mem_store_with(blocks: u64, config: Config) -> Store<MemDevice> {
    Store::format(MemDevice::new(), blocks * BLOCK_SIZE, config).unwrap()
}

fn reopen(store: Store<MemDevice>) -> Store<MemDevice> {
    let config = *store.config();
    Store::mount(store.into_device(), config).unwrap()
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// MemDevice whose writes fail while they overlap an armed byte range
struct FlakyDevice {
    inner: MemDevice,
    fail_writes: Rc<Cell<Option<(u64, u64)>>>,
}

impl BlockDevice for FlakyDevice {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.read_at(offset, buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        if let Some((start, end)) = self.fail_writes.get() {
            if offset < end && offset + buf.len() as u64 > start {
                return Err(io::Error::new(io::ErrorKind::Other, "injected write failure").into());
            }
        }
        self.inner.write_at(offset, buf)
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.inner.set_len(len)
    }

    fn len(&mut self) -> Result<u64> {
        self.inner.len()
    }

    fn sync(&mut self) -> Result<()> {
        self.inner.sync()
    }
}

fn setup_flaky_store(blocks: u64) -> (Store<FlakyDevice>, Rc<Cell<Option<(u64, u64)>>>) {
    let fail_writes = Rc::new(Cell::new(None));
    let device = FlakyDevice {
        inner: MemDevice::new(),
        fail_writes: Rc::clone(&fail_writes),
    };
    let store = Store::format(device, blocks * BLOCK_SIZE, Config::default()).unwrap();
    (store, fail_writes)
}

fn pointers_of(store: &Store<MemDevice>, slot: usize) -> Vec<u32> {
    store.table().get(slot).unwrap().pointers().collect()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_sizes() {
    let mut store = setup_mem_store(64);
    let sizes = [0usize, 1, 4095, 4096, 4097, 5000, MAX_ENTRY_SIZE as usize];

    for (i, &size) in sizes.iter().enumerate() {
        let name = format!("file{}", i);
        let data = pattern(size, i as u8);
        store.put(&name, &data).unwrap();
        assert_eq!(store.read(&name).unwrap(), data, "size {}", size);
    }

    store.check().unwrap();
}

#[test]
fn test_round_trip_survives_reopen() {
    let mut store = setup_mem_store(16);
    let data = pattern(9000, 7);
    store.put("data.bin", &data).unwrap();

    let mut store = reopen(store);

    assert_eq!(store.read("data.bin").unwrap(), data);
    store.check().unwrap();
}

#[test]
fn test_get_into_sink_returns_size() {
    let mut store = setup_mem_store(4);
    store.put("a", b"hello world").unwrap();

    let mut sink = Vec::new();
    let n = store.get("a", &mut sink).unwrap();

    assert_eq!(n, 11);
    assert_eq!(sink, b"hello world");
}

#[test]
fn test_empty_entry_uses_no_blocks() {
    let mut store = setup_mem_store(4);
    let slot = store.put("empty", b"").unwrap();

    assert!(pointers_of(&store, slot).is_empty());
    assert_eq!(store.stats().used_blocks, 0);
    assert!(store.read("empty").unwrap().is_empty());
}

#[test]
fn test_put_from_short_reader_records_actual_size() {
    let mut store = setup_mem_store(4);
    let data = pattern(3000, 1);

    store.put_from("short", &data[..], 5000).unwrap();

    let listed: Vec<_> = store.list().collect();
    assert_eq!(listed[0].size, 3000);
    assert_eq!(store.read("short").unwrap(), data);
    store.check().unwrap();
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_invalid_names() {
    let mut store = setup_mem_store(4);

    assert!(matches!(store.put("", b"x"), Err(VfsError::InvalidName { .. })));
    assert!(matches!(
        store.put("sixteen-chars.xy", b"x"),
        Err(VfsError::InvalidName { .. })
    ));
    assert!(store.put("fifteen-chars.x", b"x").is_ok());
    assert_eq!(store.stats().entries, 1);
}

#[test]
fn test_duplicate_name_keeps_original() {
    let mut store = setup_mem_store(4);
    store.put("a", b"one").unwrap();

    let result = store.put("a", b"two");

    assert!(matches!(result, Err(VfsError::DuplicateName(_))));
    assert_eq!(store.read("a").unwrap(), b"one");
    assert_eq!(store.stats().used_blocks, 1);
}

#[test]
fn test_capacity_boundary() {
    let mut store = setup_mem_store(40);
    let before = store.stats();

    let too_big = vec![0u8; MAX_ENTRY_SIZE as usize + 1];
    assert!(matches!(
        store.put("big", &too_big),
        Err(VfsError::FileTooLarge { .. })
    ));
    assert_eq!(store.stats(), before);

    let max = pattern(MAX_ENTRY_SIZE as usize, 3);
    store.put("max", &max).unwrap();
    assert_eq!(store.stats().used_blocks, 32);
    assert_eq!(store.read("max").unwrap(), max);
}

#[test]
fn test_missing_entry() {
    let mut store = setup_mem_store(4);

    assert!(matches!(store.read("nope"), Err(VfsError::NotFound(_))));
    assert!(matches!(store.delete("nope"), Err(VfsError::NotFound(_))));
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_table_full() {
    let mut store = setup_mem_store(2);
    store.put("a", b"").unwrap();
    store.put("b", b"").unwrap();

    assert!(matches!(store.put("c", b""), Err(VfsError::TableFull)));
}

#[test]
fn test_out_of_space_rolls_back() {
    let mut store = setup_mem_store(3);
    store.put("a", b"x").unwrap();

    let result = store.put("b", &pattern(3 * 4096, 0));

    assert!(matches!(result, Err(VfsError::OutOfSpace)));
    assert_eq!(store.stats().used_blocks, 1);
    assert!(matches!(store.read("b"), Err(VfsError::NotFound(_))));
    store.check().unwrap();

    // The freed blocks are usable again, also after reopening
    let mut store = reopen(store);
    store.check().unwrap();
    store.put("c", &pattern(2 * 4096, 1)).unwrap();
    assert_eq!(store.stats().free_blocks, 0);
}

#[test]
fn test_out_of_space_keep_allocated_leaks_blocks() {
    let config = Config::builder()
        .partial_write_policy(PartialWritePolicy::KeepAllocated)
        .build();
    let mut store = setup_mem_store_with(3, config);
    store.put("a", b"x").unwrap();

    let result = store.put("b", &pattern(3 * 4096, 0));

    assert!(matches!(result, Err(VfsError::OutOfSpace)));
    assert_eq!(store.stats().used_blocks, 3);
    assert_eq!(store.stats().entries, 1);
    assert!(matches!(store.check(), Err(VfsError::Corruption(_))));

    let store = reopen(store);
    assert_eq!(store.stats().used_blocks, 3);
    assert_eq!(store.list().count(), 1);
}

#[test]
fn test_out_of_space_frees_the_reserved_slot() {
    let mut store = setup_mem_store(2);

    assert!(matches!(
        store.put("big", &pattern(3 * 4096, 0)),
        Err(VfsError::OutOfSpace)
    ));

    // Slot 0 is free again and gets reused
    assert_eq!(store.put("small", b"ok").unwrap(), 0);
}

// =============================================================================
// Failed Write Tests
// =============================================================================

#[test]
fn test_data_write_error_rolls_back_put() {
    let (mut store, fail_writes) = setup_flaky_store(8);
    store.put("a", b"x").unwrap();
    let before = store.stats();

    let layout = *store.layout();
    fail_writes.set(Some((layout.data_offset(), layout.total_size())));

    let result = store.put("b", &pattern(3 * 4096, 2));

    assert!(matches!(result, Err(VfsError::Io(_))));
    assert_eq!(store.stats(), before);
    assert!(matches!(store.read("b"), Err(VfsError::NotFound(_))));
    store.check().unwrap();

    // Nothing leaked to disk either
    fail_writes.set(None);
    let store = Store::mount(store.into_device(), Config::default()).unwrap();
    assert_eq!(store.stats(), before);
    store.check().unwrap();
}

#[test]
fn test_entry_slot_write_error_rolls_back_put() {
    let (mut store, fail_writes) = setup_flaky_store(8);
    store.put("a", b"x").unwrap();
    let before = store.stats();

    let layout = *store.layout();
    fail_writes.set(Some((layout.entry_table_offset(), layout.data_offset())));

    let result = store.put("b", &pattern(2 * 4096, 2));

    assert!(matches!(result, Err(VfsError::Io(_))));
    assert_eq!(store.stats(), before);
    assert_eq!(store.list().count(), 1);
    store.check().unwrap();

    // The session stays usable once the device recovers
    fail_writes.set(None);
    store.put("c", &pattern(100, 3)).unwrap();
    store.check().unwrap();
}

#[test]
fn test_out_of_space_rollback_survives_slot_write_error() {
    let (mut store, fail_writes) = setup_flaky_store(3);
    let layout = *store.layout();
    fail_writes.set(Some((layout.entry_table_offset(), layout.data_offset())));

    let result = store.put("big", &pattern(4 * 4096, 0));

    assert!(matches!(result, Err(VfsError::OutOfSpace)));
    assert_eq!(store.stats().used_blocks, 0);
    assert_eq!(store.stats().entries, 0);
    store.check().unwrap();
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_frees_blocks_for_reuse() {
    let mut store = setup_mem_store(8);
    let slot_a = store.put("a", &pattern(5000, 1)).unwrap();
    store.put("b", &pattern(100, 2)).unwrap();
    let freed = pointers_of(&store, slot_a);

    store.delete("a").unwrap();
    assert_eq!(store.stats().used_blocks, 1);

    let slot_c = store.put("c", &pattern(6000, 3)).unwrap();

    assert_eq!(slot_c, slot_a);
    assert_eq!(pointers_of(&store, slot_c), freed);
    assert_eq!(store.read("b").unwrap(), pattern(100, 2));
    store.check().unwrap();
}

#[test]
fn test_delete_persists() {
    let mut store = setup_mem_store(4);
    store.put("a", b"data").unwrap();
    store.delete("a").unwrap();

    let store = reopen(store);

    assert_eq!(store.list().count(), 0);
    assert_eq!(store.stats().used_blocks, 0);
}

#[test]
fn test_allocation_invariant_over_mixed_operations() {
    let mut store = setup_mem_store(20);

    for round in 0..5u8 {
        for i in 0..4u8 {
            let name = format!("r{}-{}", round, i);
            let size = (i as usize + 1) * 3000 + round as usize;
            store.put(&name, &pattern(size, i)).unwrap();
            store.check().unwrap();
        }
        for i in (0..4u8).step_by(2) {
            store.delete(&format!("r{}-{}", round, i)).unwrap();
            store.check().unwrap();
        }
        for i in (1..4u8).step_by(2) {
            store.delete(&format!("r{}-{}", round, i)).unwrap();
        }
    }

    assert_eq!(store.stats().used_blocks, 0);
    store.check().unwrap();
}

// =============================================================================
// Listing and Space Map Tests
// =============================================================================

#[test]
fn test_list_follows_slot_order() {
    let mut store = setup_mem_store(8);
    store.put("zeta", b"1").unwrap();
    store.put("alpha", b"22").unwrap();
    store.put("mid", b"333").unwrap();
    store.delete("zeta").unwrap();
    store.put("new", b"4444").unwrap();

    let names: Vec<_> = store.list().map(|e| (e.name, e.size)).collect();

    assert_eq!(
        names,
        vec![
            ("new".to_string(), 4),
            ("alpha".to_string(), 2),
            ("mid".to_string(), 3)
        ]
    );

    // Restartable
    assert_eq!(store.list().count(), 3);
}

#[test]
fn test_space_map_fixed_regions() {
    let store = setup_mem_store(10);
    let map = store.space_map();
    let regions = map.regions();

    assert_eq!(regions[0].kind, RegionKind::Header);
    assert_eq!((regions[0].offset, regions[0].size), (0, 8));
    assert_eq!(regions[1].kind, RegionKind::Bitmap);
    assert_eq!((regions[1].offset, regions[1].size), (8, 2));
    assert_eq!(regions[2].kind, RegionKind::Entries);
    assert_eq!((regions[2].offset, regions[2].size), (10, 1480));
    assert_eq!(regions.len(), 4);
}

#[test]
fn test_space_map_zero_blocks() {
    let store = setup_mem_store(0);

    assert_eq!(store.space_map().regions().len(), 3);
    assert_eq!(store.space_map().block_runs().count(), 0);
}

#[test]
fn test_space_map_display() {
    let mut store = setup_mem_store(4);
    store.put("a", b"x").unwrap();

    let text = store.space_map().to_string();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("Type"));
    assert!(lines[4].starts_with("USED"));
    assert!(lines[4].contains("4096"));
    assert!(lines[5].starts_with("FREE"));
    assert!(lines[5].contains("12288"));
}

// =============================================================================
// Consistency Tests
// =============================================================================

#[test]
fn test_check_detects_orphaned_block() {
    let mut store = setup_mem_store(10);
    store.put("a", b"x").unwrap();

    let mut image = store.into_device().into_bytes();
    // Bitmap starts at byte 8; mark block 5 used without an owner
    image[8] |= 0x80 >> 5;

    let store = Store::mount(MemDevice::from_bytes(image), Config::default()).unwrap();
    assert!(matches!(store.check(), Err(VfsError::Corruption(_))));
}

#[test]
fn test_check_detects_dangling_pointer() {
    let mut store = setup_mem_store(10);
    store.put("a", b"x").unwrap();

    let mut image = store.into_device().into_bytes();
    // Clear every bitmap bit while the entry still points at block 0
    image[8] = 0;

    let store = Store::mount(MemDevice::from_bytes(image), Config::default()).unwrap();
    assert!(matches!(store.check(), Err(VfsError::Corruption(_))));
}
