//! Configuration for flatvfs
//!
//! Session-level knobs with sensible defaults. Nothing here changes the
//! on-disk format.

/// Configuration for an open store session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When to fsync the backing file
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Allocation Configuration
    // -------------------------------------------------------------------------
    /// What happens to blocks already claimed by a put that runs out of space
    pub partial_write_policy: PartialWritePolicy,
}

/// Sync strategy: how often to fsync the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Leave flushing to the OS; sync only on `Store::close`
    #[default]
    Never,

    /// fsync after every mutating operation (safest, slowest)
    EveryWrite,
}

/// Handling of blocks allocated by a put that fails with `OutOfSpace`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialWritePolicy {
    /// Free every block the failed put claimed, keeping the bitmap exact
    #[default]
    Rollback,

    /// Leave those blocks marked used with no owning entry.
    /// Matches stores written by the original tool.
    KeepAllocated,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the partial write policy
    pub fn partial_write_policy(mut self, policy: PartialWritePolicy) -> Self {
        self.config.partial_write_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
