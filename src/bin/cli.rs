//! flatvfs CLI
//!
//! Command-line interface for creating and manipulating store files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flatvfs::config::{PartialWritePolicy, SyncStrategy};
use flatvfs::{remove_store, Config, Result, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// flatvfs CLI
#[derive(Parser, Debug)]
#[command(name = "flatvfs")]
#[command(about = "Single-file virtual block store")]
#[command(version)]
struct Args {
    /// fsync the store after every change
    #[arg(long, global = true)]
    sync: bool,

    /// Leave blocks claimed by a failed write marked used
    #[arg(long, global = true)]
    keep_partial: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new store
    Create {
        /// Store file to create
        path: PathBuf,

        /// Requested size in bytes (rounded down to whole blocks)
        byte_size: u64,
    },

    /// Copy a host file into the store
    Write {
        /// Store file
        path: PathBuf,

        /// Host file to copy
        src: PathBuf,

        /// Entry name inside the store
        name: String,
    },

    /// Copy an entry out of the store into a host file
    Read {
        /// Store file
        path: PathBuf,

        /// Entry name inside the store
        name: String,

        /// Host file to write
        dst: PathBuf,
    },

    /// List entries
    Ls {
        /// Store file
        path: PathBuf,
    },

    /// Remove an entry
    Rm {
        /// Store file
        path: PathBuf,

        /// Entry name inside the store
        name: String,
    },

    /// Remove the whole store file
    #[command(name = "rm_vfs")]
    RmVfs {
        /// Store file
        path: PathBuf,
    },

    /// Show the space map
    Map {
        /// Store file
        path: PathBuf,
    },

    /// Verify bitmap and entry table consistency
    Check {
        /// Store file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,flatvfs=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .sync_strategy(if args.sync {
            SyncStrategy::EveryWrite
        } else {
            SyncStrategy::Never
        })
        .partial_write_policy(if args.keep_partial {
            PartialWritePolicy::KeepAllocated
        } else {
            PartialWritePolicy::Rollback
        })
        .build();

    match run(args.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Create { path, byte_size } => {
            Store::create(&path, byte_size, config)?.close()
        }
        Commands::Write { path, src, name } => {
            let mut store = Store::open(&path, config)?;
            let file = File::open(&src)?;
            let len = file.metadata()?.len();
            store.put_from(&name, BufReader::new(file), len)?;
            store.close()
        }
        Commands::Read { path, name, dst } => {
            let mut store = Store::open(&path, config)?;
            let mut out = BufWriter::new(File::create(&dst)?);
            store.get(&name, &mut out)?;
            out.flush()?;
            Ok(())
        }
        Commands::Ls { path } => {
            let store = Store::open(&path, config)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "Name\t\tSize")?;
            for entry in store.list() {
                writeln!(out, "{}\t\t{}", entry.name, entry.size)?;
            }
            Ok(())
        }
        Commands::Rm { path, name } => {
            let mut store = Store::open(&path, config)?;
            store.delete(&name)?;
            store.close()
        }
        Commands::RmVfs { path } => remove_vfs(&path, config),
        Commands::Map { path } => {
            let store = Store::open(&path, config)?;
            print!("{}", store.space_map());
            Ok(())
        }
        Commands::Check { path } => {
            let store = Store::open(&path, config)?;
            store.check()?;
            let stats = store.stats();
            println!(
                "OK: {} entries, {}/{} blocks used",
                stats.entries, stats.used_blocks, stats.block_count
            );
            Ok(())
        }
    }
}

/// Only delete files that actually are stores
fn remove_vfs(path: &Path, config: Config) -> Result<()> {
    drop(Store::open(path, config)?);
    remove_store(path)
}
