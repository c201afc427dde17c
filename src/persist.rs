//! Index persistence
//!
//! The on-disk format is a small binary header (magic bytes + format
//! version) followed by a bincode payload containing the indexed roots and
//! every file record. The term index is not persisted: it is rebuilt from
//! the records on load, which keeps the format free of any coupling to the
//! in-memory posting layout.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::models::FileRecord;

const MAGIC: &[u8; 4] = b"FDXI";
const VERSION: u32 = 1;

/// Serializable image of the index: roots plus all records
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub roots: Vec<PathBuf>,
    pub records: Vec<FileRecord>,
}

/// Write a snapshot to `path`, creating parent directories as needed
pub fn save(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create index file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    bincode::serialize_into(&mut writer, snapshot).context("Failed to serialize index")?;
    writer.flush()?;

    log::info!(
        "Saved {} records ({} roots) to {}",
        snapshot.records.len(),
        snapshot.roots.len(),
        path.display()
    );
    Ok(())
}

/// Read a snapshot back from `path`
///
/// Fails without side effects on a missing file, bad magic, unsupported
/// version, or a truncated/corrupt payload.
pub fn load(path: &Path) -> Result<IndexSnapshot> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open index file: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .context("Failed to read index header")?;
    if &magic != MAGIC {
        bail!("Not a findex index file: {}", path.display());
    }

    let mut version_bytes = [0u8; 4];
    reader
        .read_exact(&mut version_bytes)
        .context("Failed to read index version")?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        bail!(
            "Unsupported index version {} (this build reads version {})",
            version,
            VERSION
        );
    }

    let snapshot: IndexSnapshot =
        bincode::deserialize_from(&mut reader).context("Failed to parse index payload")?;

    log::info!(
        "Loaded {} records ({} roots) from {}",
        snapshot.records.len(),
        snapshot.roots.len(),
        path.display()
    );
    Ok(snapshot)
}
