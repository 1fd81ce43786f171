//! Snapshot persistence for the in-memory store.
//!
//! The full store state is serialized with bincode and written through
//! an atomic replace, so a crash mid-write leaves the previous snapshot
//! intact. Loading a missing snapshot is not an error; the store just
//! starts empty.

use std::io::Write;
use std::path::{Path, PathBuf};

use atomicwrites::{AtomicFile, OverwriteBehavior};
use tracing::info;

use crate::error::{Error, Result};
use crate::store::StoreState;

const SNAPSHOT_FILE: &str = "store.bin";

pub struct FilePersistence {
    data_dir: PathBuf,
    snapshot_path: PathBuf,
}

impl FilePersistence {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        let snapshot_path = data_dir.join(SNAPSHOT_FILE);
        Ok(Self { data_dir, snapshot_path })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Write the snapshot atomically: serialize, write to a temp file in
    /// the same directory, rename over the previous snapshot.
    pub fn save(&self, state: &StoreState) -> Result<()> {
        let bytes =
            bincode::serialize(state).map_err(|e| Error::Serialization(e.to_string()))?;
        let file = AtomicFile::new(&self.snapshot_path, OverwriteBehavior::AllowOverwrite);
        file.write(|f| f.write_all(&bytes)).map_err(|e| match e {
            atomicwrites::Error::Internal(io) => Error::Io(io),
            atomicwrites::Error::User(io) => Error::Io(io),
        })?;
        info!(path = %self.snapshot_path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    /// Load the snapshot if one exists.
    pub fn load(&self) -> Result<Option<StoreState>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.snapshot_path)?;
        let state = bincode::deserialize(&bytes)
            .map_err(|e| Error::Snapshot(format!("corrupt snapshot: {e}")))?;
        info!(path = %self.snapshot_path.display(), "snapshot loaded");
        Ok(Some(state))
    }
}
