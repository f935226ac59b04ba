use crate::source::CardSource;
use crate::{Result, SyncError};
use phonedir_core::{split_cards, RawCard};
use std::fs;
use std::path::{Path, PathBuf};

/// A local `.vcf` export holding any number of cards.
#[derive(Debug, Clone)]
pub struct VcfFileSource {
    path: PathBuf,
}

impl VcfFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CardSource for VcfFileSource {
    fn source_name(&self) -> &'static str {
        "vcf"
    }

    fn fetch_cards(&self) -> Result<Vec<RawCard>> {
        let bytes = fs::read(&self.path).map_err(|source| SyncError::Read {
            path: self.path.clone(),
            source,
        })?;
        let data = String::from_utf8(bytes).map_err(|_| {
            SyncError::Parse(format!("{} is not valid UTF-8", self.path.display()))
        })?;
        Ok(split_cards(&data))
    }
}
