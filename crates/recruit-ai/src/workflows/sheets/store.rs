use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::table::SheetTable;
use crate::workflows::pipeline::{Candidate, CandidateStore, CandidateUpdate, StoreError};

/// Raw CSV persistence for the candidate sheet.
pub trait SheetBackend: Debug + Send + Sync {
    fn load(&self) -> Result<Vec<u8>, StoreError>;
    fn save(&self, csv: &[u8]) -> Result<(), StoreError>;
}

/// Sheet kept as a CSV file on local disk. A missing file reads as an empty sheet.
#[derive(Debug, Clone)]
pub struct FileSheetBackend {
    path: PathBuf,
}

impl FileSheetBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SheetBackend for FileSheetBackend {
    fn load(&self) -> Result<Vec<u8>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, csv: &[u8]) -> Result<(), StoreError> {
        let staging = self.path.with_extension("csv.tmp");
        std::fs::write(&staging, csv)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// Candidate store over a spreadsheet backend. Every read reloads the sheet; every
/// write is a load, a single-row edit, and a save.
#[derive(Debug)]
pub struct SheetCandidateStore<B> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: SheetBackend> SheetCandidateStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn load_table(&self) -> Result<SheetTable, StoreError> {
        SheetTable::parse(&self.backend.load()?)
    }

    fn edit<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut SheetTable) -> Result<(), StoreError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut table = self.load_table()?;
        change(&mut table)?;
        self.backend.save(&table.to_csv()?)
    }
}

impl<B: SheetBackend> CandidateStore for SheetCandidateStore<B> {
    fn get_all_candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        self.load_table()?.candidates()
    }

    fn update_candidate(&self, email: &str, update: &CandidateUpdate) -> Result<(), StoreError> {
        self.edit(|table| table.apply_update(email, update))
    }

    fn add_candidate(&self, candidate: Candidate) -> Result<(), StoreError> {
        self.edit(|table| table.append(&candidate))
    }
}
