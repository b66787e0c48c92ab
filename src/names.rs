use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use parking_lot::Mutex;

/// Desktop display names, one per line of the backing file.
///
/// The whole table is swapped under the lock on every reload, so a lookup
/// sees either the old or the new contents, never a mix.
pub struct NameTable {
    path: PathBuf,
    names: Mutex<Option<Vec<String>>>,
}

impl NameTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            names: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the backing file. A missing file empties the table; any other
    /// read failure leaves the current contents in place.
    pub fn load(&self) -> anyhow::Result<()> {
        let mut names = self.names.lock();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No desktop names file at '{}'", self.path.display());
                *names = None;
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read desktop names from '{}'", self.path.display())
                });
            }
        };

        let loaded: Vec<String> = String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect();

        log::debug!(
            "Loaded {} desktop names from '{}'",
            loaded.len(),
            self.path.display()
        );
        *names = Some(loaded);

        Ok(())
    }

    /// Looks up the name of the desktop at the 1-based `index`.
    pub fn lookup(&self, index: i64) -> Option<String> {
        let zero_index = usize::try_from(index.checked_sub(1)?).ok()?;
        let names = self.names.lock();

        names
            .as_ref()?
            .get(zero_index)
            .filter(|name| !name.trim().is_empty())
            .cloned()
    }
}

pub struct LabelResolver {
    names: Arc<NameTable>,
}

impl LabelResolver {
    pub fn new(names: Arc<NameTable>) -> Self {
        Self { names }
    }

    pub fn resolve(&self, index: i64) -> String {
        self.names
            .lookup(index)
            .unwrap_or_else(|| format!("Desktop {index}"))
    }
}
