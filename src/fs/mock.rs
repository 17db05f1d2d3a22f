// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Vec<u8>,
    pub modified: SystemTime,
}

/// In-memory filesystem with a logical clock.
///
/// Every write advances the clock by one second, so a file written later is
/// always strictly newer than one written earlier. No sleeping needed in
/// tests that compare modification times.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    clock: Arc<Mutex<SystemTime>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(Mutex::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))),
        }
    }

    fn tick(&self) -> SystemTime {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::from_secs(1);
        *clock
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.as_ref().to_path_buf(),
            MockEntry {
                content: content.into(),
                modified,
            },
        );
    }

    /// Bump the modification time of an existing file, or create it empty.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let modified = self.tick();
        let mut files = self.files.lock().unwrap();
        files
            .entry(path.as_ref().to_path_buf())
            .and_modify(|e| e.modified = modified)
            .or_insert(MockEntry {
                content: Vec::new(),
                modified,
            });
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(entry) => String::from_utf8(entry.content.clone())
                .map_err(|e| anyhow!("Invalid UTF-8: {}", e)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(entry) => Ok(Box::new(Cursor::new(entry.content.clone()))),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        Ok(self.files.lock().unwrap().get(path).map(|e| e.modified))
    }
}
