//-
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key -> choice-sequence persistence for replaying past failures.
//!
//! Mirrors the shape of `proptest::test_runner::failure_persistence`: a
//! trait object stored in `Config`, with a file-backed default
//! implementation and an in-memory one mainly useful for tests.

use core::fmt;
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::test_case::Attempt;

/// Maps a stable textual key to a persisted choice sequence.
pub trait Database: Send + Sync + fmt::Debug {
    /// All keys currently recorded.
    fn list(&self) -> Vec<String>;
    /// Persist `attempt`'s choice sequence under `key`.
    fn put(&self, key: &str, attempt: &Attempt);
    /// Look up the choice sequence recorded under `key`, if any.
    fn get(&self, key: &str) -> Option<Attempt>;
    /// Clone this database behind a fresh `Box`.
    fn box_clone(&self) -> Box<dyn Database>;
}

impl Clone for Box<dyn Database> {
    fn clone(&self) -> Box<dyn Database> {
        self.box_clone()
    }
}

/// The "no-record" sentinel: reads always miss and writes are discarded.
/// Set `Config::db` to this to opt a property out of persistence
/// entirely (as `CONJECTURE_DISABLE_DB` does) without changing its other
/// settings.
#[derive(Debug, Clone, Default)]
pub struct NoOpDatabase;

impl Database for NoOpDatabase {
    fn list(&self) -> Vec<String> {
        Vec::new()
    }
    fn put(&self, _key: &str, _attempt: &Attempt) {}
    fn get(&self, _key: &str) -> Option<Attempt> {
        None
    }
    fn box_clone(&self) -> Box<dyn Database> {
        Box::new(self.clone())
    }
}

/// A `BTreeMap`-backed database, mainly useful for tests and for embedding
/// in processes that don't want on-disk state.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    entries: Mutex<BTreeMap<String, Vec<u64>>>,
}

impl Clone for InMemoryDatabase {
    fn clone(&self) -> Self {
        InMemoryDatabase {
            entries: Mutex::new(self.entries.lock().unwrap().clone()),
        }
    }
}

impl Database for InMemoryDatabase {
    fn list(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
    fn put(&self, key: &str, attempt: &Attempt) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), attempt.choices.clone());
    }
    fn get(&self, key: &str) -> Option<Attempt> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|choices| Attempt::from_choices(choices.clone()))
    }
    fn box_clone(&self) -> Box<dyn Database> {
        Box::new(self.clone())
    }
}

/// The default file-backed database: one file per key under `root`,
/// normative layout from the spec's DB storage section. File contents are
/// a count-prefixed sequence of little-endian `u64` choices; corrupted or
/// truncated files are treated as absent rather than as a hard error,
/// since a concurrent writer may be mid-write when we read.
#[derive(Debug, Clone)]
pub struct DirectoryDatabase {
    root: PathBuf,
}

impl DirectoryDatabase {
    /// Use `root` as the storage directory, creating it lazily on first
    /// write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryDatabase { root: root.into() }
    }

    /// The directory `Config::default()` persists failures under, absent
    /// any other configuration.
    pub fn default_location() -> Self {
        DirectoryDatabase::new(".conjecture-regressions")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }

    fn read_file(path: &Path) -> io::Result<Vec<u64>> {
        let mut buf = Vec::new();
        fs::File::open(path)?.read_to_end(&mut buf)?;
        decode_choices(&buf).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "corrupt attempt file")
        })
    }

    fn write_file(&self, path: &Path, choices: &[u64]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&encode_choices(choices))?;
        tmp.persist(path)
            .map_err(|e| e.error)?;
        Ok(())
    }
}

impl Database for DirectoryDatabase {
    fn list(&self) -> Vec<String> {
        fs::read_dir(&self.root)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }

    fn put(&self, key: &str, attempt: &Attempt) {
        let path = self.path_for(key);
        if let Err(e) = self.write_file(&path, &attempt.choices) {
            eprintln!(
                "conjecture: failed to persist failing example under {}: {e}",
                path.display()
            );
        }
    }

    fn get(&self, key: &str) -> Option<Attempt> {
        Self::read_file(&self.path_for(key))
            .ok()
            .map(Attempt::from_choices)
    }

    fn box_clone(&self) -> Box<dyn Database> {
        Box::new(self.clone())
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn encode_choices(choices: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + choices.len() * 8);
    out.extend_from_slice(&(choices.len() as u64).to_le_bytes());
    for c in choices {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out
}

fn decode_choices(buf: &[u8]) -> Option<Vec<u64>> {
    if buf.len() < 8 {
        return None;
    }
    let count = u64::from_le_bytes(buf[0..8].try_into().ok()?) as usize;
    let expected_len = 8 + count.checked_mul(8)?;
    if buf.len() != expected_len {
        return None;
    }
    let mut out = Vec::with_capacity(count);
    for chunk in buf[8..].chunks_exact(8) {
        out.push(u64::from_le_bytes(chunk.try_into().ok()?));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trips() {
        let db = InMemoryDatabase::default();
        let attempt = Attempt::from_choices(vec![1, 2, 3]);
        db.put("k", &attempt);
        assert_eq!(db.get("k").unwrap().choices, vec![1, 2, 3]);
        assert_eq!(db.list(), vec!["k".to_owned()]);
        assert!(db.get("missing").is_none());
    }

    #[test]
    fn no_op_never_retains_anything() {
        let db = NoOpDatabase;
        db.put("k", &Attempt::from_choices(vec![1]));
        assert!(db.get("k").is_none());
        assert!(db.list().is_empty());
    }

    #[test]
    fn directory_database_round_trips_and_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let db = DirectoryDatabase::new(dir.path());
        let attempt = Attempt::from_choices(vec![4, 5, 6]);
        db.put("my-prop", &attempt);
        assert_eq!(db.get("my-prop").unwrap().choices, vec![4, 5, 6]);

        fs::write(dir.path().join("corrupt"), b"not a valid attempt").unwrap();
        assert!(db.get("corrupt").is_none());
    }
}
