//! Solution store with integrity verification
//!
//! Features:
//! - One record per (world, puzzle content hash)
//! - Versioned JSON envelope
//! - BLAKE3 integrity digest
//! - Atomic writes (tmp → rename)
//!
//! Reads recover to "no solution" on any failure; only writes report errors.

pub mod envelope;

use std::path::{Path, PathBuf};

pub use envelope::{ENVELOPE_VERSION, SolutionEnvelope};

use crate::error::PersistenceError;
use crate::sim::Solution;

/// Solutions on disk, laid out as `<root>/<world>/<puzzle-hash>.json`
#[derive(Debug, Clone)]
pub struct SolutionStore {
    root: PathBuf,
}

impl SolutionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record path for a puzzle; both keys must be plain file names
    pub fn path_for(&self, world: &str, puzzle_hash: &str) -> Result<PathBuf, PersistenceError> {
        check_key(world)?;
        check_key(puzzle_hash)?;
        Ok(self.root.join(world).join(format!("{puzzle_hash}.json")))
    }

    /// Write a solution, replacing any existing record
    pub fn save(
        &self,
        world: &str,
        puzzle_hash: &str,
        solution: &Solution,
    ) -> Result<(), PersistenceError> {
        let path = self.path_for(world, puzzle_hash)?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = SolutionEnvelope::seal(solution)?.to_json()?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        log::info!(
            "Saved solution for {world}/{puzzle_hash} (score {})",
            solution.score
        );
        Ok(())
    }

    /// Save unless a stored solution already has a lower or equal score
    ///
    /// Returns whether the record was written.
    pub fn save_if_better(
        &self,
        world: &str,
        puzzle_hash: &str,
        solution: &Solution,
    ) -> Result<bool, PersistenceError> {
        if let Some(existing) = self.load(world, puzzle_hash) {
            if existing.score <= solution.score {
                return Ok(false);
            }
        }
        self.save(world, puzzle_hash, solution)?;
        Ok(true)
    }

    /// Read a solution, distinguishing "none stored" from failures
    pub fn try_load(
        &self,
        world: &str,
        puzzle_hash: &str,
    ) -> Result<Option<Solution>, PersistenceError> {
        let path = self.path_for(world, puzzle_hash)?;
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope = SolutionEnvelope::from_json(&json)?;
        envelope.open(&path).map(Some)
    }

    /// Read a solution; unreadable or corrupt records count as unsolved
    pub fn load(&self, world: &str, puzzle_hash: &str) -> Option<Solution> {
        match self.try_load(world, puzzle_hash) {
            Ok(solution) => solution,
            Err(e) => {
                log::warn!("Ignoring solution {world}/{puzzle_hash}: {e}");
                None
            }
        }
    }

    /// Delete every stored solution
    pub fn clear_all(&self) -> Result<(), PersistenceError> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {
                log::info!("Cleared solutions in {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn check_key(key: &str) -> Result<(), PersistenceError> {
    let unsafe_char = |c: char| matches!(c, '/' | '\\' | ':' | '\0');
    if key.is_empty() || key == "." || key == ".." || key.contains(unsafe_char) {
        return Err(PersistenceError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Location;

    fn solution(launches: u32) -> Solution {
        let mut s = Solution::new();
        for i in 0..launches {
            s.record_launch([("ship", Location::new(0, i as i32, 0))]);
        }
        s
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path());
        assert_eq!(store.load("one", "abc"), None);

        store.save("one", "abc", &solution(3)).unwrap();
        assert_eq!(store.load("one", "abc"), Some(solution(3)));
        // Keyed by world as well as hash
        assert_eq!(store.load("two", "abc"), None);
        assert!(!store.path_for("one", "abc").unwrap().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_save_if_better() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path());
        assert!(store.save_if_better("one", "abc", &solution(4)).unwrap());
        assert!(!store.save_if_better("one", "abc", &solution(5)).unwrap());
        assert!(!store.save_if_better("one", "abc", &solution(4)).unwrap());
        assert!(store.save_if_better("one", "abc", &solution(2)).unwrap());
        assert_eq!(store.load("one", "abc").map(|s| s.score), Some(2));
    }

    #[test]
    fn test_tampered_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path());
        store.save("one", "abc", &solution(3)).unwrap();

        let path = store.path_for("one", "abc").unwrap();
        let tampered = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\\\"score\\\":3", "\\\"score\\\":1");
        std::fs::write(&path, tampered).unwrap();

        assert!(matches!(
            store.try_load("one", "abc"),
            Err(PersistenceError::Corrupt { .. })
        ));
        assert_eq!(store.load("one", "abc"), None);
    }

    #[test]
    fn test_garbage_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path());
        let path = store.path_for("one", "abc").unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not a record").unwrap();
        assert_eq!(store.load("one", "abc"), None);
    }

    #[test]
    fn test_keys_stay_inside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path().join("solutions"));
        for world in ["../x", "..", "a/b", "a\\b", ""] {
            assert!(matches!(
                store.save(world, "abc", &solution(1)),
                Err(PersistenceError::InvalidKey { .. })
            ));
            assert_eq!(store.load(world, "abc"), None);
        }
        assert!(store.save("one", "../abc", &solution(1)).is_err());
        assert!(!dir.path().join("x").exists());
        assert!(!dir.path().join("abc.json").exists());
    }

    #[test]
    fn test_clear_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = SolutionStore::new(dir.path().join("solutions"));
        store.clear_all().unwrap();
        store.save("one", "abc", &solution(1)).unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.load("one", "abc"), None);
    }
}
