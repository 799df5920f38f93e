//! Versioned record wrapping a solution with its digest

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::sim::Solution;

/// Current on-disk format
pub const ENVELOPE_VERSION: u32 = 1;

/// Solution JSON plus the BLAKE3 digest of exactly those bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionEnvelope {
    pub version: u32,
    pub digest: String,
    pub payload: String,
}

impl SolutionEnvelope {
    pub fn seal(solution: &Solution) -> Result<Self, PersistenceError> {
        let payload = serde_json::to_string(solution)?;
        Ok(Self {
            version: ENVELOPE_VERSION,
            digest: digest(&payload),
            payload,
        })
    }

    /// Verify and decode; `path` is only used for error reporting
    pub fn open(&self, path: &Path) -> Result<Solution, PersistenceError> {
        if self.version != ENVELOPE_VERSION {
            return Err(PersistenceError::Version {
                found: self.version,
            });
        }
        if digest(&self.payload) != self.digest {
            return Err(PersistenceError::Corrupt {
                path: path.to_path_buf(),
            });
        }
        Ok(serde_json::from_str(&self.payload)?)
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn digest(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}
