//! Save/load persistence
//!
//! A save is a versioned JSON envelope holding the race setup, the tuning in
//! force and the latest snapshot. The track is not stored: it is regenerated
//! from the setup's seed, which yields the identical track. Files are written
//! to a temporary path first and renamed into place.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SimError;
use crate::setup::RaceSetup;
use crate::sim::{Simulation, Snapshot};
use crate::tuning::{ConfigError, Tuning};

/// Current envelope format
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed save: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("cannot rebuild race: {0}")]
    Sim(#[from] SimError),
    #[error("saved tuning rejected: {0}")]
    Tuning(#[from] ConfigError),
}

/// Versioned save document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    pub setup: RaceSetup,
    pub tuning: Tuning,
    pub snapshot: Snapshot,
}

impl SaveEnvelope {
    pub fn new(setup: RaceSetup, tuning: Tuning, snapshot: Snapshot) -> Self {
        Self {
            version: SAVE_VERSION,
            setup,
            tuning,
            snapshot,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        // Check the version before decoding the body so old formats get a
        // clear error instead of a field mismatch
        #[derive(Deserialize)]
        struct Header {
            version: u32,
        }
        let header: Header = serde_json::from_str(json)?;
        if header.version != SAVE_VERSION {
            return Err(PersistError::Version {
                found: header.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the simulation so it continues from the saved tick
    pub fn resume(self) -> Result<Simulation, PersistError> {
        self.tuning.validate()?;
        let track = self.setup.track()?;
        Ok(Simulation::resume(Arc::new(track), self.tuning, self.snapshot))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write a save atomically (tmp file, then rename)
pub fn save_snapshot(path: impl AsRef<Path>, envelope: &SaveEnvelope) -> Result<(), PersistError> {
    let path = path.as_ref();
    let json = envelope.to_json()?;
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("tmp");
    fs::write(&tmp, json).map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))?;
    log::info!(
        "Saved race at tick {} to {}",
        envelope.snapshot.tick,
        path.display()
    );
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<SaveEnvelope, PersistError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(io_error(path))?;
    let envelope = SaveEnvelope::from_json(&json)?;
    log::info!(
        "Loaded race at tick {} from {}",
        envelope.snapshot.tick,
        path.display()
    );
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> SaveEnvelope {
        let setup = RaceSetup::with_seed(4);
        let tuning = Tuning::default();
        let mut sim = setup.build(&tuning).unwrap();
        let snapshot = sim.start().unwrap();
        SaveEnvelope::new(setup, tuning, snapshot)
    }

    #[test]
    fn test_json_round_trip() {
        let saved = envelope();
        let loaded = SaveEnvelope::from_json(&saved.to_json().unwrap()).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_version_mismatch() {
        let mut saved = envelope();
        saved.version = 99;
        let json = serde_json::to_string(&saved).unwrap();
        assert!(matches!(
            SaveEnvelope::from_json(&json),
            Err(PersistError::Version {
                found: 99,
                expected: SAVE_VERSION
            })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SaveEnvelope::from_json("not json"),
            Err(PersistError::Json(_))
        ));
    }

    #[test]
    fn test_resume_rejects_bad_tuning() {
        let mut saved = envelope();
        saved.tuning.max_health = 0;
        let json = saved.to_json().unwrap();
        let loaded = SaveEnvelope::from_json(&json).unwrap();
        assert!(matches!(
            loaded.resume(),
            Err(PersistError::Tuning(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_resume_rejects_bad_track_params() {
        let mut saved = envelope();
        saved.setup.track.lanes = 0;
        assert!(matches!(
            saved.resume(),
            Err(PersistError::Sim(SimError::InvalidTrack(_)))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("road-rash-sim-{}.json", std::process::id()));
        let saved = envelope();
        save_snapshot(&path, &saved).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_snapshot("/nonexistent/road-rash-save.json"),
            Err(PersistError::Io { .. })
        ));
    }
}
