//! Versioned persistence of the round history and learned state.
//!
//! Every blob is wrapped in `{ "version": N, "data": ... }`. A blob written
//! under another version is rejected as `CorruptPersistedState`; the lenient
//! loaders log that and fall back to defaults.

pub mod store;

use crate::error::{PredictorError, Result};
use crate::learned_state::LearnedState;
use crate::types::RoundRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};

pub const ENTRIES_KEY: &str = "race_predictor_entries";
pub const LEARNED_STATE_KEY: &str = "race_predictor_learned_state";

/// Schema version written into every envelope.
pub const STORAGE_VERSION: u32 = 6;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    version: u32,
    data: &'a T,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    version: u32,
    data: serde_json::Value,
}

fn corrupt(key: &str, reason: impl Into<String>) -> PredictorError {
    PredictorError::CorruptPersistedState {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Decode the payload of a blob written under `version`.
///
/// Only the current version is understood; anything else is a reset.
pub fn migrate<T: DeserializeOwned>(key: &str, version: u32, data: serde_json::Value) -> Result<T> {
    if version != STORAGE_VERSION {
        return Err(corrupt(
            key,
            format!("stored version {} != expected {}", version, STORAGE_VERSION),
        ));
    }
    serde_json::from_value(data).map_err(|e| corrupt(key, e.to_string()))
}

/// Read and decode `key`. `Ok(None)` when the key is absent.
pub fn read_blob<T: DeserializeOwned, S: BlobStore + ?Sized>(
    store: &S,
    key: &str,
) -> Result<Option<T>> {
    let Some(bytes) = store.load(key)? else {
        return Ok(None);
    };
    let raw: RawEnvelope =
        serde_json::from_slice(&bytes).map_err(|e| corrupt(key, e.to_string()))?;
    migrate(key, raw.version, raw.data).map(Some)
}

pub fn write_blob<T: Serialize, S: BlobStore + ?Sized>(
    store: &mut S,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(&Envelope {
        version: STORAGE_VERSION,
        data: value,
    })?;
    store.save(key, &bytes)
}

fn read_or_default<T: DeserializeOwned, S: BlobStore + ?Sized>(
    store: &S,
    key: &str,
    default: impl FnOnce() -> T,
) -> T {
    match read_blob(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => default(),
        Err(e) => {
            warn!("Discarding persisted {}: {}", key, e);
            default()
        }
    }
}

/// Stored history, or empty when absent or unreadable.
pub fn load_history<S: BlobStore + ?Sized>(store: &S) -> Vec<RoundRecord> {
    read_or_default(store, ENTRIES_KEY, Vec::new)
}

/// Stored learned state, or `fallback` when absent or unreadable.
pub fn load_learned_state<S: BlobStore + ?Sized>(store: &S, fallback: LearnedState) -> LearnedState {
    read_or_default(store, LEARNED_STATE_KEY, || fallback)
}

pub fn save_history<S: BlobStore + ?Sized>(store: &mut S, history: &[RoundRecord]) -> Result<()> {
    write_blob(store, ENTRIES_KEY, &history)
}

pub fn save_learned_state<S: BlobStore + ?Sized>(store: &mut S, state: &LearnedState) -> Result<()> {
    write_blob(store, LEARNED_STATE_KEY, state)
}

/// Remove everything the predictor stored.
pub fn clear_all<S: BlobStore + ?Sized>(store: &mut S) -> Result<()> {
    store.remove(ENTRIES_KEY)?;
    store.remove(LEARNED_STATE_KEY)?;
    info!("Cleared persisted predictor state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::round;
    use tempfile::tempdir;

    const ODDS: [f64; 6] = [2.0, 3.0, 4.0, 5.0, 6.0, 8.0];

    #[test]
    fn test_history_round_trip() {
        let mut store = MemoryBlobStore::new();
        let history = vec![round(0, ODDS, &["1", "2", "3"]), round(1, ODDS, &["4"])];
        save_history(&mut store, &history).unwrap();
        assert_eq!(load_history(&store), history);
    }

    #[test]
    fn test_state_round_trip_through_files() {
        let dir = tempdir().unwrap();
        let mut store = FileBlobStore::new(dir.path());
        let mut state = LearnedState::with_window(30);
        state.signal_weights.scale(0.95);
        state.learning_rate = 0.07;
        save_learned_state(&mut store, &state).unwrap();

        let reopened = FileBlobStore::new(dir.path());
        assert_eq!(load_learned_state(&reopened, LearnedState::default()), state);
    }

    #[test]
    fn test_absent_keys_default() {
        let store = MemoryBlobStore::new();
        assert!(load_history(&store).is_empty());
        assert_eq!(
            load_learned_state(&store, LearnedState::with_window(25)).recent_window_size,
            25
        );
    }

    #[test]
    fn test_version_mismatch_resets() {
        let mut store = MemoryBlobStore::new();
        store
            .save(ENTRIES_KEY, br#"{"version":5,"data":[]}"#)
            .unwrap();
        let err = read_blob::<Vec<RoundRecord>, _>(&store, ENTRIES_KEY).unwrap_err();
        assert!(matches!(err, PredictorError::CorruptPersistedState { .. }));
        assert!(load_history(&store).is_empty());
    }

    #[test]
    fn test_garbage_resets() {
        let mut store = MemoryBlobStore::new();
        store.save(LEARNED_STATE_KEY, b"{not json").unwrap();
        store.save(ENTRIES_KEY, br#"{"version":6,"data":{"oops":1}}"#).unwrap();
        assert_eq!(
            load_learned_state(&store, LearnedState::default()),
            LearnedState::default()
        );
        assert!(load_history(&store).is_empty());
    }

    #[test]
    fn test_clear_all() {
        let mut store = MemoryBlobStore::new();
        save_history(&mut store, &[round(0, ODDS, &["1"])]).unwrap();
        save_learned_state(&mut store, &LearnedState::default()).unwrap();
        clear_all(&mut store).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_envelope_shape() {
        let mut store = MemoryBlobStore::new();
        save_history(&mut store, &[]).unwrap();
        let bytes = store.load(ENTRIES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], 6);
        assert!(value["data"].is_array());
    }
}
