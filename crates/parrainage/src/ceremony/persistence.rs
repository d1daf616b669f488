use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The three independent blobs the ceremony persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotKey {
    Roster,
    Matches,
    Settings,
}

impl SnapshotKey {
    pub const fn all() -> [Self; 3] {
        [Self::Roster, Self::Matches, Self::Settings]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Roster => "pa_students",
            Self::Matches => "pa_matches",
            Self::Settings => "pa_settings",
        }
    }
}

/// Key-value storage for whole snapshots. Every save rewrites the blob.
pub trait SnapshotStore {
    fn read(&self, key: SnapshotKey) -> Result<Option<String>, StoreError>;
    fn write(&self, key: SnapshotKey, contents: &str) -> Result<(), StoreError>;
    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError>;

    /// `Ok(None)` when the blob is absent; `Corrupt` when it does not parse.
    fn load<T: DeserializeOwned>(&self, key: SnapshotKey) -> Result<Option<T>, StoreError>
    where
        Self: Sized,
    {
        match self.read(key)? {
            Some(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: SnapshotKey, value: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let contents = serde_json::to_string_pretty(value)
            .map_err(|source| StoreError::Serialize { key, source })?;
        self.write(key, &contents)
    }

    fn clear(&self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        for key in SnapshotKey::all() {
            self.remove(key)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot '{}' is not valid JSON: {source}", .key.name())]
    Corrupt {
        key: SnapshotKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot '{}' could not be serialized: {source}", .key.name())]
    Serialize {
        key: SnapshotKey,
        #[source]
        source: serde_json::Error,
    },
}

/// One JSON file per snapshot inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonDirectoryStore {
    root: PathBuf,
}

impl JsonDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: SnapshotKey) -> PathBuf {
        self.root.join(format!("{}.json", key.name()))
    }
}

impl SnapshotStore for JsonDirectoryStore {
    fn read(&self, key: SnapshotKey) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write(&self, key: SnapshotKey, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents).map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

/// Shared in-memory store; clones see the same blobs.
#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    blobs: Arc<Mutex<BTreeMap<SnapshotKey, String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: SnapshotKey) -> Option<String> {
        self.blobs
            .lock()
            .expect("snapshot mutex poisoned")
            .get(&key)
            .cloned()
    }

    pub fn insert_raw(&self, key: SnapshotKey, contents: impl Into<String>) {
        self.blobs
            .lock()
            .expect("snapshot mutex poisoned")
            .insert(key, contents.into());
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self, key: SnapshotKey) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn write(&self, key: SnapshotKey, contents: &str) -> Result<(), StoreError> {
        self.insert_raw(key, contents);
        Ok(())
    }

    fn remove(&self, key: SnapshotKey) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .expect("snapshot mutex poisoned")
            .remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::domain::{seed_roster, Person, Settings};

    #[test]
    fn json_directory_round_trips_and_clears() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonDirectoryStore::new(dir.path().join("data"));

        assert!(store
            .load::<Vec<Person>>(SnapshotKey::Roster)
            .expect("missing file is not an error")
            .is_none());

        let roster = seed_roster();
        store.save(SnapshotKey::Roster, &roster).expect("save");
        assert!(store.path_for(SnapshotKey::Roster).ends_with("pa_students.json"));
        assert!(!store
            .path_for(SnapshotKey::Roster)
            .with_extension("json.tmp")
            .exists());

        let loaded: Vec<Person> = store
            .load(SnapshotKey::Roster)
            .expect("load")
            .expect("present");
        assert_eq!(loaded, roster);

        store.clear().expect("clear");
        assert!(!store.path_for(SnapshotKey::Roster).exists());
        store.clear().expect("clearing twice is fine");
    }

    #[test]
    fn unparseable_blob_is_reported_as_corrupt() {
        let store = MemorySnapshotStore::new();
        store.insert_raw(SnapshotKey::Settings, "{not json");

        match store.load::<Settings>(SnapshotKey::Settings) {
            Err(StoreError::Corrupt { key, .. }) => assert_eq!(key, SnapshotKey::Settings),
            other => panic!("expected corrupt snapshot, got {other:?}"),
        }
    }

    #[test]
    fn memory_clones_share_blobs() {
        let store = MemorySnapshotStore::new();
        let handle = store.clone();
        store
            .save(SnapshotKey::Settings, &Settings::default())
            .expect("save");
        assert_eq!(
            handle.raw(SnapshotKey::Settings).as_deref(),
            Some("{\n  \"logoUrl\": null\n}")
        );
    }
}
