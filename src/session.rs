//! Session persistence for the signed-in nurse

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::Error;

/// Preference key holding the id of the signed-in nurse
pub const LOGGED_NURSE_ID_KEY: &str = "logged_nurse_id";

/// Durable key-value preferences holding integer values
pub trait PreferenceStore: Send + Sync {
    /// Read a value; `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<i64>, Error>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: i64) -> Result<(), Error>;

    /// Remove a key; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// In-process preferences, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, i64>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<i64>, Error> {
        let values = self
            .values
            .read()
            .map_err(|_| Error::session("preferences lock poisoned"))?;
        Ok(values.get(key).copied())
    }

    fn set(&self, key: &str, value: i64) -> Result<(), Error> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::session("preferences lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::session("preferences lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}

/// Preferences stored as a JSON object in a file.
///
/// Every mutation rewrites the whole file through a temporary sibling and a
/// rename. A missing file reads as an empty store.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePreferences {
    /// Open (or lazily create) the preference file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, i64>, Error> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, values: &HashMap<String, i64>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut HashMap<String, i64>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::session("preference file lock poisoned"))?;
        let mut values = self.load()?;
        f(&mut values);
        self.store(&values)
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<i64>, Error> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::session("preference file lock poisoned"))?;
        Ok(self.load()?.get(key).copied())
    }

    fn set(&self, key: &str, value: i64) -> Result<(), Error> {
        self.update(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Which nurse is signed in on this device
#[derive(Clone)]
pub struct SessionStore {
    prefs: Arc<dyn PreferenceStore>,
}

impl SessionStore {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Session kept in memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferences::new()))
    }

    /// Session persisted to a preference file
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self::new(Arc::new(FilePreferences::open(path)))
    }

    /// Id of the signed-in nurse, if any
    pub fn logged_nurse_id(&self) -> Result<Option<i64>, Error> {
        self.prefs.get(LOGGED_NURSE_ID_KEY)
    }

    pub fn set_logged_nurse_id(&self, id: i64) -> Result<(), Error> {
        self.prefs.set(LOGGED_NURSE_ID_KEY, id)
    }

    /// Forget the signed-in nurse
    pub fn clear(&self) -> Result<(), Error> {
        self.prefs.remove(LOGGED_NURSE_ID_KEY)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.logged_nurse_id(), Ok(Some(_)))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("logged_nurse_id", &self.logged_nurse_id().ok().flatten())
            .finish()
    }
}
