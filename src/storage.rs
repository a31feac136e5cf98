use log::warn;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Storage key for the serialized position.
pub const KEY_POSITION: &str = "gambitron_fen";
/// Storage key for the player's remaining clock milliseconds.
pub const KEY_CLOCK_PLAYER: &str = "gambitron_clock_player";
/// Storage key for the opponent's remaining clock milliseconds.
pub const KEY_CLOCK_AI: &str = "gambitron_clock_ai";

/// Key to string store backed by a JSON file. Write failures are logged and
/// the in-memory values stay usable for the rest of the session.
pub struct StateStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl StateStore {
    /// Open the store, reading existing values when the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!("State file {} is corrupt, starting fresh: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        StateStore { path, values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Read a stored value as a decimal number.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
        self.flush();
    }

    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }

    fn flush(&self) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("Could not create state directory {}: {}", parent.display(), e);
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(&self.values) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    warn!("Could not write state file {}: {}", self.path.display(), e);
                }
            }
            Err(e) => warn!("Could not serialize state: {}", e),
        }
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
