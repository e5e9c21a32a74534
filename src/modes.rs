//! Per-user strategy persistence.
//!
//! A single JSON file maps user ids to strategy names. Reads never fail:
//! a missing file, unreadable contents, or an unknown name all degrade to
//! the default strategy. Writes read-modify-write the whole map.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::Strategy;

pub struct ModeStore {
    path: PathBuf,
}

impl ModeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored strategy for `user_id`, or the default when anything about
    /// the file is off.
    pub fn load(&self, user_id: i64) -> Strategy {
        self.read_map()
            .get(&user_id.to_string())
            .and_then(|name| Strategy::parse(name))
            .unwrap_or_default()
    }

    /// Persist `strategy` for `user_id`, keeping everyone else's entry.
    pub fn save(&self, user_id: i64, strategy: Strategy) -> Result<(), Box<dyn std::error::Error>> {
        let mut map = self.read_map();
        map.insert(user_id.to_string(), strategy.name().to_string());

        let contents = serde_json::to_string(&map)?;
        let mut file = fs::File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn read_map(&self) -> BTreeMap<String, String> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Backend;

    fn store_in(dir: &tempfile::TempDir) -> ModeStore {
        ModeStore::new(dir.path().join("user_modes.json"))
    }

    #[test]
    fn missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load(42), Strategy::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(42, Strategy::Composite).unwrap();
        store.save(7, Strategy::Single(Backend::DeepSeek)).unwrap();

        assert_eq!(store.load(42), Strategy::Composite);
        assert_eq!(store.load(7), Strategy::Single(Backend::DeepSeek));
        // Unknown users still default.
        assert_eq!(store.load(99), Strategy::default());
    }

    #[test]
    fn corrupt_file_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(42), Strategy::default());

        // And a save over a corrupt file still works.
        store.save(42, Strategy::Single(Backend::OpenRouter)).unwrap();
        assert_eq!(store.load(42), Strategy::Single(Backend::OpenRouter));
    }

    #[test]
    fn unknown_strategy_name_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"42":"quantum"}"#).unwrap();
        assert_eq!(store.load(42), Strategy::default());
    }
}
