// src/state.rs
//! Persisted ledger of already-notified items, keyed by user and category
//! and capped per category so the file stays small.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::client::Category;

const MAX_IDS_PER_CATEGORY: usize = 50;

type SeenMap = HashMap<String, HashMap<String, VecDeque<String>>>;

#[derive(Debug)]
pub struct State {
    path: PathBuf,
    seen: SeenMap,
}

impl State {
    /// Load the ledger from disk. A missing or corrupt file starts empty;
    /// polling must not die because of a bad state file.
    pub fn load(path: &Path) -> Self {
        let seen = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<SeenMap>(&raw) {
                Ok(mut seen) => {
                    for categories in seen.values_mut() {
                        for ids in categories.values_mut() {
                            while ids.len() > MAX_IDS_PER_CATEGORY {
                                ids.pop_front();
                            }
                        }
                    }
                    seen
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse state file; starting empty");
                    SeenMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SeenMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read state file; starting empty");
                SeenMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            seen,
        }
    }

    pub fn has_entries(&self, mid: u64) -> bool {
        self.seen
            .get(&mid.to_string())
            .is_some_and(|categories| categories.values().any(|ids| !ids.is_empty()))
    }

    pub fn is_seen(&self, mid: u64, category: Category, item_id: &str) -> bool {
        self.seen
            .get(&mid.to_string())
            .and_then(|categories| categories.get(category.as_str()))
            .is_some_and(|ids| ids.iter().any(|id| id == item_id))
    }

    pub fn remember(&mut self, mid: u64, category: Category, item_id: &str) {
        let ids = self
            .seen
            .entry(mid.to_string())
            .or_default()
            .entry(category.as_str().to_string())
            .or_default();
        if ids.iter().any(|id| id == item_id) {
            return;
        }
        ids.push_back(item_id.to_string());
        while ids.len() > MAX_IDS_PER_CATEGORY {
            ids.pop_front();
        }
    }

    pub fn bulk_remember<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (u64, Category, &'a str)>,
    {
        for (mid, category, item_id) in entries {
            self.remember(mid, category, item_id);
        }
    }

    /// Persist the ledger; failures are logged, never fatal.
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    error!(path = %self.path.display(), error = %err, "failed to create state directory");
                    return;
                }
            }
        }
        match serde_json::to_string_pretty(&self.seen) {
            Ok(data) => {
                if let Err(err) = fs::write(&self.path, data) {
                    error!(path = %self.path.display(), error = %err, "failed to save state file");
                }
            }
            Err(err) => error!(error = %err, "failed to serialize state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_and_query() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let mut state = State::load(&path);

        assert!(!state.has_entries(1));
        state.remember(1, Category::Video, "BV1");
        assert!(state.has_entries(1));
        assert!(state.is_seen(1, Category::Video, "BV1"));
        assert!(!state.is_seen(1, Category::Dynamic, "BV1"));
        assert!(!state.is_seen(2, Category::Video, "BV1"));

        // Duplicates are not stored twice.
        state.remember(1, Category::Video, "BV1");
        state.save();

        let reloaded = State::load(&path);
        assert!(reloaded.is_seen(1, Category::Video, "BV1"));
    }

    #[test]
    fn cap_drops_oldest_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut state = State::load(&dir.path().join("state.json"));
        for i in 0..(MAX_IDS_PER_CATEGORY + 5) {
            state.remember(1, Category::Article, &format!("cv{i}"));
        }
        assert!(!state.is_seen(1, Category::Article, "cv0"));
        assert!(!state.is_seen(1, Category::Article, "cv4"));
        assert!(state.is_seen(1, Category::Article, "cv5"));
        assert!(state.is_seen(1, Category::Article, "cv54"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").expect("write");
        let state = State::load(&path);
        assert!(!state.has_entries(1));
    }
}
