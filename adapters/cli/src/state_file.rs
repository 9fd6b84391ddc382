//! File-backed [`StateStore`] holding one `key envelope` pair per line.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use draft_wheel_world::persistence::StateStore;

/// Stores draw snapshots in a single text file.
#[derive(Debug)]
pub(crate) struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> io::Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => return Err(error),
        };

        let mut entries = BTreeMap::new();
        for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let Some((key, value)) = line.split_once(' ') else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed state line in {}", self.path.display()),
                ));
            };
            let _ = entries.insert(key.to_owned(), value.trim().to_owned());
        }
        Ok(entries)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
                _ => Ok(()),
            };
        }

        let mut contents = String::new();
        for (key, value) in entries {
            contents.push_str(key);
            contents.push(' ');
            contents.push_str(value);
            contents.push('\n');
        }

        let staging = self.path.with_extension("tmp");
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)
    }
}

impl StateStore for FileStore {
    type Error = io::Error;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.read_entries()?.remove(key))
    }

    fn store(&mut self, key: &str, value: String) -> Result<(), Self::Error> {
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("state key `{key}` must be a single non-empty word"),
            ));
        }
        let mut entries = self.read_entries()?;
        let _ = entries.insert(key.to_owned(), value);
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draft_wheel_core::{Roll, SegmentColor};
    use draft_wheel_world::{persistence, DrawState, Roster, RosterEntry};
    use std::process;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("draft-wheel-{}-{name}.state", process::id()))
    }

    #[test]
    fn saves_and_reloads_sessions() {
        let path = scratch_path("roundtrip");
        let mut store = FileStore::new(&path);
        let mut state = DrawState::new(
            Roster::new(vec![
                RosterEntry::raw("A", 3.0, SegmentColor::from_rgb(1, 2, 3)),
                RosterEntry::raw("B", 1.0, SegmentColor::from_rgb(4, 5, 6)),
            ])
            .expect("valid roster"),
        );
        let _ = state.draw(Roll::new(3.5)).expect("draw succeeds");

        persistence::save(&mut store, "session", &state).expect("save succeeds");
        let restored = persistence::load(&store, "session")
            .expect("load succeeds")
            .expect("session present");
        assert_eq!(restored, state);

        store.remove("session").expect("remove succeeds");
        assert!(!path.exists(), "empty store removes its file");
        assert_eq!(store.load("session").expect("load succeeds"), None);
    }

    #[test]
    fn keeps_unrelated_keys() {
        let path = scratch_path("keys");
        let mut store = FileStore::new(&path);
        store.store("first", "one".to_owned()).expect("store");
        store.store("second", "two".to_owned()).expect("store");
        store.remove("first").expect("remove");

        assert_eq!(store.load("second").expect("load"), Some("two".to_owned()));
        assert!(store.store("bad key", "x".to_owned()).is_err());
        store.remove("second").expect("remove");
    }
}
