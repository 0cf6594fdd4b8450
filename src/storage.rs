use crate::models::{Database, Shift};
use anyhow::Result;
use chrono::{Duration, Local, NaiveTime};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Backing store for the shift database.
pub trait Persistence {
    fn load(&self) -> Result<Database>;
    fn save(&self, db: &Database) -> Result<()>;
}

pub fn get_base_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let path = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let mut path = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
            path.push(".horarios");
            path
        }
    };
    if !path.exists() {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

/// Reads a JSON document, falling back to its default when the file is absent.
pub fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Writes through a temp file so a crash never leaves a half-written document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[derive(Clone, Debug)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(base_dir: &Path) -> Self {
        Self::from_path(base_dir.join("db.json"))
    }

    pub fn from_path(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                let _ = fs::create_dir_all(parent);
            }
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonStorage {
    fn load(&self) -> Result<Database> {
        read_json(&self.path)
    }

    fn save(&self, db: &Database) -> Result<()> {
        write_json(&self.path, db)
    }
}

/// Keeps the last saved database in memory. Clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    saved: Arc<Mutex<Database>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ten shifts on consecutive days from today, four hours each.
    pub fn with_sample() -> Self {
        let now = Local::now().naive_local();
        let start = now.date().and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN));
        let shifts = (0..10)
            .map(|i| {
                let begin = start + Duration::days(i);
                Shift::new_at(&format!("Employee {}", i + 1), begin, begin + Duration::hours(4))
            })
            .collect();
        Self {
            saved: Arc::new(Mutex::new(Database { shifts })),
        }
    }

    pub fn snapshot(&self) -> Database {
        self.saved.lock().map(|db| db.clone()).unwrap_or_default()
    }
}

impl Persistence for MemoryStorage {
    fn load(&self) -> Result<Database> {
        Ok(self.snapshot())
    }

    fn save(&self, db: &Database) -> Result<()> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))?;
        *saved = db.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_shift() -> Shift {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        Shift::on_date(
            "Ana",
            date,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_storage_save_load() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path());

        let mut db = Database::default();
        let shift = sample_shift();
        db.shifts.push(shift.clone());

        storage.save(&db)?;

        let loaded = storage.load()?;
        assert_eq!(loaded.shifts, vec![shift]);
        assert!(!storage.path().with_extension("tmp").exists());

        Ok(())
    }

    #[test]
    fn test_storage_load_nonexistent() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::from_path(dir.path().join("nested").join("db.json"));

        let db = storage.load()?;
        assert!(db.shifts.is_empty());

        Ok(())
    }

    #[test]
    fn test_storage_load_corrupt() -> Result<()> {
        let dir = tempdir()?;
        let storage = JsonStorage::new(dir.path());
        fs::write(storage.path(), "{ not json")?;

        assert!(storage.load().is_err());

        Ok(())
    }

    #[test]
    fn test_memory_storage_clones_share_state() -> Result<()> {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        let mut db = Database::default();
        db.shifts.push(sample_shift());
        storage.save(&db)?;

        assert_eq!(other.load()?.shifts.len(), 1);
        Ok(())
    }

    #[test]
    fn test_sample_data() {
        let db = MemoryStorage::with_sample().snapshot();
        assert_eq!(db.shifts.len(), 10);
        assert!(db
            .shifts
            .iter()
            .all(|s| s.duration() == Duration::hours(4)));
        assert!(db.shifts.windows(2).all(|w| w[0].date() < w[1].date()));
    }
}
