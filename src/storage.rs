// Manages the local events file.
//
// The store only knows "load everything" and "save everything"; the helpers
// below are read-modify-write cycles done under one file lock.
use crate::context::AppContext;
use crate::model::{Event, EventPatch};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(ctx: &dyn AppContext) -> Result<Self> {
        Ok(Self {
            path: ctx.get_events_path()?,
        })
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock on a sidecar `.lock` file.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    fn read_unlocked(&self) -> Result<Vec<Event>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if json.trim().is_empty() {
            return Ok(vec![]);
        }
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write_unlocked(&self, events: &[Event]) -> Result<()> {
        let json = serde_json::to_string_pretty(events)?;
        Self::atomic_write(&self.path, json)
    }

    pub fn load(&self) -> Result<Vec<Event>> {
        Self::with_lock(&self.path, || self.read_unlocked())
    }

    pub fn save(&self, events: &[Event]) -> Result<()> {
        Self::with_lock(&self.path, || self.write_unlocked(events))
    }

    fn modify<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Event>) -> Result<T>,
    {
        Self::with_lock(&self.path, || {
            let mut events = self.read_unlocked()?;
            let out = f(&mut events)?;
            self.write_unlocked(&events)?;
            Ok(out)
        })
    }

    /// Appends events, giving a fresh id to any that has none. Returns the stored copies.
    pub fn add(&self, new_events: Vec<Event>) -> Result<Vec<Event>> {
        self.modify(|events| {
            let mut added = Vec::with_capacity(new_events.len());
            for mut ev in new_events {
                if ev.id.trim().is_empty() {
                    ev.id = Uuid::new_v4().to_string();
                }
                events.push(ev.clone());
                added.push(ev);
            }
            log::info!("Stored {} new event(s)", added.len());
            Ok(added)
        })
    }

    pub fn find(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.load()?.into_iter().find(|e| e.id == id))
    }

    pub fn update(&self, id: &str, patch: &EventPatch) -> Result<Event> {
        self.modify(|events| {
            let ev = events
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| anyhow::anyhow!("Event {} does not exist", id))?;
            ev.apply_patch(patch);
            Ok(ev.clone())
        })
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.modify(|events| {
            let before = events.len();
            events.retain(|e| e.id != id);
            if events.len() == before {
                return Err(anyhow::anyhow!("Event {} does not exist", id));
            }
            Ok(())
        })
    }
}
