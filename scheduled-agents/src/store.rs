//! Flat-file agent store
//!
//! All agent records live in one JSON file shaped `{ "agents": [...] }`.
//! A missing file is an empty store; a corrupt file is logged and treated
//! as empty rather than taking the service down. Saves go through a
//! temp-file rename so a crash mid-write cannot destroy the file.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agent::AgentRecord;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AgentsFile {
    #[serde(default)]
    agents: Vec<AgentRecord>,
}

/// JSON-file-backed agent store. Mutations serialize on an internal lock
/// so concurrent load-modify-save cycles cannot interleave.
pub struct AgentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AgentStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. Missing file -> empty; corrupt file -> empty
    /// with an error log.
    pub fn load(&self) -> Vec<AgentRecord> {
        if !self.path.exists() {
            warn!("Agents file not found at {}", self.path.display());
            return Vec::new();
        }

        match std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str::<AgentsFile>(&content).map_err(Into::into))
        {
            Ok(file) => {
                info!("Loaded {} agent(s) from {}", file.agents.len(), self.path.display());
                file.agents
            }
            Err(e) => {
                error!("Error loading agents from {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Replace the whole file atomically.
    pub fn save(&self, agents: &[AgentRecord]) -> Result<()> {
        let file = AgentsFile {
            agents: agents.to_vec(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub fn insert(&self, record: AgentRecord) -> Result<()> {
        let _guard = self.lock();
        let mut agents = self.load();
        agents.push(record);
        self.save(&agents)
    }

    pub fn get(&self, id: Uuid) -> Option<AgentRecord> {
        self.load().into_iter().find(|a| a.id == id)
    }

    /// Apply a mutation to one record, returning the updated record if it
    /// existed.
    pub fn update<F>(&self, id: Uuid, mutate: F) -> Result<Option<AgentRecord>>
    where
        F: FnOnce(&mut AgentRecord),
    {
        let _guard = self.lock();
        let mut agents = self.load();
        let Some(record) = agents.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        mutate(record);
        let updated = record.clone();
        self.save(&agents)?;
        Ok(Some(updated))
    }

    /// Remove a record; true when something was deleted.
    pub fn remove(&self, id: Uuid) -> Result<bool> {
        let _guard = self.lock();
        let mut agents = self.load();
        let before = agents.len();
        agents.retain(|a| a.id != id);
        if agents.len() == before {
            return Ok(false);
        }
        self.save(&agents)?;
        Ok(true)
    }

    /// Record a completed (or attempted) run.
    pub fn mark_ran(
        &self,
        id: Uuid,
        last_run: Option<DateTime<FixedOffset>>,
        next_run: Option<DateTime<FixedOffset>>,
    ) -> Result<()> {
        self.update(id, |record| {
            if last_run.is_some() {
                record.last_run = last_run;
            }
            record.next_run = next_run;
        })?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentStatus, PolymarketQuery, SourceQuery};
    use crate::schedule::Schedule;
    use chrono::TimeZone;

    fn sample_record(name: &str) -> AgentRecord {
        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        AgentRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            query: SourceQuery::Polymarket(PolymarketQuery {
                keyword: "fed".to_string(),
            }),
            schedule: Schedule::daily("07:30"),
            status: AgentStatus::Active,
            next_run: Some(offset.with_ymd_and_hms(2025, 12, 8, 7, 30, 0).unwrap()),
            last_run: None,
            created_at: offset.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap(),
        }
    }

    fn temp_store() -> (tempfile::TempDir, AgentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AgentStore::new(dir.path().join("agents.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_insert_and_roundtrip() {
        let (_dir, store) = temp_store();
        let record = sample_record("one");
        store.insert(record.clone()).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, record.id);
        assert_eq!(loaded[0].name, "one");

        // the file carries the expected envelope
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["agents"].is_array());
    }

    #[test]
    fn test_update_and_remove() {
        let (_dir, store) = temp_store();
        let record = sample_record("one");
        let id = record.id;
        store.insert(record).unwrap();

        let updated = store
            .update(id, |r| r.status = AgentStatus::Paused)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, AgentStatus::Paused);
        assert_eq!(store.get(id).unwrap().status, AgentStatus::Paused);

        assert!(store.remove(id).unwrap());
        assert!(!store.remove(id).unwrap());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, store) = temp_store();
        assert!(store.update(Uuid::new_v4(), |_| {}).unwrap().is_none());
    }

    #[test]
    fn test_mark_ran_keeps_last_run_on_failure() {
        let (_dir, store) = temp_store();
        let record = sample_record("one");
        let id = record.id;
        let previous_next = record.next_run;
        store.insert(record).unwrap();

        let offset = FixedOffset::east_opt(7 * 3600).unwrap();
        let ran_at = offset.with_ymd_and_hms(2025, 12, 8, 7, 31, 0).unwrap();
        let next = offset.with_ymd_and_hms(2025, 12, 9, 7, 30, 0).unwrap();

        // successful run records both
        store.mark_ran(id, Some(ran_at), Some(next)).unwrap();
        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.last_run, Some(ran_at));
        assert_eq!(loaded.next_run, Some(next));
        assert_ne!(loaded.next_run, previous_next);

        // failed run advances next_run only
        let later = offset.with_ymd_and_hms(2025, 12, 10, 7, 30, 0).unwrap();
        store.mark_ran(id, None, Some(later)).unwrap();
        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.last_run, Some(ran_at));
        assert_eq!(loaded.next_run, Some(later));
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_empty());
    }
}
