use crate::domain::calendar::DateKey;
use crate::domain::models::{DaySnapshot, ScheduleTemplate};
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistent `date -> snapshot` history.
///
/// Every method works on copies: a snapshot returned by `get`/`load` is never
/// shared with what the store holds, and nothing is written except through
/// `save`, `save_all` and `clear_all`.
pub trait DayStore: Send + Sync {
    fn template(&self) -> &ScheduleTemplate;
    fn get(&self, key: &DateKey) -> Result<Option<DaySnapshot>, InfraError>;
    fn save(&self, key: &DateKey, snapshot: &DaySnapshot) -> Result<(), InfraError>;
    fn clear_all(&self) -> Result<(), InfraError>;
    fn keys(&self) -> Result<Vec<DateKey>, InfraError>;

    fn save_all(&self, entries: &[(DateKey, DaySnapshot)]) -> Result<(), InfraError> {
        for (key, snapshot) in entries {
            self.save(key, snapshot)?;
        }
        Ok(())
    }

    /// Stored snapshot for `key`, or a fresh template copy. A stored payload
    /// that no longer decodes is treated as absent.
    fn load(&self, key: &DateKey) -> Result<DaySnapshot, InfraError> {
        match self.get(key) {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Ok(self.template().clone_template()),
            Err(InfraError::Json(error)) => {
                tracing::warn!(date = %key, %error, "stored snapshot is malformed, using template");
                Ok(self.template().clone_template())
            }
            Err(error) => Err(error),
        }
    }
}

fn validate_for_save(key: &DateKey, snapshot: &DaySnapshot) -> Result<(), InfraError> {
    snapshot
        .validate()
        .map_err(|error| InfraError::InvalidInput(format!("snapshot for {key} is invalid: {error}")))
}

#[derive(Debug, Clone)]
pub struct SqliteDayStore {
    db_path: PathBuf,
    template: ScheduleTemplate,
}

impl SqliteDayStore {
    pub fn new(db_path: impl AsRef<Path>, template: ScheduleTemplate) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            template,
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

const UPSERT_SQL: &str = "INSERT INTO day_snapshots (date_key, blocks_json, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(date_key) DO UPDATE SET
       blocks_json = excluded.blocks_json,
       updated_at = excluded.updated_at";

impl DayStore for SqliteDayStore {
    fn template(&self) -> &ScheduleTemplate {
        &self.template
    }

    fn get(&self, key: &DateKey) -> Result<Option<DaySnapshot>, InfraError> {
        let connection = self.connect()?;
        let raw: Option<String> = connection
            .query_row(
                "SELECT blocks_json FROM day_snapshots WHERE date_key = ?1",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, key: &DateKey, snapshot: &DaySnapshot) -> Result<(), InfraError> {
        validate_for_save(key, snapshot)?;
        let payload = serde_json::to_string(snapshot)?;
        let connection = self.connect()?;
        connection.execute(
            UPSERT_SQL,
            params![key.to_string(), payload, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(date = %key, blocks = snapshot.len(), "saved day snapshot");
        Ok(())
    }

    fn save_all(&self, entries: &[(DateKey, DaySnapshot)]) -> Result<(), InfraError> {
        for (key, snapshot) in entries {
            validate_for_save(key, snapshot)?;
        }
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let updated_at = Utc::now().to_rfc3339();
        for (key, snapshot) in entries {
            let payload = serde_json::to_string(snapshot)?;
            transaction.execute(UPSERT_SQL, params![key.to_string(), payload, updated_at])?;
        }
        transaction.commit()?;
        Ok(())
    }

    fn clear_all(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let removed = connection.execute("DELETE FROM day_snapshots", [])?;
        tracing::debug!(removed, "cleared day snapshots");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<DateKey>, InfraError> {
        let connection = self.connect()?;
        let mut statement =
            connection.prepare("SELECT date_key FROM day_snapshots ORDER BY date_key")?;
        let raw_keys = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(raw_keys
            .iter()
            .filter_map(|raw| match DateKey::parse(raw) {
                Ok(key) => Some(key),
                Err(error) => {
                    tracing::warn!(%error, "skipping stored row with a non-canonical date key");
                    None
                }
            })
            .collect())
    }
}

#[derive(Debug)]
pub struct InMemoryDayStore {
    template: ScheduleTemplate,
    days: Mutex<BTreeMap<DateKey, DaySnapshot>>,
}

impl InMemoryDayStore {
    pub fn new(template: ScheduleTemplate) -> Self {
        Self {
            template,
            days: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock_days(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<DateKey, DaySnapshot>>, InfraError> {
        self.days
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("day store lock poisoned: {error}")))
    }
}

impl Default for InMemoryDayStore {
    fn default() -> Self {
        Self::new(ScheduleTemplate::builtin())
    }
}

impl DayStore for InMemoryDayStore {
    fn template(&self) -> &ScheduleTemplate {
        &self.template
    }

    fn get(&self, key: &DateKey) -> Result<Option<DaySnapshot>, InfraError> {
        Ok(self.lock_days()?.get(key).cloned())
    }

    fn save(&self, key: &DateKey, snapshot: &DaySnapshot) -> Result<(), InfraError> {
        validate_for_save(key, snapshot)?;
        self.lock_days()?.insert(*key, snapshot.clone());
        Ok(())
    }

    fn clear_all(&self) -> Result<(), InfraError> {
        self.lock_days()?.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<DateKey>, InfraError> {
        Ok(self.lock_days()?.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Block, BlockDraft};
    use crate::infrastructure::storage::initialize_database;
    use proptest::prelude::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "planner-store-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("planner.sqlite");
            initialize_database(&path).expect("initialize database");
            Self { dir, path }
        }

        fn store(&self) -> SqliteDayStore {
            SqliteDayStore::new(&self.path, ScheduleTemplate::builtin())
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn key(day: u32) -> DateKey {
        DateKey::from_ymd(2026, 2, day).expect("valid date")
    }

    fn edited_day() -> DaySnapshot {
        ScheduleTemplate::builtin()
            .clone_template()
            .toggle_done("t1")
            .rename_block("t2", "Follow-ups")
            .edit_sub_item("t3", 0, "Control Systems")
            .add_block(&BlockDraft::default(), "x-1".to_string())
    }

    #[test]
    fn sqlite_save_then_load_roundtrips() {
        let database = TempDatabase::new();
        let store = database.store();
        let snapshot = edited_day();

        store.save(&key(16), &snapshot).expect("save snapshot");
        assert_eq!(store.load(&key(16)).expect("load snapshot"), snapshot);
        assert_eq!(store.keys().expect("keys"), vec![key(16)]);
    }

    #[test]
    fn load_of_unknown_day_returns_template_without_persisting() {
        let database = TempDatabase::new();
        let store = database.store();

        let loaded = store.load(&key(3)).expect("load default");
        assert_eq!(loaded, ScheduleTemplate::builtin().clone_template());
        assert!(store.get(&key(3)).expect("get").is_none());
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn saving_one_day_leaves_other_days_untouched() {
        let database = TempDatabase::new();
        let store = database.store();
        let first = edited_day();
        store.save(&key(1), &first).expect("save first");

        let second = ScheduleTemplate::builtin().clone_template().toggle_done("t5");
        store.save(&key(2), &second).expect("save second");
        store
            .save(&key(2), &second.toggle_done("t4"))
            .expect("overwrite second");

        assert_eq!(store.load(&key(1)).expect("load first"), first);
        assert_eq!(store.keys().expect("keys"), vec![key(1), key(2)]);
    }

    #[test]
    fn clear_all_then_load_returns_template() {
        let database = TempDatabase::new();
        let store = database.store();
        store.save(&key(5), &edited_day()).expect("save");

        store.clear_all().expect("clear all");
        assert!(store.keys().expect("keys").is_empty());
        assert_eq!(
            store.load(&key(5)).expect("load"),
            ScheduleTemplate::builtin().clone_template()
        );
    }

    #[test]
    fn malformed_row_falls_back_to_template() {
        let database = TempDatabase::new();
        let store = database.store();
        let connection = Connection::open(&database.path).expect("open database");
        connection
            .execute(
                "INSERT INTO day_snapshots (date_key, blocks_json, updated_at) VALUES (?1, ?2, ?3)",
                params!["2026-02-09", "{not json", "2026-02-09T00:00:00Z"],
            )
            .expect("insert malformed row");

        assert!(matches!(store.get(&key(9)), Err(InfraError::Json(_))));
        assert_eq!(
            store.load(&key(9)).expect("load"),
            ScheduleTemplate::builtin().clone_template()
        );
    }

    #[test]
    fn save_rejects_duplicate_ids() {
        let store = InMemoryDayStore::default();
        let invalid = DaySnapshot::new(vec![Block::work("a", "One", 30), Block::work("a", "Two", 30)]);
        assert!(matches!(
            store.save(&key(1), &invalid),
            Err(InfraError::InvalidInput(_))
        ));
        assert!(store.keys().expect("keys").is_empty());
    }

    #[test]
    fn sqlite_save_all_is_applied_together() {
        let database = TempDatabase::new();
        let store = database.store();
        let entries = vec![(key(1), edited_day()), (key(2), edited_day().unmark_all())];
        store.save_all(&entries).expect("save all");
        assert_eq!(store.keys().expect("keys"), vec![key(1), key(2)]);

        let rejected = vec![
            (key(3), edited_day()),
            (
                key(4),
                DaySnapshot::new(vec![Block::work("a", "One", 0)]),
            ),
        ];
        assert!(store.save_all(&rejected).is_err());
        assert!(store.get(&key(3)).expect("get").is_none());
    }

    #[test]
    fn loaded_copy_is_not_aliased_with_store() {
        let store = InMemoryDayStore::default();
        store.save(&key(7), &edited_day()).expect("save");
        let changed = store.load(&key(7)).expect("load").rename_block("t1", "local only");
        assert_ne!(store.load(&key(7)).expect("reload"), changed);
    }

    proptest! {
        #[test]
        fn in_memory_save_then_load_roundtrips(
            day in 1u32..28,
            titles in proptest::collection::vec("[a-z ]{0,12}", 1..10),
            done_mask in proptest::collection::vec(any::<bool>(), 10)
        ) {
            let blocks = titles
                .iter()
                .enumerate()
                .map(|(index, title)| Block {
                    done: done_mask[index],
                    ..Block::work(&format!("b{index}"), title, 30)
                })
                .collect::<Vec<_>>();
            let snapshot = DaySnapshot::new(blocks);
            let store = InMemoryDayStore::default();
            store.save(&key(day), &snapshot).expect("save");
            prop_assert_eq!(store.load(&key(day)).expect("load"), snapshot);
        }
    }
}
