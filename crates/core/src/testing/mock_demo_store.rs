//! In-memory demo store for testing.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::demo::{Demo, DemoError, DemoId, DemoStore, TaskId};

#[derive(Debug, Default)]
struct Inner {
    demos: BTreeMap<DemoId, Demo>,
    next_demo_id: DemoId,
    next_task_id: TaskId,
    saves: usize,
}

/// In-memory implementation of the DemoStore trait.
///
/// Follows the same id and version rules as the SQLite store:
/// - ids are assigned on first save, for the demo and each new task
/// - a save of a stale version fails with `ConcurrentModification`
///
/// [`InMemoryDemoStore::bump_version`] simulates a concurrent writer.
///
/// # Example
///
/// ```rust,ignore
/// use demolot_core::testing::InMemoryDemoStore;
///
/// let store = InMemoryDemoStore::new();
/// let saved = store.save(&demo)?;
/// store.bump_version(saved.id.unwrap());
/// assert!(store.save(&saved).is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDemoStore {
    inner: Mutex<Inner>,
}

impl InMemoryDemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("demo store lock poisoned")
    }

    /// Increment the stored version as if another writer had saved the demo.
    pub fn bump_version(&self, id: DemoId) {
        if let Some(demo) = self.lock().demos.get_mut(&id) {
            demo.version += 1;
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }
}

impl DemoStore for InMemoryDemoStore {
    fn exists(&self, id: DemoId) -> Result<bool, DemoError> {
        Ok(self.lock().demos.contains_key(&id))
    }

    fn get(&self, id: DemoId) -> Result<Option<Demo>, DemoError> {
        Ok(self.lock().demos.get(&id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Demo>, DemoError> {
        Ok(self.lock().demos.values().rev().cloned().collect())
    }

    fn save(&self, demo: &Demo) -> Result<Demo, DemoError> {
        let mut inner = self.lock();
        let mut stored = demo.clone();

        match demo.id {
            None => {
                inner.next_demo_id += 1;
                stored.id = Some(inner.next_demo_id);
                stored.version = 1;
            }
            Some(id) => {
                let current = inner.demos.get(&id).ok_or(DemoError::NotFound(id))?;
                if current.version != demo.version {
                    return Err(DemoError::ConcurrentModification { demo_id: id });
                }
                for task_id in demo.tasks.iter().filter_map(|t| t.id) {
                    if current.task(task_id).is_none() {
                        return Err(DemoError::TaskNotFound {
                            demo_id: id,
                            task_id,
                        });
                    }
                }
                stored.version = demo.version + 1;
            }
        }

        for task in stored.tasks.iter_mut().filter(|t| t.id.is_none()) {
            inner.next_task_id += 1;
            task.id = Some(inner.next_task_id);
        }

        let id = stored.id.unwrap_or_default();
        inner.demos.insert(id, stored.clone());
        inner.saves += 1;
        Ok(stored)
    }

    fn delete(&self, id: DemoId) -> Result<(), DemoError> {
        self.lock()
            .demos
            .remove(&id)
            .map(|_| ())
            .ok_or(DemoError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{DemoPatch, TaskPatch};

    fn new_demo() -> Demo {
        let mut demo = Demo::from_patch(DemoPatch::new("Sprint"));
        demo.upsert_task(TaskPatch::new("A", "Task A", 1)).unwrap();
        demo
    }

    #[test]
    fn test_save_assigns_ids_and_version() {
        let store = InMemoryDemoStore::new();
        let saved = store.save(&new_demo()).unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.version, 1);
        assert!(saved.tasks[0].id.is_some());
        assert_eq!(store.get(1).unwrap(), Some(saved));
    }

    #[test]
    fn test_stale_save_rejected() {
        let store = InMemoryDemoStore::new();
        let saved = store.save(&new_demo()).unwrap();
        let id = saved.id.unwrap();

        store.bump_version(id);
        let result = store.save(&saved);
        assert!(matches!(
            result,
            Err(DemoError::ConcurrentModification { demo_id }) if demo_id == id
        ));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_find_all_newest_first() {
        let store = InMemoryDemoStore::new();
        store.save(&new_demo()).unwrap();
        store.save(&new_demo()).unwrap();

        let ids: Vec<_> = store.find_all().unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_delete_unknown() {
        let store = InMemoryDemoStore::new();
        assert!(matches!(store.delete(3), Err(DemoError::NotFound(3))));
    }
}
