use std::{
    fmt::Display,
    hash::Hash,
    sync::atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{EntityKind, ServiceError, ServiceResult};

struct StoredEntity<V> {
    seq: u64,
    value: V,
}

/// Keyed in-memory records guarded per shard. Listing follows insertion order.
pub struct EntityStore<K, V> {
    kind: EntityKind,
    entries: DashMap<K, StoredEntity<V>>,
    next_seq: AtomicU64,
}

impl<K, V> EntityStore<K, V>
where
    K: Hash + Eq + Clone + Display,
    V: Clone,
{
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn not_found<R>(&self, key: &K) -> ServiceResult<R> {
        ServiceError::not_found(self.kind, key.to_string())
    }

    pub fn insert(&self, key: K, value: V) -> ServiceResult<()> {
        match self.entries.entry(key) {
            Entry::Occupied(e) => {
                ServiceError::conflict(format!("{} {} already exists", self.kind, e.key()))
            }
            Entry::Vacant(e) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                e.insert(StoredEntity { seq, value });
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &K) -> ServiceResult<V> {
        match self.entries.get(key) {
            Some(entry) => Ok(entry.value.clone()),
            None => self.not_found(key),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> Vec<V> {
        let mut snapshot: Vec<(u64, V)> = self
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.value.clone()))
            .collect();
        snapshot.sort_by_key(|(seq, _)| *seq);
        snapshot.into_iter().map(|(_, value)| value).collect()
    }

    /// Runs `f` on a copy of the record while holding its write guard.
    /// The copy replaces the record only if `f` succeeds.
    pub fn update<F>(&self, key: &K, f: F) -> ServiceResult<V>
    where
        F: FnOnce(&mut V) -> ServiceResult<()>,
    {
        let Some(mut entry) = self.entries.get_mut(key) else {
            return self.not_found(key);
        };
        let mut draft = entry.value.clone();
        f(&mut draft)?;
        entry.value = draft.clone();
        Ok(draft)
    }

    /// Removes the record if `check` accepts it, atomically with respect to `update`.
    pub fn remove_if<F>(&self, key: &K, check: F) -> ServiceResult<V>
    where
        F: FnOnce(&V) -> ServiceResult<()>,
    {
        let mut verdict = None;
        let removed = self.entries.remove_if(key, |_, entry| {
            let result = check(&entry.value);
            let accepted = result.is_ok();
            verdict = Some(result);
            accepted
        });
        match (removed, verdict) {
            (Some((_, entry)), _) => Ok(entry.value),
            (None, Some(Err(e))) => Err(e),
            _ => self.not_found(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EntityStore<String, u32> {
        EntityStore::new(EntityKind::Game)
    }

    #[test]
    fn test_insert_and_get() {
        let store = store();
        store.insert("a".to_string(), 1).unwrap();
        assert_eq!(store.get(&"a".to_string()), Ok(1));
        assert!(matches!(
            store.insert("a".to_string(), 2),
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            store.get(&"b".to_string()),
            Err(ServiceError::NotFound {
                kind: EntityKind::Game,
                ..
            })
        ));
    }

    #[test]
    fn test_values_keep_insertion_order() {
        let store = store();
        for (i, key) in ["z", "m", "a", "q"].iter().enumerate() {
            store.insert(key.to_string(), i as u32).unwrap();
        }
        assert_eq!(store.values(), vec![0, 1, 2, 3]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let store = store();
        store.insert("a".to_string(), 1).unwrap();
        let result = store.update(&"a".to_string(), |v| {
            *v = 99;
            ServiceError::conflict("nope")
        });
        assert!(result.is_err());
        assert_eq!(store.get(&"a".to_string()), Ok(1));

        let updated = store.update(&"a".to_string(), |v| {
            *v += 1;
            Ok(())
        });
        assert_eq!(updated, Ok(2));
        assert_eq!(store.get(&"a".to_string()), Ok(2));
    }

    #[test]
    fn test_remove_if() {
        let store = store();
        store.insert("a".to_string(), 1).unwrap();
        let rejected = store.remove_if(&"a".to_string(), |_| {
            ServiceError::invalid_state("in use")
        });
        assert!(matches!(
            rejected,
            Err(ServiceError::InvalidStateTransition(_))
        ));
        assert_eq!(store.get(&"a".to_string()), Ok(1));

        assert_eq!(store.remove_if(&"a".to_string(), |_| Ok(())), Ok(1));
        assert!(store.is_empty());
        assert!(matches!(
            store.remove_if(&"a".to_string(), |_| Ok(())),
            Err(ServiceError::NotFound { .. })
        ));
    }
}
