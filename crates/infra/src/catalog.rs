//! Generic in-memory catalog: an id-keyed row store with a sequence.
//!
//! The reference store for the portal. Rows are cloned out on read so the
//! lock is never held across caller code; ids are allocated from an atomic
//! sequence, matching database identity-column behavior.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

/// Id-keyed row catalog.
///
/// `K` is one of the typed id newtypes; `V` is the stored row.
#[derive(Debug)]
pub struct Catalog<K, V> {
    rows: RwLock<BTreeMap<K, V>>,
    seq: AtomicI64,
}

impl<K, V> Catalog<K, V>
where
    K: Copy + Ord + From<i64>,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            seq: AtomicI64::new(0),
        }
    }

    /// Allocate the next id and insert the row built for it.
    pub fn insert_with(&self, build: impl FnOnce(K) -> V) -> V {
        let id = K::from(self.seq.fetch_add(1, Ordering::Relaxed) + 1);
        let row = build(id);
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(id, row.clone());
        }
        row
    }

    pub fn get(&self, id: K) -> Option<V> {
        let rows = self.rows.read().ok()?;
        rows.get(&id).cloned()
    }

    /// Apply `edit` to the row, returning the updated copy.
    pub fn update(&self, id: K, edit: impl FnOnce(&mut V)) -> Option<V> {
        let mut rows = self.rows.write().ok()?;
        let row = rows.get_mut(&id)?;
        edit(row);
        Some(row.clone())
    }

    pub fn remove(&self, id: K) -> Option<V> {
        let mut rows = self.rows.write().ok()?;
        rows.remove(&id)
    }

    /// All rows in ascending id order.
    pub fn list(&self) -> Vec<V> {
        match self.rows.read() {
            Ok(rows) => rows.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Rows matching `keep`, in ascending id order.
    pub fn filter(&self, keep: impl Fn(&V) -> bool) -> Vec<V> {
        match self.rows.read() {
            Ok(rows) => rows.values().filter(|v| keep(v)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// First row matching `probe`, by ascending id.
    pub fn find(&self, probe: impl Fn(&V) -> bool) -> Option<V> {
        let rows = self.rows.read().ok()?;
        rows.values().find(|v| probe(v)).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for Catalog<K, V>
where
    K: Copy + Ord + From<i64>,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_core::TeamId;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: TeamId,
        name: String,
    }

    #[test]
    fn allocates_sequential_ids() {
        let catalog: Catalog<TeamId, Row> = Catalog::new();
        let a = catalog.insert_with(|id| Row {
            id,
            name: "a".into(),
        });
        let b = catalog.insert_with(|id| Row {
            id,
            name: "b".into(),
        });

        assert_eq!(a.id, TeamId::from_i64(1));
        assert_eq!(b.id, TeamId::from_i64(2));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn update_returns_the_edited_copy() {
        let catalog: Catalog<TeamId, Row> = Catalog::new();
        let row = catalog.insert_with(|id| Row {
            id,
            name: "old".into(),
        });

        let updated = catalog.update(row.id, |r| r.name = "new".into()).unwrap();
        assert_eq!(updated.name, "new");
        assert_eq!(catalog.get(row.id).unwrap().name, "new");
        assert!(catalog.update(TeamId::from_i64(99), |_| {}).is_none());
    }

    #[test]
    fn list_is_ordered_by_id() {
        let catalog: Catalog<TeamId, Row> = Catalog::new();
        for name in ["x", "y", "z"] {
            catalog.insert_with(|id| Row {
                id,
                name: name.into(),
            });
        }
        let names: Vec<String> = catalog.list().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }
}
