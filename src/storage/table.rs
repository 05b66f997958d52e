//! In-memory keyed table backing each JSON collection
//!
//! Repositories hold one `Table` per collection behind an `RwLock` and
//! serialize all of them to a single file on save.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::TaxboxError;

/// A stored record with a primary key
pub trait Keyed: Clone {
    type Key: Copy + Eq + Hash;

    fn key(&self) -> Self::Key;
}

pub struct Table<T: Keyed> {
    rows: RwLock<HashMap<T::Key, T>>,
}

impl<T: Keyed> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Keyed> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<T::Key, T>>, TaxboxError> {
        self.rows
            .read()
            .map_err(|e| TaxboxError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<T::Key, T>>, TaxboxError> {
        self.rows
            .write()
            .map_err(|e| TaxboxError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Replace every row, used when loading from disk
    pub fn replace_all(&self, rows: Vec<T>) -> Result<(), TaxboxError> {
        let mut map = self.write()?;
        map.clear();
        for row in rows {
            map.insert(row.key(), row);
        }
        Ok(())
    }

    pub fn get(&self, key: T::Key) -> Result<Option<T>, TaxboxError> {
        Ok(self.read()?.get(&key).cloned())
    }

    /// First row matching `pred`
    pub fn find<F>(&self, pred: F) -> Result<Option<T>, TaxboxError>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.read()?.values().find(|row| pred(row)).cloned())
    }

    /// Every row matching `pred`, in no particular order
    pub fn filter<F>(&self, pred: F) -> Result<Vec<T>, TaxboxError>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self
            .read()?
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect())
    }

    pub fn all(&self) -> Result<Vec<T>, TaxboxError> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// Rows sorted by `sort_key`, for stable files and listings
    pub fn sorted_by_key<K, F>(&self, sort_key: F) -> Result<Vec<T>, TaxboxError>
    where
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut rows = self.all()?;
        rows.sort_by_key(|row| sort_key(row));
        Ok(rows)
    }

    pub fn upsert(&self, row: T) -> Result<(), TaxboxError> {
        self.write()?.insert(row.key(), row);
        Ok(())
    }

    pub fn remove(&self, key: T::Key) -> Result<Option<T>, TaxboxError> {
        Ok(self.write()?.remove(&key))
    }

    /// Remove every row matching `pred`, returning what was removed
    pub fn remove_where<F>(&self, pred: F) -> Result<Vec<T>, TaxboxError>
    where
        F: Fn(&T) -> bool,
    {
        let mut map = self.write()?;
        let keys: Vec<T::Key> = map
            .iter()
            .filter(|(_, row)| pred(row))
            .map(|(key, _)| *key)
            .collect();
        Ok(keys.into_iter().filter_map(|key| map.remove(&key)).collect())
    }

    pub fn count(&self) -> Result<usize, TaxboxError> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
    }

    impl Keyed for Row {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }
    }

    fn table() -> Table<Row> {
        let table = Table::new();
        table
            .replace_all(vec![
                Row { id: 2, name: "b" },
                Row { id: 1, name: "a" },
                Row { id: 3, name: "c" },
            ])
            .unwrap();
        table
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let t = table();
        t.upsert(Row { id: 1, name: "z" }).unwrap();
        assert_eq!(t.count().unwrap(), 3);
        assert_eq!(t.get(1).unwrap().unwrap().name, "z");
    }

    #[test]
    fn test_sorted_and_filter() {
        let t = table();
        let names: Vec<_> = t.sorted_by_key(|r| r.id).unwrap().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(t.filter(|r| r.id > 1).unwrap().len(), 2);
        assert_eq!(t.find(|r| r.name == "c").unwrap().map(|r| r.id), Some(3));
    }

    #[test]
    fn test_remove_where() {
        let t = table();
        let removed = t.remove_where(|r| r.id != 2).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(t.count().unwrap(), 1);
        assert!(t.remove(2).unwrap().is_some());
        assert!(t.remove(2).unwrap().is_none());
    }
}
