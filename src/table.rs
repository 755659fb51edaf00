//! A lightweight named view onto a [`Database`](crate::database::Database).
//!
//! `Table` borrows the database exclusively for as long as it lives; that
//! borrow is a Rust ownership device, not a logical mutation — `get`,
//! `keys`, `as_map` and `len` never append to the log.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::database::Database;

pub struct Table<'a> {
    name: String,
    db: &'a mut Database,
}

impl<'a> Table<'a> {
    pub(crate) fn new(name: String, db: &'a mut Database) -> Self {
        Self { name, db }
    }

    /// The table's current name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up `key`, deserialising its stored value into `T` if present.
    ///
    /// A stored value that cannot deserialise into `T` is a programmer
    /// error (a type mismatch), not file corruption, and panics.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let idx = self.db.cell_index(&self.name, key)?;
        let raw = self.db.log()[idx]
            .val
            .clone()
            .expect("update entry referenced by the index always carries a value");
        Some(serde_json::from_value(raw).expect("stored value does not match requested type"))
    }

    /// Whether `key` is currently present in the table.
    pub fn contains(&self, key: &str) -> bool {
        self.db.cell_index(&self.name, key).is_some()
    }

    /// Keys currently in the table, lexicographically sorted.
    pub fn keys(&self) -> Vec<String> {
        self.db.table_keys(&self.name)
    }

    /// A fresh map of every value in the table, deserialised as `T`.
    /// Independent of the table: mutating the returned map cannot affect it.
    pub fn as_map<T: DeserializeOwned>(&self) -> BTreeMap<String, T> {
        self.db
            .table_snapshot(&self.name)
            .into_iter()
            .map(|(k, v)| {
                let typed = serde_json::from_value(v)
                    .expect("stored value does not match requested type");
                (k, typed)
            })
            .collect()
    }

    /// Sets `table[key] = value`, appending an `update` entry. Returns
    /// `true` iff `key` was not already present.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> bool {
        let json = serde_json::to_value(value).expect("value must be JSON-encodable");
        self.db.set_cell(&self.name, key, json)
    }

    /// Sets every `(key, value)` pair via individual [`set`](Self::set)
    /// calls. No atomicity guarantee beyond the sequence of appends.
    pub fn set_map<T: Serialize>(&mut self, values: impl IntoIterator<Item = (String, T)>) {
        for (key, value) in values {
            self.set(&key, value);
        }
    }

    /// Removes `key` if present, appending a `delete` entry. Returns `true`
    /// iff it was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.db.delete_cell(&self.name, key)
    }

    /// Renames the table. A no-op if `new_name == name`.
    pub fn rename(&mut self, new_name: &str) {
        if new_name == self.name {
            return;
        }
        self.db.rename_table_cells(&self.name, new_name);
        self.name = new_name.to_string();
    }

    /// Empties the table, appending a `clear-table` entry. Already-empty
    /// tables are not re-cleared (no entry is appended). Returns `true` iff
    /// anything was cleared.
    pub fn clear(&mut self) -> bool {
        self.db.clear_table_cells(&self.name)
    }

    /// Current cardinality of the table.
    pub fn len(&self) -> usize {
        self.db.table_len(&self.name)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use serde_json::json;

    #[test]
    fn set_reports_whether_key_was_new() {
        let mut db = Database::new();
        let mut t = db.table("t");
        assert!(t.set("a", 1));
        assert!(!t.set("a", 2));
        assert_eq!(t.get::<i32>("a"), Some(2));
    }

    #[test]
    fn get_missing_key_is_none() {
        let mut db = Database::new();
        let t = db.table("t");
        assert_eq!(t.get::<i32>("missing"), None);
    }

    #[test]
    fn clear_preserves_the_table() {
        let mut db = Database::new();
        {
            let mut t = db.table("t");
            t.set("a", json!(1));
            assert!(t.clear());
            assert!(!t.clear());
        }
        let t = db.get_table("t").unwrap();
        assert_eq!(t.len(), 0);
        assert!(t.as_map::<Value>().is_empty());
    }

    #[test]
    fn rename_moves_values_and_updates_handle_name() {
        let mut db = Database::new();
        {
            let mut t = db.table("old");
            t.set("a", json!(1));
            t.rename("new");
            assert_eq!(t.name(), "new");
        }
        assert!(db.get_table("old").is_none());
        assert_eq!(db.get_table("new").unwrap().get::<i32>("a"), Some(1));
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut db = Database::new();
        db.table("t");
        let log_len_before = db.log().len();
        db.get_table("t").unwrap().rename("t");
        assert_eq!(db.log().len(), log_len_before);
    }

    #[test]
    fn keys_are_sorted() {
        let mut db = Database::new();
        let mut t = db.table("t");
        t.set("zeta", json!(1));
        t.set("alpha", json!(1));
        assert_eq!(t.keys(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn as_map_materialises_all_values() {
        let mut db = Database::new();
        {
            let mut t = db.table("t");
            t.set("x", 100);
            t.set("y", 200);
            t.set("x", 400);
        }
        let t = db.get_table("t").unwrap();
        let map = t.as_map::<i32>();
        assert_eq!(map.get("x"), Some(&400));
        assert_eq!(map.get("y"), Some(&200));
    }
}
