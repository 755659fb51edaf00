//! The append-only operation log, its derived table index, and the
//! rewind/revert time-travel state machine.
//!
//! The log is canonical; `tabs` is always exactly what replaying `log` from
//! the start produces. The index maps `table -> key -> position in log`
//! rather than a pointer, so a `Vec` reallocation on append can never
//! invalidate it.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::entry::{op, LogEntry};
use crate::error::{Error, Result};
use crate::table::Table;

type Index = BTreeMap<String, BTreeMap<String, usize>>;

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Rebuilds the table index by replaying `log` from the start. Fails with
/// `Error::UnknownOp` on the first unrecognised operation code.
fn replay(log: &[LogEntry]) -> Result<Index> {
    let mut tabs: Index = BTreeMap::new();

    for (i, entry) in log.iter().enumerate() {
        match entry.op.as_str() {
            op::CREATE_TABLE => {
                let name = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("create-table missing tab".into()))?;
                tabs.entry(name.to_string()).or_default();
            }
            op::DELETE_TABLE => {
                let name = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("delete-table missing tab".into()))?;
                tabs.remove(name);
            }
            op::RENAME_TABLE => {
                let old = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("rename-table missing tab".into()))?;
                let new = entry
                    .key
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("rename-table missing key".into()))?;
                let sub = tabs
                    .remove(old)
                    .ok_or_else(|| Error::Malformed(format!("rename-table references missing table {old}")))?;
                tabs.insert(new.to_string(), sub);
            }
            op::CLEAR_TABLE => {
                let name = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("clear-table missing tab".into()))?;
                if let Some(sub) = tabs.get_mut(name) {
                    sub.clear();
                }
            }
            op::UPDATE => {
                let table = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("update missing tab".into()))?;
                let key = entry
                    .key
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("update missing key".into()))?;
                tabs.entry(table.to_string())
                    .or_default()
                    .insert(key.to_string(), i);
            }
            op::DELETE => {
                let table = entry
                    .tab
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("delete missing tab".into()))?;
                let key = entry
                    .key
                    .as_deref()
                    .ok_or_else(|| Error::Malformed("delete missing key".into()))?;
                if let Some(sub) = tabs.get_mut(table) {
                    sub.remove(key);
                }
            }
            other => return Err(Error::UnknownOp(other.to_string())),
        }
    }

    Ok(tabs)
}

#[derive(Debug, Default)]
pub struct Database {
    log: Vec<LogEntry>,
    tabs: Index,
    dirty: bool,
    saved: Vec<LogEntry>,
    was_mod: bool,
}

impl Database {
    /// A fresh, empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a database from a previously persisted log, replaying it
    /// from scratch to reconstruct the index.
    pub fn from_log(log: Vec<LogEntry>) -> Result<Self> {
        let tabs = replay(&log)?;
        Ok(Self {
            log,
            tabs,
            dirty: false,
            saved: Vec::new(),
            was_mod: false,
        })
    }

    /// The canonical log, in append order. This is the only thing persisted.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    fn append(&mut self, entry: LogEntry) -> usize {
        tracing::debug!(op = %entry.op, tab = entry.tab.as_deref().unwrap_or(""), "appending log entry");
        let idx = self.log.len();
        self.log.push(entry);
        self.dirty = true;
        idx
    }

    pub fn is_modified(&self) -> bool {
        self.dirty
    }

    /// Called by `File::write_to` once the log has been durably persisted.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// `TS` of the final log entry, or zero if the log is empty.
    pub fn time(&self) -> i64 {
        self.log.last().map(LogEntry::timestamp).unwrap_or(0)
    }

    /// Table names in ascending lexicographic order.
    pub fn table_names(&self) -> Vec<String> {
        self.tabs.keys().cloned().collect()
    }

    /// A read-only-by-convention handle onto an existing table, or `None` if
    /// it does not exist. Does not append to the log.
    pub fn get_table(&mut self, name: &str) -> Option<Table<'_>> {
        if self.tabs.contains_key(name) {
            Some(Table::new(name.to_string(), self))
        } else {
            None
        }
    }

    /// A handle onto `name`, creating an empty table (and appending a
    /// `create-table` entry) if it did not already exist.
    pub fn table(&mut self, name: &str) -> Table<'_> {
        if !self.tabs.contains_key(name) {
            self.append(LogEntry::create_table(name, now_micros()));
            self.tabs.insert(name.to_string(), BTreeMap::new());
        }
        Table::new(name.to_string(), self)
    }

    /// Removes `name` if it exists, appending `delete-table`. Returns
    /// `false` (no append) if it did not exist.
    pub fn delete_table(&mut self, name: &str) -> bool {
        if !self.tabs.contains_key(name) {
            return false;
        }
        self.append(LogEntry::delete_table(name, now_micros()));
        self.tabs.remove(name);
        true
    }

    /// A fresh snapshot of every table's current values, independent of the
    /// database: mutating the returned map, or the database afterwards,
    /// cannot affect the other.
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.tabs
            .iter()
            .map(|(table, cells)| {
                let values = cells
                    .iter()
                    .filter_map(|(key, &idx)| self.log[idx].val.clone().map(|v| (key.clone(), v)))
                    .collect();
                (table.clone(), values)
            })
            .collect()
    }

    /// Truncates the live log to entries with `TS <= when`, stashing the
    /// full log in `saved` so it can be restored with `revert`. Rewinding
    /// while already rewound reverts first. Returns `false` (no state
    /// change) if the truncation would not remove anything — rewinding to a
    /// future timestamp or an empty log is not an error.
    pub fn rewind(&mut self, when: i64) -> bool {
        if !self.saved.is_empty() {
            self.revert();
        }

        let prefix: Vec<LogEntry> = self
            .log
            .iter()
            .filter(|e| e.timestamp() <= when)
            .cloned()
            .collect();

        if prefix.len() >= self.log.len() {
            return false;
        }

        let old_log = std::mem::replace(&mut self.log, prefix);
        let old_dirty = self.dirty;
        self.saved = old_log;
        self.was_mod = old_dirty;
        self.dirty = true;
        self.tabs = replay(&self.log).expect("log was already validated on load");
        tracing::debug!(when, "rewound database");
        true
    }

    /// Undoes the most recent `rewind`, restoring the pre-rewind log and
    /// dirty flag. A no-op when not currently rewound.
    pub fn revert(&mut self) {
        if self.saved.is_empty() {
            return;
        }
        std::mem::swap(&mut self.log, &mut self.saved);
        self.dirty = self.was_mod;
        self.saved.clear();
        self.was_mod = false;
        self.tabs = replay(&self.log).expect("log was already validated on load");
        tracing::debug!("reverted rewind");
    }

    // --- Table projection helpers, used by `Table` --------------------

    pub(crate) fn cell_index(&self, table: &str, key: &str) -> Option<usize> {
        self.tabs.get(table)?.get(key).copied()
    }

    pub(crate) fn table_keys(&self, table: &str) -> Vec<String> {
        self.tabs
            .get(table)
            .map(|cells| cells.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn table_len(&self, table: &str) -> usize {
        self.tabs.get(table).map(BTreeMap::len).unwrap_or(0)
    }

    pub(crate) fn table_snapshot(&self, table: &str) -> BTreeMap<String, Value> {
        self.tabs
            .get(table)
            .map(|cells| {
                cells
                    .iter()
                    .filter_map(|(k, &idx)| self.log[idx].val.clone().map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn set_cell(&mut self, table: &str, key: &str, value: Value) -> bool {
        let is_new = self
            .tabs
            .get(table)
            .map(|cells| !cells.contains_key(key))
            .unwrap_or(true);
        let idx = self.append(LogEntry::update(table, key, value, now_micros()));
        self.tabs
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), idx);
        is_new
    }

    pub(crate) fn delete_cell(&mut self, table: &str, key: &str) -> bool {
        let present = self
            .tabs
            .get(table)
            .map(|cells| cells.contains_key(key))
            .unwrap_or(false);
        if !present {
            return false;
        }
        self.append(LogEntry::delete(table, key, now_micros()));
        if let Some(cells) = self.tabs.get_mut(table) {
            cells.remove(key);
        }
        true
    }

    pub(crate) fn clear_table_cells(&mut self, table: &str) -> bool {
        let non_empty = self
            .tabs
            .get(table)
            .map(|cells| !cells.is_empty())
            .unwrap_or(false);
        if !non_empty {
            return false;
        }
        self.append(LogEntry::clear_table(table, now_micros()));
        if let Some(cells) = self.tabs.get_mut(table) {
            cells.clear();
        }
        true
    }

    pub(crate) fn rename_table_cells(&mut self, old: &str, new: &str) {
        self.append(LogEntry::rename_table(old, new, now_micros()));
        let sub = self.tabs.remove(old).unwrap_or_default();
        self.tabs.insert(new.to_string(), sub);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_creates_and_is_idempotent() {
        let mut db = Database::new();
        db.table("passwords");
        db.table("passwords");
        let create_table_entries = db
            .log()
            .iter()
            .filter(|e| e.op == op::CREATE_TABLE)
            .count();
        assert_eq!(create_table_entries, 1);
    }

    #[test]
    fn delete_table_is_idempotent_in_log() {
        let mut db = Database::new();
        db.table("t");
        assert!(db.delete_table("t"));
        assert!(!db.delete_table("t"));
        let delete_table_entries = db
            .log()
            .iter()
            .filter(|e| e.op == op::DELETE_TABLE)
            .count();
        assert_eq!(delete_table_entries, 1);
        assert!(db.get_table("t").is_none());
    }

    #[test]
    fn index_matches_replay_after_mutations() {
        let mut db = Database::new();
        {
            let mut t = db.table("t");
            t.set("a", json!(1));
            t.set("b", json!(2));
            t.delete("a");
        }
        let replayed = replay(db.log()).unwrap();
        assert_eq!(replayed, db.tabs);
    }

    #[test]
    fn unknown_op_fails_replay() {
        let log = vec![LogEntry {
            op: "frobnicate".into(),
            tab: None,
            key: None,
            val: None,
            clk: None,
        }];
        let err = Database::from_log(log).unwrap_err();
        assert!(matches!(err, Error::UnknownOp(_)));
    }

    #[test]
    fn rewind_and_revert_restore_state() {
        let mut db = Database::new();
        {
            let mut t = db.table("t");
            t.set("x", json!(1));
            t.set("y", json!(2));
        }
        let t_time = db.time();
        db.get_table("t").unwrap().delete("x");

        assert!(db.rewind(t_time));
        assert_eq!(db.table_names(), vec!["t".to_string()]);
        assert!(db.is_modified());
        assert_eq!(db.get_table("t").unwrap().keys(), vec!["x", "y"]);

        db.revert();
        assert_eq!(db.get_table("t").unwrap().keys(), vec!["y"]);
    }

    #[test]
    fn rewinding_twice_takes_the_earlier_cut() {
        let mut db = Database::new();
        db.table("t");
        let t0 = db.time();
        db.get_table("t").unwrap().set("a", json!(1));
        let t1 = db.time();
        db.get_table("t").unwrap().set("b", json!(2));

        let mut alt = Database::from_log(db.log().to_vec()).unwrap();

        db.rewind(t1);
        db.rewind(t0);

        alt.rewind(t0);

        assert_eq!(db.log().len(), alt.log().len());
    }

    #[test]
    fn rewind_into_the_future_is_a_noop() {
        let mut db = Database::new();
        db.table("t");
        let future = db.time() + 1_000_000;
        assert!(!db.rewind(future));
        assert!(!db.is_modified());
    }

    #[test]
    fn snapshot_is_independent_of_database() {
        let mut db = Database::new();
        db.table("t").set("a", json!(1));
        let snap = db.snapshot();
        db.get_table("t").unwrap().set("a", json!(2));
        assert_eq!(snap["t"]["a"], json!(1));
    }

    #[test]
    fn table_names_are_sorted() {
        let mut db = Database::new();
        db.table("zeta");
        db.table("alpha");
        db.table("mid");
        assert_eq!(db.table_names(), vec!["alpha", "mid", "zeta"]);
    }
}
