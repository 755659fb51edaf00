//! The canonical log entry and the operation vocabulary it carries.
//!
//! Field names on the wire are exactly `op`, `tab`, `key`, `val`, `clk`;
//! absent fields are omitted rather than serialised as `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation codes recognised during log replay. Kept as plain string
/// constants (rather than a `#[serde(rename)]` enum) so that an unknown op
/// on the wire deserialises fine and only fails later, at replay time, with
/// `Error::UnknownOp` — matching the spec's "Malformed JSON" vs.
/// "UnknownOp" distinction.
pub mod op {
    pub const CREATE_TABLE: &str = "create-table";
    pub const DELETE_TABLE: &str = "delete-table";
    pub const RENAME_TABLE: &str = "rename-table";
    pub const CLEAR_TABLE: &str = "clear-table";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clk: Option<i64>,
}

impl LogEntry {
    pub fn create_table(name: &str, ts: i64) -> Self {
        Self {
            op: op::CREATE_TABLE.to_string(),
            tab: Some(name.to_string()),
            key: None,
            val: None,
            clk: Some(ts),
        }
    }

    pub fn delete_table(name: &str, ts: i64) -> Self {
        Self {
            op: op::DELETE_TABLE.to_string(),
            tab: Some(name.to_string()),
            key: None,
            val: None,
            clk: Some(ts),
        }
    }

    pub fn rename_table(old: &str, new: &str, ts: i64) -> Self {
        Self {
            op: op::RENAME_TABLE.to_string(),
            tab: Some(old.to_string()),
            key: Some(new.to_string()),
            val: None,
            clk: Some(ts),
        }
    }

    pub fn clear_table(name: &str, ts: i64) -> Self {
        Self {
            op: op::CLEAR_TABLE.to_string(),
            tab: Some(name.to_string()),
            key: None,
            val: None,
            clk: Some(ts),
        }
    }

    pub fn update(table: &str, key: &str, val: Value, ts: i64) -> Self {
        Self {
            op: op::UPDATE.to_string(),
            tab: Some(table.to_string()),
            key: Some(key.to_string()),
            val: Some(val),
            clk: Some(ts),
        }
    }

    pub fn delete(table: &str, key: &str, ts: i64) -> Self {
        Self {
            op: op::DELETE.to_string(),
            tab: Some(table.to_string()),
            key: Some(key.to_string()),
            val: None,
            clk: Some(ts),
        }
    }

    /// `TS`, or zero if absent (per spec, absent `clk` is equivalent to 0).
    pub fn timestamp(&self) -> i64 {
        self.clk.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_serialises_compact_field_names() {
        let entry = LogEntry::update("passwords", "github", Value::String("hunter2".into()), 42);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["op"], "update");
        assert_eq!(json["tab"], "passwords");
        assert_eq!(json["key"], "github");
        assert_eq!(json["val"], "hunter2");
        assert_eq!(json["clk"], 42);
    }

    #[test]
    fn create_table_omits_key_val() {
        let entry = LogEntry::create_table("t", 1);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("key").is_none());
        assert!(json.get("val").is_none());
    }

    #[test]
    fn absent_clk_is_zero() {
        let entry: LogEntry = serde_json::from_str(r#"{"op":"create-table","tab":"t"}"#).unwrap();
        assert_eq!(entry.timestamp(), 0);
    }

    #[test]
    fn unknown_field_on_wire_is_ignored() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"op":"update","tab":"t","key":"k","val":1,"extra":true}"#)
                .unwrap();
        assert_eq!(entry.op, "update");
    }
}
