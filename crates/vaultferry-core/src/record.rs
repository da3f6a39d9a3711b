//! Vault record wire types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of records the vault accepts per request.
pub const MAX_RECORDS: usize = 25;

/// Field name under which the vault stores a record's identifier.
pub const SKYFLOW_ID: &str = "skyflow_id";

/// A field-name → value mapping. Opaque to VaultFerry; the vault validates it.
pub type Fields = Map<String, Value>;

/// One row-like vault record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub fields: Fields,
    /// Field-level tokens returned by the vault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
    /// Identifier assigned on insert (top-level in insert responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skyflow_id: Option<String>,
}

impl Record {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// The record identifier, whether it came back at top level or inside `fields`.
    pub fn id(&self) -> Option<&str> {
        self.skyflow_id
            .as_deref()
            .or_else(|| self.fields.get(SKYFLOW_ID).and_then(Value::as_str))
    }

    /// Copy `from`'s value into `to`. Returns `false` if `from` is absent.
    pub fn copy_field(&mut self, from: &str, to: &str) -> bool {
        match self.fields.get(from).cloned() {
            Some(v) => {
                self.fields.insert(to.to_string(), v);
                true
            }
            None => false,
        }
    }

    /// Keep only the named fields.
    pub fn retain_fields(&mut self, keep: &[String]) {
        self.fields.retain(|k, _| keep.iter().any(|c| c == k));
    }

    /// Strip everything the vault must not see in an update body:
    /// the identifier, the consumed source column, and tokens.
    pub fn into_update_payload(mut self, consumed: &str) -> Record {
        self.fields.remove(SKYFLOW_ID);
        self.fields.remove(consumed);
        Record::new(self.fields)
    }

    /// Only the `fields` map, as accepted by insert.
    pub fn into_insert_payload(self) -> Record {
        Record::new(self.fields)
    }
}

/// POST body for a bulk insert.
#[derive(Debug, Clone, Serialize)]
pub struct InsertBody<'a> {
    pub quorum: bool,
    pub records: &'a [Record],
    pub tokenization: bool,
}

impl<'a> InsertBody<'a> {
    pub fn new(records: &'a [Record]) -> Self {
        Self {
            quorum: false,
            records,
            tokenization: false,
        }
    }
}

/// PUT body for a single-record update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateBody<'a> {
    pub quorum: bool,
    pub record: &'a Record,
    pub tokenization: bool,
}

impl<'a> UpdateBody<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            quorum: false,
            record,
            tokenization: false,
        }
    }
}

/// `{"records": [...]}` as returned by insert and read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordsResponse {
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Reads always reveal values in plain text so they can be copied.
pub const REDACTION_PLAIN_TEXT: &str = "PLAIN_TEXT";

/// Options for reading one page of a table.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub limit: usize,
    pub offset: usize,
    pub fields: Vec<String>,
}

impl ReadOptions {
    pub fn new(limit: usize, offset: usize, fields: Vec<String>) -> Self {
        Self {
            limit: limit.min(MAX_RECORDS),
            offset,
            fields,
        }
    }

    /// Query pairs; `fields` repeats its key once per column.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut q = vec![
            ("redaction".to_string(), REDACTION_PLAIN_TEXT.to_string()),
            ("limit".to_string(), self.limit.min(MAX_RECORDS).to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        q.extend(self.fields.iter().map(|f| ("fields".to_string(), f.clone())));
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn id_from_fields_or_top_level() {
        let read = record(json!({"fields": {"skyflow_id": "abc", "name": "x"}}));
        assert_eq!(read.id(), Some("abc"));
        let inserted = record(json!({"skyflow_id": "def"}));
        assert_eq!(inserted.id(), Some("def"));
        assert_eq!(Record::default().id(), None);
    }

    #[test]
    fn update_payload_strips_id_source_and_tokens() {
        let mut r = record(json!({
            "fields": {"skyflow_id": "abc", "ssn": "123", "other": 1},
            "tokens": {"ssn": "tok"}
        }));
        assert!(r.copy_field("ssn", "ssn_v2"));
        let payload = r.into_update_payload("ssn");
        let body = serde_json::to_value(UpdateBody::new(&payload)).unwrap();
        assert_eq!(
            body,
            json!({
                "quorum": false,
                "record": {"fields": {"ssn_v2": "123", "other": 1}},
                "tokenization": false
            })
        );
    }

    #[test]
    fn copy_missing_field_is_noop() {
        let mut r = record(json!({"fields": {"skyflow_id": "abc"}}));
        assert!(!r.copy_field("ssn", "ssn_v2"));
        assert!(!r.fields.contains_key("ssn_v2"));
    }

    #[test]
    fn insert_body_shape() {
        let records = vec![record(json!({"fields": {"name": "Ada"}}))];
        let body = serde_json::to_value(InsertBody::new(&records)).unwrap();
        assert_eq!(
            body,
            json!({"quorum": false, "records": [{"fields": {"name": "Ada"}}], "tokenization": false})
        );
    }

    #[test]
    fn read_query_repeats_fields_and_clamps_limit() {
        let opts = ReadOptions {
            limit: 100,
            offset: 50,
            fields: vec!["skyflow_id".into(), "ssn".into()],
        };
        let q = opts.query();
        assert_eq!(q[0], ("redaction".into(), "PLAIN_TEXT".into()));
        assert_eq!(q[1], ("limit".into(), "25".into()));
        assert_eq!(q[2], ("offset".into(), "50".into()));
        assert_eq!(q[3], ("fields".into(), "skyflow_id".into()));
        assert_eq!(q[4], ("fields".into(), "ssn".into()));
    }
}
