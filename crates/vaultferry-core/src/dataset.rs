//! Loading the import driver's input file.

use std::path::Path;

use serde_json::Value;

use crate::error::VaultError;
use crate::record::Record;

/// Default key holding the record array in an object-shaped dataset.
pub const DEFAULT_DATASET_KEY: &str = "people";

/// Load records from a JSON file. See [`parse_records`].
pub fn load_records(path: impl AsRef<Path>, key: &str) -> Result<Vec<Record>, VaultError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| VaultError::Dataset(format!("cannot read {}: {e}", path.display())))?;
    parse_records(&raw, key)
}

/// Parse a dataset document.
///
/// The document is either an array of records or an object with the array
/// under `key`. Each element is `{"fields": {...}}` or a flat object taken
/// as the fields map.
pub fn parse_records(raw: &str, key: &str) -> Result<Vec<Record>, VaultError> {
    let doc: Value = serde_json::from_str(raw)?;
    let items = match doc {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove(key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(VaultError::Dataset(format!("'{key}' is not an array")));
            }
            None => {
                return Err(VaultError::Dataset(format!("no '{key}' array in dataset")));
            }
        },
        _ => {
            return Err(VaultError::Dataset(
                "dataset must be an array or an object".into(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(mut obj) => match obj.remove("fields") {
                Some(Value::Object(fields)) => Ok(Record::new(fields)),
                Some(_) => Err(VaultError::Dataset(format!(
                    "record {i}: 'fields' is not an object"
                ))),
                None => Ok(Record::new(obj)),
            },
            _ => Err(VaultError::Dataset(format!("record {i} is not an object"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_with_people_key() {
        let raw = r#"{"people": [{"fields": {"name": "Ada"}}, {"fields": {"name": "Alan"}}]}"#;
        let records = parse_records(raw, DEFAULT_DATASET_KEY).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fields["name"], "Alan");
    }

    #[test]
    fn top_level_array_of_flat_objects() {
        let raw = r#"[{"name": "Ada", "ssn": "123"}]"#;
        let records = parse_records(raw, DEFAULT_DATASET_KEY).unwrap();
        assert_eq!(records[0].fields["ssn"], "123");
        assert!(records[0].tokens.is_none());
    }

    #[test]
    fn empty_dataset() {
        assert!(parse_records(r#"{"people": []}"#, "people").unwrap().is_empty());
    }

    #[test]
    fn wrong_shapes() {
        assert!(matches!(
            parse_records(r#"{"persons": []}"#, "people"),
            Err(VaultError::Dataset(_))
        ));
        assert!(matches!(
            parse_records(r#"[1, 2]"#, "people"),
            Err(VaultError::Dataset(_))
        ));
        assert!(matches!(
            parse_records("not json", "people"),
            Err(VaultError::Deserialization(_))
        ));
    }
}
