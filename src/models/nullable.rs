//! Nullable columns: an explicit JSON `null` reads as the type's default, the
//! same as a missing key.

use serde::{Deserialize, Deserializer};

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        #[serde(default, deserialize_with = "super::deserialize")]
        tags: Vec<String>,
        #[serde(default, deserialize_with = "super::deserialize")]
        note: String,
    }

    #[test]
    fn null_and_missing_read_as_default() {
        let from_null: Row = serde_json::from_value(json!({ "tags": null, "note": null })).unwrap();
        let from_missing: Row = serde_json::from_value(json!({})).unwrap();

        assert_eq!(from_null, from_missing);
        assert!(from_null.tags.is_empty());
        assert_eq!(from_null.note, "");
    }

    #[test]
    fn present_values_pass_through() {
        let row: Row = serde_json::from_value(json!({ "tags": ["a"], "note": "n" })).unwrap();

        assert_eq!(row.tags, vec!["a".to_string()]);
        assert_eq!(row.note, "n");
    }
}
