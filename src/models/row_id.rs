//! Row identifiers arrive as either JSON strings or integers depending on the
//! table's key type. Both are carried as `String` locally.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RowIdInput {
        String(String),
        Number(serde_json::Number),
    }

    match RowIdInput::deserialize(deserializer)? {
        RowIdInput::String(raw) if raw.is_empty() => Err(D::Error::custom("empty row id")),
        RowIdInput::String(raw) => Ok(raw),
        RowIdInput::Number(value) => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Row {
        #[serde(with = "super")]
        id: String,
    }

    #[test]
    fn deserialize_accepts_string() {
        let parsed: Row = serde_json::from_str(r#"{"id":"a1b2"}"#).expect("string id");
        assert_eq!(parsed.id, "a1b2");
    }

    #[test]
    fn deserialize_accepts_number() {
        let parsed: Row = serde_json::from_str(r#"{"id":42}"#).expect("numeric id");
        assert_eq!(parsed.id, "42");
    }

    #[test]
    fn deserialize_rejects_empty_string() {
        assert!(serde_json::from_str::<Row>(r#"{"id":""}"#).is_err());
    }
}
