//! Wire records returned by the Alist API

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON envelope wrapping every `/api/*` response
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// A file or directory as reported by `fs/list` and `fs/get`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "deserialize_modified")]
    pub modified: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_hash_info")]
    pub hash_info: Option<String>,
    #[serde(default)]
    pub raw_url: Option<String>,
}

impl Item {
    pub fn size(&self) -> u64 {
        self.size.max(0) as u64
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListData {
    #[serde(default)]
    pub content: Option<Vec<Item>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeData {
    #[serde(default)]
    pub username: String,
}

/// Acknowledgment of `fs/put`. Synchronous uploads usually answer with no
/// data at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PutData {
    #[serde(default)]
    pub task: Option<TaskInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// Parse a modification time given as Unix seconds or RFC 3339.
///
/// Anything else maps to the Unix epoch.
pub fn parse_modified(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if raw.is_empty() {
        return DateTime::UNIX_EPOCH;
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => time.with_timezone(&Utc),
        Err(e) => {
            tracing::warn!(modified = raw, error = %e, "unparseable modification time");
            DateTime::UNIX_EPOCH
        }
    }
}

/// Extract an MD5 from `hash_info`, which is either a bare hex digest or a
/// JSON object (possibly itself encoded as a string) with an `md5` key.
pub fn parse_hash_info(value: &Value) -> Option<String> {
    let md5 = match value {
        Value::Object(map) => map.get("md5").and_then(Value::as_str).map(str::to_string),
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('{') {
                serde_json::from_str::<Value>(s)
                    .ok()
                    .and_then(|inner| parse_hash_info(&inner))
            } else if s.is_empty() || s == "null" {
                None
            } else {
                Some(s.to_string())
            }
        }
        _ => None,
    };
    md5.filter(|h| !h.is_empty())
}

fn deserialize_modified<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => parse_modified(&n.to_string()),
        Value::String(s) => parse_modified(&s),
        _ => DateTime::UNIX_EPOCH,
    })
}

fn deserialize_hash_info<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_hash_info(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modified() {
        assert_eq!(parse_modified("1700000000").timestamp(), 1_700_000_000);
        assert_eq!(
            parse_modified("2024-03-01T12:00:00+08:00").timestamp(),
            1_709_265_600
        );
        assert_eq!(parse_modified(""), DateTime::UNIX_EPOCH);
        assert_eq!(parse_modified("yesterday"), DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_hash_info() {
        assert_eq!(
            parse_hash_info(&Value::String("deadbeef".into())),
            Some("deadbeef".into())
        );
        assert_eq!(
            parse_hash_info(&Value::String(r#"{"md5":"abc"}"#.into())),
            Some("abc".into())
        );
        assert_eq!(
            parse_hash_info(&serde_json::json!({"md5": "abc", "sha1": "x"})),
            Some("abc".into())
        );
        assert_eq!(parse_hash_info(&serde_json::json!({"sha1": "x"})), None);
        assert_eq!(parse_hash_info(&Value::Null), None);
        assert_eq!(parse_hash_info(&Value::String("null".into())), None);
    }

    #[test]
    fn test_item_decoding() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "name": "f.txt",
            "size": 10,
            "is_dir": false,
            "modified": "2024-01-02T03:04:05Z",
            "hash_info": "{\"md5\":\"deadbeef\"}",
            "raw_url": "http://example.test/d/f.txt",
            "type": 4
        }))
        .unwrap();
        assert_eq!(item.size(), 10);
        assert_eq!(item.hash_info.as_deref(), Some("deadbeef"));
        assert_eq!(item.modified.timestamp(), 1_704_164_645);

        let bare: Item = serde_json::from_value(serde_json::json!({ "name": "d", "is_dir": true }))
            .unwrap();
        assert!(bare.is_dir);
        assert!(bare.hash_info.is_none());
        assert_eq!(bare.modified, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_envelope_with_null_data() {
        let env: Envelope<PutData> =
            serde_json::from_str(r#"{"code":200,"message":"success","data":null}"#).unwrap();
        assert_eq!(env.code, 200);
        assert!(env.data.is_none());
    }
}
