// src/cache/key.rs
use std::collections::BTreeMap;
use std::fmt;

/// Separator for list-valued parameters.
pub const LIST_SEPARATOR: &str = ",";

/// Parameter value in a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParam {
    /// Rendered as an empty value.
    Null,
    Scalar(String),
    List(Vec<String>),
}

impl fmt::Display for KeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyParam::Null => Ok(()),
            KeyParam::Scalar(s) => f.write_str(s),
            KeyParam::List(items) => f.write_str(&items.join(LIST_SEPARATOR)),
        }
    }
}

impl From<&str> for KeyParam {
    fn from(v: &str) -> Self {
        KeyParam::Scalar(v.to_string())
    }
}

impl From<String> for KeyParam {
    fn from(v: String) -> Self {
        KeyParam::Scalar(v)
    }
}

impl From<&String> for KeyParam {
    fn from(v: &String) -> Self {
        KeyParam::Scalar(v.clone())
    }
}

impl From<bool> for KeyParam {
    fn from(v: bool) -> Self {
        KeyParam::Scalar(v.to_string())
    }
}

impl From<i64> for KeyParam {
    fn from(v: i64) -> Self {
        KeyParam::Scalar(v.to_string())
    }
}

impl From<u64> for KeyParam {
    fn from(v: u64) -> Self {
        KeyParam::Scalar(v.to_string())
    }
}

impl From<i32> for KeyParam {
    fn from(v: i32) -> Self {
        KeyParam::Scalar(v.to_string())
    }
}

impl From<Vec<String>> for KeyParam {
    fn from(v: Vec<String>) -> Self {
        KeyParam::List(v)
    }
}

impl From<&[&str]> for KeyParam {
    fn from(v: &[&str]) -> Self {
        KeyParam::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<KeyParam>> From<Option<T>> for KeyParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(KeyParam::Null)
    }
}

/// `prefix:a=1&b=x,y` with parameters sorted by name.
///
/// Insertion order never affects the key. A repeated name keeps the last value.
pub fn build_key<I, K, P>(prefix: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: Into<KeyParam>,
{
    let sorted: BTreeMap<String, KeyParam> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!("{prefix}:{joined}")
}
