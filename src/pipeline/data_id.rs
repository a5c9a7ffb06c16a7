use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// One value of a data ID key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataIdValue {
    Int(i64),
    Str(String),
}

impl From<i64> for DataIdValue {
    fn from(value: i64) -> Self {
        DataIdValue::Int(value)
    }
}

impl From<i32> for DataIdValue {
    fn from(value: i32) -> Self {
        DataIdValue::Int(value.into())
    }
}

impl From<&str> for DataIdValue {
    fn from(value: &str) -> Self {
        DataIdValue::Str(value.to_string())
    }
}

impl fmt::Display for DataIdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataIdValue::Int(v) => write!(f, "{v}"),
            DataIdValue::Str(v) => f.write_str(v),
        }
    }
}

/// Keys identifying a unit of data, e.g. `{visit: 42, ccd: 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(BTreeMap<String, DataIdValue>);

impl DataId {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DataIdValue>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse `key=value key=value`. Integer values become [`DataIdValue::Int`].
    pub fn parse(input: &str) -> Result<Self> {
        Self::from_tokens(input.split_whitespace(), input)
    }

    fn from_tokens<'a>(tokens: impl Iterator<Item = &'a str>, input: &str) -> Result<Self> {
        let mut keys = BTreeMap::new();
        for token in tokens {
            let (key, value) = token.split_once('=').ok_or_else(|| Error::DataId {
                input: input.to_string(),
                reason: format!("{token:?} is not of the form key=value"),
            })?;
            if key.is_empty() || value.is_empty() {
                return Err(Error::DataId {
                    input: input.to_string(),
                    reason: format!("{token:?} has an empty key or value"),
                });
            }

            let value = value
                .parse::<i64>()
                .map(DataIdValue::Int)
                .unwrap_or_else(|_| DataIdValue::Str(value.to_string()));
            keys.insert(key.to_string(), value);
        }

        if keys.is_empty() {
            return Err(Error::DataId {
                input: input.to_string(),
                reason: "no keys given".to_string(),
            });
        }
        Ok(Self(keys))
    }

    pub fn get(&self, key: &str) -> Option<&DataIdValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// The data IDs a task was asked to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIdContainer {
    pub id_list: Vec<DataId>,
}

/// Collect the data IDs given by every `--id` in a task command line.
///
/// A bare `--id` selects everything and contributes no entry.
pub fn parse_id_arguments(args: &[String]) -> Result<DataIdContainer> {
    let mut id_list = Vec::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg != "--id" {
            continue;
        }
        let mut tokens = Vec::new();
        while let Some(&next) = iter.peek() {
            if next.starts_with("--") {
                break;
            }
            tokens.push(next.as_str());
            iter.next();
        }
        if !tokens.is_empty() {
            let joined = tokens.join(" ");
            id_list.push(DataId::from_tokens(tokens.into_iter(), &joined)?);
        }
    }

    Ok(DataIdContainer { id_list })
}
