//! Case-insensitive inbound header map.
//!
//! Header names arrive in whatever casing the sender (or the forwarding
//! queue) chose: `X-Gitlab-Event`, `x-gitlab-event`, `User-Agent`. Names are
//! folded to ASCII lowercase on insert so every lookup is case-insensitive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Header name → value mapping with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the serialized header blob carried in a push message's
    /// `attributes.headers` field: a JSON object of string values.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] when the blob is not a
    /// JSON object whose values are all strings.
    pub fn from_json_blob(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<BTreeMap<String, String>>(blob).map(Self::from)
    }

    /// Inserts a header, replacing any existing value under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Returns the value of `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns `true` if a header named `name` is present, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns `true` if no headers are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
