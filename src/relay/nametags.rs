//! Display names for internal addresses used as the relayed sender.

use std::collections::HashMap;

use serde::Deserialize;

/// Address → display name table, loaded once from a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NameTags(HashMap<String, String>);

impl NameTags {
    /// Parse a JSON object such as `{"support@company.com": "Company Support"}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Display name for `email`, or `None` on a miss.
    pub fn lookup(&self, email: &str) -> Option<&str> {
        self.0
            .get(email)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for NameTags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
