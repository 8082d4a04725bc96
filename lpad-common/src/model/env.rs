// lpad-common/src/model/env.rs
use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variables whose value is a `:`-separated search list.
pub const LIST_VARIABLES: &[&str] = &[
    "PATH",
    "MANPATH",
    "INFOPATH",
    "LD_LIBRARY_PATH",
    "DYLD_LIBRARY_PATH",
    "DYLD_FALLBACK_LIBRARY_PATH",
    "LIBRARY_PATH",
    "CPATH",
    "PKG_CONFIG_PATH",
    "XDG_DATA_DIRS",
    "ACLOCAL_PATH",
    "CMAKE_PREFIX_PATH",
    "PYTHONPATH",
    "PERL5LIB",
    "GEM_PATH",
    "NODE_PATH",
];

pub fn is_list_variable(name: &str) -> bool {
    LIST_VARIABLES.contains(&name)
}

/// POSIX shell identifier: letters, digits and `_`, not starting with a digit.
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Variable name to value. Sorted so rendered scripts are stable run to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMap(BTreeMap<String, String>);

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Overwrites unconditionally.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Adds a value: list variables gain any entries they do not already
    /// have (existing order first), everything else is overwritten.
    pub fn merge_value(&mut self, key: &str, value: &str) {
        if !is_list_variable(key) {
            self.set(key, value);
            return;
        }
        let entries: Vec<&str> = value.split(':').filter(|e| !e.is_empty()).collect();
        self.append_entries(key, &entries);
    }

    /// Puts `entries` in front of whatever the list variable already holds.
    pub fn prepend_entries(&mut self, key: &str, entries: &[&str]) {
        let existing = self.0.get(key).cloned().unwrap_or_default();
        let mut merged: Vec<&str> = Vec::new();
        for entry in entries
            .iter()
            .copied()
            .chain(existing.split(':'))
            .filter(|e| !e.is_empty())
        {
            if !merged.contains(&entry) {
                merged.push(entry);
            }
        }
        let joined = merged.join(":");
        self.0.insert(key.to_string(), joined);
    }

    fn append_entries(&mut self, key: &str, entries: &[&str]) {
        let current = self.0.entry(key.to_string()).or_default();
        let mut merged: Vec<String> = current
            .split(':')
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        for entry in entries {
            if !merged.iter().any(|m| m == entry) {
                merged.push((*entry).to_string());
            }
        }
        *current = merged.join(":");
    }

    /// Unions every variable of `other` into `self`.
    pub fn merge(&mut self, other: &EnvironmentMap) {
        for (key, value) in other.iter() {
            self.merge_value(key, value);
        }
    }
}

impl FromIterator<(String, String)> for EnvironmentMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = EnvironmentMap::new();
        for (key, value) in iter {
            map.merge_value(&key, &value);
        }
        map
    }
}

impl<'a> IntoIterator for &'a EnvironmentMap {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
