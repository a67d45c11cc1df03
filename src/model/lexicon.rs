//! Lexicon: canonical predicate key → surface-form examples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Mapping from canonical predicate names to non-empty example lists.
///
/// Ordered so that serialized graphs are byte-stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lexicon(BTreeMap<String, Vec<String>>);

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn examples(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Record a surface example under `key`, creating the entry if needed.
    /// Duplicate examples are ignored.
    pub fn insert(&mut self, key: impl Into<String>, example: impl Into<String>) {
        let entry = self.0.entry(key.into()).or_default();
        let example = example.into();
        if !entry.contains(&example) {
            entry.push(example);
        }
    }

    /// Ensure an entry exists; an empty list gets the key itself as example.
    /// Returns `true` when the lexicon changed.
    pub fn ensure(&mut self, key: &str) -> bool {
        match self.0.get_mut(key) {
            Some(list) if list.is_empty() => {
                list.push(key.to_string());
                true
            }
            Some(_) => false,
            None => {
                self.0.insert(key.to_string(), vec![key.to_string()]);
                true
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Lexicon {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_fills_empty_lists() {
        let mut lex: Lexicon = [("wet".to_string(), Vec::new())].into_iter().collect();
        assert!(lex.ensure("wet"));
        assert_eq!(lex.examples("wet"), Some(&["wet".to_string()][..]));
        assert!(!lex.ensure("wet"));
    }

    #[test]
    fn insert_dedups_examples() {
        let mut lex = Lexicon::new();
        lex.insert("wet", "is wet");
        lex.insert("wet", "is wet");
        lex.insert("wet", "gets wet");
        assert_eq!(lex.examples("wet").map(<[String]>::len), Some(2));
    }
}
