//! Project-scoped alias table: normalized surface + arity → canonical key.
//!
//! The table is append-only. Readers never block each other; writers only add
//! new keys, aliases or examples and never rewrite an existing key's arity.
//! Callers carry it across compilations of the same project explicitly (and
//! may persist it with [`AliasTable::save`] / [`AliasTable::load`]).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::model::StrictGraph;

use super::canonical::canonical_key;

/// One canonical predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub arity: usize,
    pub examples: Vec<String>,
}

/// Result of proposing a surface predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub key: String,
    /// The base key was taken with another arity; `key` is a minted suffix.
    pub minted_from: Option<String>,
}

/// Arity clash under the `raise` policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArityClash {
    pub key: String,
    pub expected: usize,
    pub found: usize,
}

/// Concurrent, append-only alias table.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: DashMap<String, AliasEntry>,
    aliases: DashMap<(String, usize), String>,
    version: AtomicU64,
}

/// Serializable image of an [`AliasTable`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasSnapshot {
    pub version: u64,
    pub entries: BTreeMap<String, AliasEntry>,
    pub aliases: Vec<AliasRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasRecord {
    pub surface: String,
    pub arity: usize,
    pub key: String,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with every predicate (and its lexicon examples) of a
    /// compiled graph, so recompiling that graph reuses its keys.
    pub fn from_strict(strict: &StrictGraph) -> Self {
        let table = Self::new();
        for (key, arities) in strict.graph.predicate_arities() {
            let Some(&arity) = arities.iter().next() else {
                continue;
            };
            let examples = strict
                .lexicon
                .examples(&key)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
            table.entries.insert(key.clone(), AliasEntry { arity, examples });
            for a in arities {
                table.aliases.insert((key.clone(), a), key.clone());
            }
        }
        table.version.store(1, Ordering::Release);
        table
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<AliasEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Map a surface predicate observed with `arity` to a canonical key.
    ///
    /// With `mint_on_clash`, a key already bound to another arity yields a
    /// suffixed key (`{key}_{arity}`); otherwise the clash is returned.
    pub fn propose(
        &self,
        surface: &str,
        arity: usize,
        mint_on_clash: bool,
    ) -> Result<Proposal, ArityClash> {
        let norm = canonical_key(surface);
        let alias_key = (norm.clone(), arity);
        let existing = self.aliases.get(&alias_key).map(|k| k.value().clone());
        if let Some(key) = existing {
            self.record_example(&key, surface);
            return Ok(Proposal {
                key,
                minted_from: None,
            });
        }

        let base_arity = self.bind(&norm, arity, surface);
        let proposal = if base_arity == arity {
            Proposal {
                key: norm.clone(),
                minted_from: None,
            }
        } else if mint_on_clash {
            Proposal {
                key: self.mint(&norm, arity, surface),
                minted_from: Some(norm.clone()),
            }
        } else {
            return Err(ArityClash {
                key: norm,
                expected: base_arity,
                found: arity,
            });
        };
        self.aliases
            .entry(alias_key)
            .or_insert_with(|| proposal.key.clone());
        Ok(proposal)
    }

    /// Bind `key` to `arity` if it is new; returns the arity the key holds.
    fn bind(&self, key: &str, arity: usize, surface: &str) -> usize {
        let mut created = false;
        let held = {
            let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| {
                created = true;
                AliasEntry {
                    arity,
                    examples: Vec::new(),
                }
            });
            if entry.arity == arity && !entry.examples.iter().any(|e| e == surface) {
                if !(surface == key && !entry.examples.is_empty()) {
                    entry.examples.push(surface.to_string());
                }
            }
            entry.arity
        };
        if created {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        held
    }

    fn mint(&self, base: &str, arity: usize, surface: &str) -> String {
        let mut candidate = format!("{base}_{arity}");
        let mut n = 2;
        loop {
            if self.bind(&candidate, arity, surface) == arity {
                return candidate;
            }
            candidate = format!("{base}_{arity}_{n}");
            n += 1;
        }
    }

    fn record_example(&self, key: &str, surface: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            let redundant = surface == key && !entry.examples.is_empty();
            if !redundant && !entry.examples.iter().any(|e| e == surface) {
                entry.examples.push(surface.to_string());
            }
        }
    }

    /// Independent copy for a candidate compilation.
    pub fn snapshot(&self) -> AliasTable {
        let copy = AliasTable::new();
        for e in self.entries.iter() {
            copy.entries.insert(e.key().clone(), e.value().clone());
        }
        for a in self.aliases.iter() {
            copy.aliases.insert(a.key().clone(), a.value().clone());
        }
        copy.version.store(self.version(), Ordering::Release);
        copy
    }

    /// Append everything `other` learned that this table does not contradict.
    pub fn absorb(&self, other: &AliasTable) {
        for e in other.entries.iter() {
            let mut created = false;
            let mut target = self.entries.entry(e.key().clone()).or_insert_with(|| {
                created = true;
                e.value().clone()
            });
            if created {
                drop(target);
                self.version.fetch_add(1, Ordering::AcqRel);
                continue;
            }
            if target.arity != e.value().arity {
                tracing::warn!(key = %e.key(), "alias absorb skipped: arity differs");
                continue;
            }
            for ex in &e.value().examples {
                if !target.examples.contains(ex) {
                    target.examples.push(ex.clone());
                }
            }
        }
        for a in other.aliases.iter() {
            self.aliases
                .entry(a.key().clone())
                .or_insert_with(|| a.value().clone());
        }
    }

    pub fn to_snapshot(&self) -> AliasSnapshot {
        let entries = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let mut aliases: Vec<AliasRecord> = self
            .aliases
            .iter()
            .map(|a| AliasRecord {
                surface: a.key().0.clone(),
                arity: a.key().1,
                key: a.value().clone(),
            })
            .collect();
        aliases.sort();
        AliasSnapshot {
            version: self.version(),
            entries,
            aliases,
        }
    }

    pub fn from_snapshot(snapshot: AliasSnapshot) -> Self {
        let table = AliasTable::new();
        for (k, v) in snapshot.entries {
            table.entries.insert(k, v);
        }
        for r in snapshot.aliases {
            table.aliases.insert((r.surface, r.arity), r.key);
        }
        table.version.store(snapshot.version, Ordering::Release);
        table
    }

    /// Persist as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), InputError> {
        let json = serde_json::to_string_pretty(&self.to_snapshot()).map_err(|e| {
            InputError::Serialization {
                message: e.to_string(),
            }
        })?;
        std::fs::write(path, json).map_err(|e| InputError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = std::fs::read_to_string(path).map_err(|e| InputError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let snapshot: AliasSnapshot =
            serde_json::from_str(&text).map_err(|e| InputError::Serialization {
                message: e.to_string(),
            })?;
        Ok(Self::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_surface_maps_to_same_key() {
        let table = AliasTable::new();
        let a = table.propose("is wet", 1, true).unwrap();
        let b = table.propose("Is  WET", 1, true).unwrap();
        assert_eq!(a.key, "wet");
        assert_eq!(a, b);
        assert_eq!(table.entry("wet").unwrap().examples, vec!["is wet", "Is  WET"]);
    }

    #[test]
    fn arity_clash_mints_suffixed_key() {
        let table = AliasTable::new();
        assert_eq!(table.propose("likes", 2, true).unwrap().key, "likes");
        let minted = table.propose("likes", 1, true).unwrap();
        assert_eq!(minted.key, "likes_1");
        assert_eq!(minted.minted_from.as_deref(), Some("likes"));
        assert_eq!(table.entry("likes").unwrap().arity, 2);
        assert_eq!(table.entry("likes_1").unwrap().arity, 1);
        // Stable on reuse.
        assert_eq!(table.propose("likes", 1, true).unwrap().key, "likes_1");
    }

    #[test]
    fn arity_clash_is_reported_when_minting_is_off() {
        let table = AliasTable::new();
        table.propose("likes", 2, false).unwrap();
        let clash = table.propose("likes", 1, false).unwrap_err();
        assert_eq!(clash.expected, 2);
        assert_eq!(clash.found, 1);
    }

    #[test]
    fn snapshot_is_independent_and_absorb_appends() {
        let table = AliasTable::new();
        table.propose("raining", 1, true).unwrap();
        let snap = table.snapshot();
        snap.propose("is wet", 1, true).unwrap();
        assert!(table.entry("wet").is_none());
        table.absorb(&snap);
        assert_eq!(table.entry("wet").unwrap().arity, 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn persists_through_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("aliases.json");
        let table = AliasTable::new();
        table.propose("is wet", 1, true).unwrap();
        table.propose("likes", 2, true).unwrap();
        table.save(&path).unwrap();
        let loaded = AliasTable::load(&path).unwrap();
        assert_eq!(loaded.to_snapshot(), table.to_snapshot());
        assert_eq!(loaded.propose("wet", 1, true).unwrap().key, "wet");
    }
}
