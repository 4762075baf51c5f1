//! Category code table: stable integer surrogates for customer identifiers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Code returned for keys the table has never seen
pub const DEFAULT_CODE: u32 = 0;

/// Outcome of a lookup that keeps track of the default fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLookup {
    pub code: u32,
    pub known: bool,
}

/// Maps each distinct key seen at training time to a code, in first-seen order.
/// The table is immutable once built; a retrain builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodeTable {
    codes: IndexMap<String, u32>,
}

impl CategoryCodeTable {
    pub fn build<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes = IndexMap::new();
        for key in keys {
            let key = key.as_ref();
            if !codes.contains_key(key) {
                let code = codes.len() as u32;
                codes.insert(key.to_string(), code);
            }
        }
        Self { codes }
    }

    /// Assigned code, or [`DEFAULT_CODE`] when the key is absent
    pub fn lookup(&self, key: &str) -> u32 {
        self.resolve(key).code
    }

    pub fn resolve(&self, key: &str) -> CodeLookup {
        match self.codes.get(key) {
            Some(code) => CodeLookup { code: *code, known: true },
            None => CodeLookup {
                code: DEFAULT_CODE,
                known: false,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.codes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Content hash used to pair the table with the artifact trained on it
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (key, code) in self.iter() {
            hasher.update(&(key.len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update(&code.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
