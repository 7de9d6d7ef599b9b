use crate::FragmentFilter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs of a generation run. Every field has a default, so a JSON file only
/// needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Random trials per position subset when growing fragments.
    pub iterations_per_subset: usize,
    pub max_fragment_rows: usize,
    pub min_token_len: usize,
    pub max_token_len: usize,
    /// Fragments whose SMILES contains this are dropped.
    pub excluded_pattern: String,
    /// How many heteroatom seeds get fragments grown on them.
    pub seeds_to_extend: usize,
    /// Run seed; a random one is drawn and logged when absent.
    pub seed: Option<u64>,
    /// Worker threads; rayon's global pool when absent.
    pub threads: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            iterations_per_subset: 30,
            max_fragment_rows: 1000,
            min_token_len: 2,
            max_token_len: 3,
            excluded_pattern: "r.".to_string(),
            seeds_to_extend: 1,
            seed: None,
            threads: None,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn fragment_filter(&self) -> FragmentFilter {
        FragmentFilter {
            min_token_len: self.min_token_len,
            max_token_len: self.max_token_len,
            max_rows: self.max_fragment_rows,
            excluded_pattern: self.excluded_pattern.clone(),
        }
    }
}
