use crate::*;
use csv::{ReaderBuilder, StringRecord};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum FragmentError {
    #[error("Failed to open fragment table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read fragment table: {0}")]
    Csv(#[from] csv::Error),
    #[error("No fragments left after filtering")]
    Empty,
}

/// One row of the table: a WLN token and the structure it stands for.
/// The token's atom 0 is the atom that bonds to the ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentRecord {
    pub token: String,
    pub smiles: String,
}

impl FragmentRecord {
    pub fn new(token: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            smiles: smiles.into(),
        }
    }

    pub fn molecule(&self) -> Result<Molecule, SmilesError> {
        Molecule::from_smiles(&self.smiles)
    }
}

/// Which rows of the table are usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFilter {
    pub min_token_len: usize,
    pub max_token_len: usize,
    pub max_rows: usize,
    pub excluded_pattern: String,
}

impl Default for FragmentFilter {
    fn default() -> Self {
        Self {
            min_token_len: 2,
            max_token_len: 3,
            max_rows: 1000,
            excluded_pattern: "r.".to_string(),
        }
    }
}

impl FragmentFilter {
    /// Token length first, then the row cap, then the excluded pattern.
    pub fn apply(&self, records: impl IntoIterator<Item = FragmentRecord>) -> Vec<FragmentRecord> {
        records
            .into_iter()
            .filter(|record| {
                let len = record.token.chars().count();
                len >= self.min_token_len && len <= self.max_token_len
            })
            .take(self.max_rows)
            .filter(|record| {
                self.excluded_pattern.is_empty() || !record.smiles.contains(&self.excluded_pattern)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct FragmentTable {
    records: Vec<FragmentRecord>,
}

impl FragmentTable {
    pub fn new(records: Vec<FragmentRecord>) -> Result<Self, FragmentError> {
        if records.is_empty() {
            return Err(FragmentError::Empty);
        }
        Ok(Self { records })
    }

    pub fn filtered(
        records: impl IntoIterator<Item = FragmentRecord>,
        filter: &FragmentFilter,
    ) -> Result<Self, FragmentError> {
        Self::new(filter.apply(records))
    }

    /// Read a tab separated table with a WLN token and a SMILES string per
    /// row. A header row naming `WLN` and `SMILES` is honoured when present;
    /// otherwise the first two columns are used.
    pub fn from_reader<R: Read>(reader: R, filter: &FragmentFilter) -> Result<Self, FragmentError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let rows: Vec<StringRecord> = rdr.records().collect::<Result<_, _>>()?;
        let (token_column, smiles_column, skip) = match rows.first().and_then(header_columns) {
            Some((token, smiles)) => (token, smiles, 1),
            None => (0, 1, 0),
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows.iter().skip(skip) {
            match (row.get(token_column), row.get(smiles_column)) {
                (Some(token), Some(smiles))
                    if !token.trim().is_empty() && !smiles.trim().is_empty() =>
                {
                    records.push(FragmentRecord::new(token.trim(), smiles.trim()));
                }
                _ => warn!("Skipping fragment row with a missing column: {:?}", row),
            }
        }

        let read = records.len();
        let table = Self::filtered(records, filter)?;
        info!("Kept {} of {} fragment rows", table.len(), read);
        Ok(table)
    }

    pub fn from_path(
        path: impl AsRef<Path>,
        filter: &FragmentFilter,
    ) -> Result<Self, FragmentError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FragmentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, filter)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FragmentRecord] {
        &self.records
    }

    /// Draw `n` rows uniformly, with replacement.
    pub fn sample<'a, R: Rng + ?Sized>(&'a self, n: usize, rng: &mut R) -> Vec<&'a FragmentRecord> {
        (0..n).filter_map(|_| self.records.choose(rng)).collect()
    }
}

/// Positions of the `WLN` and `SMILES` columns if `row` is a header.
fn header_columns(row: &StringRecord) -> Option<(usize, usize)> {
    let find = |name: &str| row.iter().position(|field| field.trim().eq_ignore_ascii_case(name));
    Some((find("WLN")?, find("SMILES")?))
}
