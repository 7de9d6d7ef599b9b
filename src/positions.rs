use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;

/// The ring positions the WLN locant letters refer to, as used for `L C666`
/// (perhydroanthracene): letter to atom index of the canonical scaffold.
pub const DEFAULT_RING_POSITIONS: &str =
    "A:3,B:4,C:5,D:6,E:7,F:8,G:9,H:10,I:11,J:12,K:13,L:0,M:1,N:2";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("Letter '{0}' is assigned more than once")]
    DuplicateLetter(char),
    #[error("Atom index {0} is assigned more than once")]
    DuplicateIndex(usize),
    #[error("Malformed position entry '{0}', expected LETTER:INDEX")]
    Malformed(String),
}

/// A bijection between locant letters and atom indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    by_letter: HashMap<char, usize>,
    by_index: HashMap<usize, char>,
}

impl PositionIndex {
    pub fn new(pairs: impl IntoIterator<Item = (char, usize)>) -> Result<Self, PositionError> {
        let mut result = Self::default();
        for (letter, index) in pairs {
            if result.by_letter.contains_key(&letter) {
                return Err(PositionError::DuplicateLetter(letter));
            }
            if result.by_index.contains_key(&index) {
                return Err(PositionError::DuplicateIndex(index));
            }
            result.by_letter.insert(letter, index);
            result.by_index.insert(index, letter);
        }
        Ok(result)
    }

    /// `A -> 0`, `B -> 1`, ... for the first `n` capital letters (at most 26).
    pub fn alphabet(n: usize) -> Self {
        let by_letter: HashMap<char, usize> = ('A'..='Z').take(n).zip(0..).collect();
        let by_index = by_letter.iter().map(|(&letter, &index)| (index, letter)).collect();
        Self { by_letter, by_index }
    }

    pub fn letter_of(&self, index: usize) -> Option<char> {
        self.by_index.get(&index).copied()
    }

    pub fn index_of(&self, letter: char) -> Option<usize> {
        self.by_letter.get(&letter).copied()
    }

    pub fn len(&self) -> usize {
        self.by_letter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_letter.is_empty()
    }

    /// All assigned atom indices, ascending.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.by_index.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// `(letter, index)` pairs ordered by index.
    pub fn pairs(&self) -> Vec<(char, usize)> {
        self.indices()
            .into_iter()
            .filter_map(|index| self.letter_of(index).map(|letter| (letter, index)))
            .collect()
    }
}

impl FromStr for PositionIndex {
    type Err = PositionError;

    /// Parse `A:3,B:4,...`; `=` is accepted in place of `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let malformed = || PositionError::Malformed(entry.to_string());
            let (letter, index) = entry.split_once([':', '=']).ok_or_else(malformed)?;
            let mut letters = letter.trim().chars();
            let letter = match (letters.next(), letters.next()) {
                (Some(letter), None) => letter,
                _ => return Err(malformed()),
            };
            let index = index.trim().parse::<usize>().map_err(|_| malformed())?;
            pairs.push((letter, index));
        }
        Self::new(pairs)
    }
}

impl Display for PositionIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let entries: Vec<String> = self
            .pairs()
            .into_iter()
            .map(|(letter, index)| format!("{letter}:{index}"))
            .collect();
        write!(f, "{}", entries.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_positions() {
        let positions: PositionIndex = DEFAULT_RING_POSITIONS.parse().unwrap();
        assert_eq!(positions.len(), 14);
        assert_eq!(positions.letter_of(0), Some('L'));
        assert_eq!(positions.index_of('A'), Some(3));
        assert_eq!(positions.indices(), (0..14).collect::<Vec<_>>());
        assert_eq!(positions.letter_of(14), None);
    }

    #[test]
    fn test_alphabet() {
        let alphabet = PositionIndex::alphabet(26);
        assert_eq!(alphabet.index_of('A'), Some(0));
        assert_eq!(alphabet.index_of('Z'), Some(25));
        assert_eq!(alphabet.letter_of(17), Some('R'));
        assert_eq!(alphabet.index_of('a'), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("A:1,A:2".parse::<PositionIndex>(), Err(PositionError::DuplicateLetter('A')));
        assert_eq!("A:1,B:1".parse::<PositionIndex>(), Err(PositionError::DuplicateIndex(1)));
        assert_eq!(
            "AB:1".parse::<PositionIndex>(),
            Err(PositionError::Malformed("AB:1".to_string()))
        );
        assert_eq!("A".parse::<PositionIndex>(), Err(PositionError::Malformed("A".to_string())));
    }

    #[test]
    fn test_display_roundtrip() {
        let positions: PositionIndex = "B=4, A:3".parse().unwrap();
        assert_eq!(positions.to_string(), "A:3,B:4");
        assert_eq!(positions.to_string().parse::<PositionIndex>(), Ok(positions));
    }
}
