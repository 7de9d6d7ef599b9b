use crate::*;
use lazy_static::lazy_static;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

lazy_static! {
    /// `A..Z` to `0..25`.
    static ref ALPHABET: PositionIndex = PositionIndex::alphabet(26);
}

/// Letter every normalized notation starts with.
pub const RING_START: char = 'R';

/// Notation of a ring with nothing attached.
pub const BARE_RING: &str = "RH";

/// Which token the other letters are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorPolicy {
    /// The lowest position among all tokens.
    #[default]
    Minimum,
    /// The first token as written. Tokens before it are an error.
    First,
}

impl FromStr for AnchorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimum" | "min" => Ok(AnchorPolicy::Minimum),
            "first" => Ok(AnchorPolicy::First),
            other => Err(format!("unknown anchor policy '{other}', expected 'minimum' or 'first'")),
        }
    }
}

impl Display for AnchorPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnchorPolicy::Minimum => write!(f, "minimum"),
            AnchorPolicy::First => write!(f, "first"),
        }
    }
}

/// Normalize a notation string with the default anchor policy.
pub fn normalize_notation(notation: &str) -> Result<String, NotationError> {
    normalize_with(notation, AnchorPolicy::default())
}

pub fn normalize_with(notation: &str, policy: AnchorPolicy) -> Result<String, NotationError> {
    let tokens = tokenize_notation(notation)?;
    normalize_tokens(&tokens, policy)
}

/// Normalize already split tokens.
///
/// Bare letters get an explicit count of 1. No tokens give [`BARE_RING`], a
/// single token has its letter replaced by [`RING_START`], and several tokens
/// are relabelled by their offset from the anchor, with the first one then
/// forced to [`RING_START`].
pub fn normalize_tokens<S: AsRef<str>>(
    tokens: &[S],
    policy: AnchorPolicy,
) -> Result<String, NotationError> {
    let tokens: Vec<String> = tokens
        .iter()
        .map(|token| {
            let token = token.as_ref();
            if token.chars().count() == 1 {
                format!("{token}1")
            } else {
                token.to_string()
            }
        })
        .collect();

    match tokens.as_slice() {
        [] => Ok(BARE_RING.to_string()),
        [only] => {
            let token = split_token(only)?;
            Ok(format!("{RING_START}{}", token.suffix))
        }
        many => relabel(many, policy),
    }
}

fn relabel(tokens: &[String], policy: AnchorPolicy) -> Result<String, NotationError> {
    let split: Vec<NotationToken> = tokens
        .iter()
        .map(|token| split_token(token))
        .collect::<Result<_, _>>()?;
    let indices: Vec<usize> = split
        .iter()
        .map(|token| {
            ALPHABET
                .index_of(token.letter)
                .ok_or(NotationError::UnknownLetter(token.letter))
        })
        .collect::<Result<_, _>>()?;

    let anchor = match policy {
        AnchorPolicy::Minimum => indices.iter().copied().min().unwrap_or_default(),
        AnchorPolicy::First => indices[0],
    };
    let anchor_letter = ALPHABET.letter_of(anchor).unwrap_or(RING_START);

    let mut relabelled = Vec::with_capacity(split.len());
    for ((token, index), original) in split.iter().zip(&indices).zip(tokens) {
        let letter = index
            .checked_sub(anchor)
            .and_then(|relative| ALPHABET.letter_of(relative))
            .ok_or_else(|| NotationError::BeforeAnchor {
                token: original.clone(),
                anchor: anchor_letter,
            })?;
        relabelled.push(format!("{letter}{}", token.suffix));
    }

    if let Some(first) = relabelled.first_mut() {
        first.replace_range(..1, &RING_START.to_string());
    }
    Ok(relabelled.join(" "))
}
