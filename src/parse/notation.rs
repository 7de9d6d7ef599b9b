use nom::{
    bytes::complete::take_while1,
    character::complete::{anychar, multispace0, multispace1},
    combinator::{all_consuming, rest},
    error::{convert_error, VerboseError},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult,
};
use thiserror::Error;

pub type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotationError {
    #[error("Failed to tokenize notation:\n{0}")]
    Syntax(String),
    #[error("Empty notation token")]
    EmptyToken,
    #[error("Position letter '{0}' is not in the alphabet")]
    UnknownLetter(char),
    #[error("Token '{token}' lies before the anchor letter '{anchor}'")]
    BeforeAnchor { token: String, anchor: char },
}

/// A notation token split into its leading position letter and the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotationToken<'a> {
    pub letter: char,
    pub suffix: &'a str,
}

fn token(input: &str) -> Res<&str> {
    take_while1(|c: char| !c.is_whitespace())(input)
}

fn tokens(input: &str) -> Res<Vec<&str>> {
    delimited(multispace0, separated_list0(multispace1, token), multispace0)(input)
}

fn letter_and_suffix(input: &str) -> Res<(char, &str)> {
    pair(anychar, rest)(input)
}

/// Split a notation string on runs of whitespace.
pub fn tokenize_notation(input: &str) -> Result<Vec<&str>, NotationError> {
    match all_consuming(tokens)(input) {
        Ok((_, tokens)) => Ok(tokens),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(NotationError::Syntax(convert_error(input, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(NotationError::Syntax("incomplete".to_string())),
    }
}

/// Split one token into its first character and the remainder.
pub fn split_token(token: &str) -> Result<NotationToken<'_>, NotationError> {
    match letter_and_suffix(token) {
        Ok((_, (letter, suffix))) => Ok(NotationToken { letter, suffix }),
        Err(_) => Err(NotationError::EmptyToken),
    }
}
