//! Program image loading.
//!
//! An Intcode program is one line of comma-separated base-10 integers. The
//! parsed image is copied into a fresh processor at ascending addresses from
//! zero; every pipeline stage loads its own independent copy.

use crate::vm::Word;
use std::path::Path;
use thiserror::Error;

/// Parse program text into an ordered sequence of words.
///
/// Surrounding whitespace (including the line terminator) is ignored, as is
/// whitespace around individual tokens.
pub fn parse_program(text: &str) -> Result<Vec<Word>, ProgramError> {
    text.trim()
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse().map_err(|_| ProgramError::BadToken {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Read and parse a program file.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Vec<Word>, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::Io(e.to_string()))?;
    parse_program(&text)
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("bad integer token {token:?} at position {index}")]
    BadToken { index: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse_program("1,0,0,0,99").unwrap(), vec![1, 0, 0, 0, 99]);
    }

    #[test]
    fn test_parse_negative_and_whitespace() {
        assert_eq!(
            parse_program("  104, -37 ,99\n").unwrap(),
            vec![104, -37, 99]
        );
    }

    #[test]
    fn test_parse_bad_token() {
        let err = parse_program("1,two,3").unwrap_err();
        match err {
            ProgramError::BadToken { index, token } => {
                assert_eq!(index, 1);
                assert_eq!(token, "two");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_empty_token() {
        assert!(parse_program("1,,3").is_err());
    }

    proptest! {
        #[test]
        fn render_then_parse_roundtrips(words in prop::collection::vec(any::<Word>(), 1..64)) {
            let text = words
                .iter()
                .map(Word::to_string)
                .collect::<Vec<_>>()
                .join(",");
            prop_assert_eq!(parse_program(&text).unwrap(), words);
        }
    }
}
