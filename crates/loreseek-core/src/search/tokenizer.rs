//! Lowercasing alphanumeric tokenizer.
//!
//! Splits on any non-alphanumeric boundary, lowercases, and drops tokens
//! shorter than [`MIN_TOKEN_LEN`](crate::config::MIN_TOKEN_LEN) characters.
//! No stemming and no stop-word removal: the BM25 scorer depends on the
//! exact token stream being reproducible, so the transformation is kept
//! minimal and deterministic.

use crate::config::MIN_TOKEN_LEN;

/// Lazy iterator over the tokens of a text.
///
/// The iterator is cheap to create and `Clone`; cloning it before
/// consumption lets multi-pass consumers replay the sequence without
/// re-borrowing the text.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    chars: std::str::CharIndices<'a>,
    text: &'a str,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            // Skip separators to the start of the next alphanumeric run.
            let start = loop {
                let (idx, ch) = self.chars.next()?;
                if ch.is_alphanumeric() {
                    break idx;
                }
            };

            // Consume the run. CharIndices is cheap to clone, so peek by
            // cloning rather than buffering.
            let mut end = self.text.len();
            loop {
                let mut lookahead = self.chars.clone();
                match lookahead.next() {
                    Some((_, ch)) if ch.is_alphanumeric() => {
                        self.chars = lookahead;
                    }
                    Some((idx, _)) => {
                        end = idx;
                        break;
                    }
                    None => break,
                }
            }

            let token: String = self.text[start..end].to_lowercase();
            if token.chars().count() >= MIN_TOKEN_LEN {
                return Some(token);
            }
        }
    }
}

/// Tokenizes text into lowercase alphanumeric terms.
///
/// The returned iterator is lazy and finite; identical input always yields
/// the identical token sequence.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        chars: text.char_indices(),
        text,
    }
}
