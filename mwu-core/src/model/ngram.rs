use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MwuError, Result};

/// Separator used in the joined (string key) form of an n-gram.
pub const TOKEN_SEPARATOR: char = ' ';

/// An ordered, immutable sequence of tokens.
///
/// Tokens are opaque strings compared exactly (no case folding or other
/// normalization). The joined form, tokens separated by a single space,
/// is the key used by every streaming file.
///
/// # Invariants
/// - `tokens` is never empty
/// - no token contains whitespace
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ngram {
	tokens: Vec<String>,
}

impl Ngram {
	/// Builds an n-gram from a token slice.
	///
	/// Returns `None` for an empty slice.
	pub fn new<S: AsRef<str>>(tokens: &[S]) -> Option<Self> {
		if tokens.is_empty() {
			return None;
		}
		Some(Self { tokens: tokens.iter().map(|t| t.as_ref().to_owned()).collect() })
	}

	/// Parses a whitespace-joined key.
	///
	/// Returns `None` if the key holds no token.
	pub fn parse(joined: &str) -> Option<Self> {
		let tokens: Vec<String> = split_tokens(joined).map(str::to_owned).collect();
		if tokens.is_empty() { None } else { Some(Self { tokens }) }
	}

	/// Number of tokens (the `n` of the n-gram).
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Whether the n-gram holds no token.
	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	/// The first `k` tokens.
	pub fn prefix(&self, k: usize) -> &[String] {
		&self.tokens[..k.min(self.tokens.len())]
	}

	/// The last `k` tokens.
	pub fn suffix(&self, k: usize) -> &[String] {
		let k = k.min(self.tokens.len());
		&self.tokens[self.tokens.len() - k..]
	}

	/// Tokens joined by a single space.
	pub fn joined(&self) -> String {
		self.tokens.join(" ")
	}
}

impl Borrow<[String]> for Ngram {
	fn borrow(&self) -> &[String] {
		&self.tokens
	}
}

impl fmt::Display for Ngram {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.joined())
	}
}

fn is_separator(c: char) -> bool {
	c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn split_tokens(text: &str) -> impl Iterator<Item = &str> {
	text.split(is_separator).filter(|token| !token.is_empty())
}

/// Splits line `number` (1-based, used in errors) of a text into tokens.
///
/// Runs of Unicode whitespace or of the ASCII separators `\x1c`..`\x1f`
/// separate tokens; blank lines yield no token.
///
/// # Errors
/// [`MwuError::InvalidToken`] if a token still holds a control character
/// below `\x20`.
pub fn tokenize(line: &str, number: usize) -> Result<Vec<&str>> {
	let tokens: Vec<&str> = split_tokens(line).collect();
	if let Some(token) = tokens.iter().find(|token| token.bytes().any(|b| b < 0x20)) {
		return Err(MwuError::InvalidToken { line: number, token: (*token).to_owned() });
	}
	Ok(tokens)
}

/// Iterates over every contiguous sub-sequence of `tokens` with a length
/// between 1 and `max_n`.
///
/// N-grams are produced for n = 1 first, each length scanned left to right.
/// Sequences shorter than a given n simply yield nothing for that n.
pub fn ngrams<'a, S>(tokens: &'a [S], max_n: usize) -> impl Iterator<Item = &'a [S]> + 'a {
	(1..=max_n.min(tokens.len())).flat_map(move |n| ngrams_of_len(tokens, n))
}

/// Iterates over every contiguous sub-sequence of exactly `n` tokens.
pub fn ngrams_of_len<'a, S>(tokens: &'a [S], n: usize) -> impl Iterator<Item = &'a [S]> + 'a {
	let count = if n == 0 || n > tokens.len() { 0 } else { tokens.len() - n + 1 };
	(0..count).map(move |i| &tokens[i..i + n])
}

/// Joins a token slice with the key separator.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
	let mut key = String::new();
	for (i, token) in tokens.iter().enumerate() {
		if i > 0 {
			key.push(TOKEN_SEPARATOR);
		}
		key.push_str(token.as_ref());
	}
	key
}

/// Reverses the token order of a joined key.
pub fn reverse_key(key: &str) -> String {
	let tokens: Vec<&str> = key.split(TOKEN_SEPARATOR).rev().collect();
	tokens.join(" ")
}

/// Number of tokens in a joined key.
pub fn key_len(key: &str) -> usize {
	key.split(TOKEN_SEPARATOR).count()
}

/// The key without its last token (its length n-1 prefix).
///
/// Empty for a single-token key.
pub fn key_prefix(key: &str) -> &str {
	key.rfind(TOKEN_SEPARATOR).map_or("", |i| &key[..i])
}

/// The key without its first token (its length n-1 suffix).
///
/// Empty for a single-token key.
pub fn key_suffix(key: &str) -> &str {
	key.find(TOKEN_SEPARATOR).map_or("", |i| &key[i + 1..])
}

/// True if `ancestor` is a token-level proper prefix of `key`.
///
/// `"a b"` is a prefix of `"a b c"` but not of `"a bc"`.
pub fn is_token_prefix(ancestor: &str, key: &str) -> bool {
	key.len() > ancestor.len()
		&& key.starts_with(ancestor)
		&& key.as_bytes()[ancestor.len()] == TOKEN_SEPARATOR as u8
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn emits_every_contiguous_subsequence() {
		let tokens = tokenize("a b c", 1).unwrap();
		let grams: Vec<String> = ngrams(&tokens, 3).map(join_tokens).collect();
		assert_eq!(grams, vec!["a", "b", "c", "a b", "b c", "a b c"]);
	}

	#[test]
	fn short_lines_and_blank_lines() {
		let tokens = tokenize("a b", 1).unwrap();
		assert_eq!(ngrams(&tokens, 5).count(), 3);
		assert_eq!(ngrams(&tokenize("   ", 1).unwrap(), 3).count(), 0);
		assert_eq!(ngrams_of_len(&tokens, 3).count(), 0);
		assert_eq!(ngrams_of_len(&tokens, 0).count(), 0);
	}

	#[test]
	fn tokens_are_not_normalized() {
		let tokens = tokenize("New new  NEW\tnew", 1).unwrap();
		assert_eq!(tokens, vec!["New", "new", "NEW", "new"]);
	}

	#[test]
	fn ascii_separators_split_tokens() {
		assert_eq!(tokenize("a\u{1f}b\u{1c}\u{1d} c\u{1e}", 1).unwrap(), vec!["a", "b", "c"]);
		assert_eq!(tokenize("a\u{a0}b\u{85}c", 1).unwrap(), vec!["a", "b", "c"]);
		assert_eq!(Ngram::parse("a\u{1f}b").map(|gram| gram.len()), Some(2));
	}

	#[test]
	fn control_characters_in_tokens_are_rejected() {
		let err = tokenize("ok a\u{1}x b", 7).unwrap_err();
		assert!(matches!(err, MwuError::InvalidToken { line: 7, ref token } if token == "a\u{1}x"), "{err}");
		assert!(tokenize("nul\u{0}", 1).is_err());
		assert!(tokenize("del\u{7f} is fine", 1).is_ok());
	}

	#[test]
	fn ngram_slices_and_keys() {
		let gram = Ngram::parse("kick  the bucket").unwrap();
		assert_eq!(gram.len(), 3);
		assert_eq!(gram.joined(), "kick the bucket");
		assert_eq!(gram.prefix(2), ["kick", "the"]);
		assert_eq!(gram.suffix(1), ["bucket"]);
		assert!(Ngram::parse(" ").is_none());
		assert!(Ngram::new::<&str>(&[]).is_none());
	}

	#[test]
	fn token_prefix_respects_token_boundaries() {
		assert!(is_token_prefix("a b", "a b c"));
		assert!(!is_token_prefix("a b", "a bc"));
		assert!(!is_token_prefix("a b", "a b"));
		assert_eq!(reverse_key("a b c"), "c b a");
		assert_eq!(key_len("a b c"), 3);
		assert_eq!(key_prefix("a b c"), "a b");
		assert_eq!(key_suffix("a b c"), "b c");
		assert_eq!(key_prefix("a"), "");
	}
}
