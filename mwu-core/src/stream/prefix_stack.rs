use crate::model::ngram::is_token_prefix;

/// Stack of "open" keys over a key-sorted stream.
///
/// Under byte order, every n-gram sorts right before the n-grams it is a
/// token prefix of, and those extensions form one contiguous run. A stage
/// that pushes each key after reading it therefore only needs to pop the
/// entries that stopped being prefixes of the current key: what remains
/// is exactly the chain of the current key's prefixes that appeared in
/// the stream, shortest at the bottom.
///
/// # Invariants
/// - Entries are exactly the currently open ancestors of the most recently
///   read key, in order of increasing length
/// - Each entry's key is a token prefix of the entry above it
///
/// Backed by a plain vector; depth never exceeds the longest key length.
#[derive(Debug)]
pub struct PrefixStack<T> {
	entries: Vec<(String, T)>,
}

impl<T> Default for PrefixStack<T> {
	fn default() -> Self {
		Self { entries: Vec::new() }
	}
}

impl<T> PrefixStack<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, key: String, payload: T) {
		self.entries.push((key, payload));
	}

	pub fn pop(&mut self) -> Option<(String, T)> {
		self.entries.pop()
	}

	pub fn top_mut(&mut self) -> Option<(&str, &mut T)> {
		self.entries.last_mut().map(|(key, payload)| (key.as_str(), payload))
	}

	/// Drops every entry that is not a token prefix of `key`.
	pub fn retain_ancestors(&mut self, key: &str) {
		while self.pop_unless_ancestor(key).is_some() {}
	}

	/// Pops the top entry if it is not a token prefix of `key`.
	///
	/// Stages that must finalise entries as they close call this in a loop
	/// instead of [`PrefixStack::retain_ancestors`].
	pub fn pop_unless_ancestor(&mut self, key: &str) -> Option<(String, T)> {
		match self.entries.last() {
			Some((top, _)) if !is_token_prefix(top, key) => self.entries.pop(),
			_ => None,
		}
	}

	/// Payloads from the bottom (shortest key) to the top.
	pub fn payloads(&self) -> impl Iterator<Item = &T> {
		self.entries.iter().map(|(_, payload)| payload)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_only_the_ancestor_chain() {
		let mut stack = PrefixStack::new();
		for (key, count) in [("a", 5), ("a b", 3), ("a b c", 1)] {
			stack.retain_ancestors(key);
			stack.push(key.to_owned(), count);
		}
		assert_eq!(stack.payloads().copied().collect::<Vec<_>>(), vec![5, 3, 1]);

		stack.retain_ancestors("a c");
		assert_eq!(stack.payloads().copied().collect::<Vec<_>>(), vec![5]);

		stack.retain_ancestors("ab");
		assert!(stack.is_empty());
	}

	#[test]
	fn pops_one_closed_entry_at_a_time() {
		let mut stack = PrefixStack::new();
		stack.push("x".to_owned(), ());
		stack.push("x y".to_owned(), ());
		assert_eq!(stack.pop_unless_ancestor("x y z").map(|(k, _)| k), None);
		assert_eq!(stack.pop_unless_ancestor("x z").map(|(k, _)| k), Some("x y".to_owned()));
		assert_eq!(stack.pop_unless_ancestor("x z"), None);
		assert_eq!(stack.top_mut().map(|(k, _)| k), Some("x"));
		assert_eq!(stack.len(), 1);
	}
}
