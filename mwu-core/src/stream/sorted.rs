//! Sort-order plumbing: the fail-fast order check every streaming stage
//! applies to its input, and a k-way merge of sorted record streams.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::record::Record;
use crate::error::{MwuError, Result};

/// Verifies that keys arrive in non-decreasing byte order.
///
/// Every stack-based stage silently computes wrong prefix relations on
/// unsorted input, so each of them checks its input through a guard and
/// stops at the first out-of-order key.
#[derive(Debug)]
pub struct OrderGuard {
	source_name: String,
	previous: Option<String>,
	position: usize,
}

impl OrderGuard {
	pub fn new(source_name: impl Into<String>) -> Self {
		Self { source_name: source_name.into(), previous: None, position: 0 }
	}

	/// Records `key` as the latest key read.
	///
	/// # Errors
	/// [`MwuError::UnsortedInput`] if `key` sorts before the previous key.
	pub fn check(&mut self, key: &str) -> Result<()> {
		self.position += 1;
		match &mut self.previous {
			Some(previous) if previous.as_str() > key => Err(MwuError::UnsortedInput {
				source_name: self.source_name.clone(),
				line: self.position,
				previous: previous.clone(),
				current: key.to_owned(),
			}),
			Some(previous) => {
				previous.clear();
				previous.push_str(key);
				Ok(())
			}
			None => {
				self.previous = Some(key.to_owned());
				Ok(())
			}
		}
	}
}

/// Head record of one merged source.
struct Head<T> {
	record: T,
	source: usize,
}

impl<T: Record> PartialEq for Head<T> {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl<T: Record> Eq for Head<T> {}

impl<T: Record> PartialOrd for Head<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T: Record> Ord for Head<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.record.key().cmp(other.record.key()).then(self.source.cmp(&other.source))
	}
}

/// Merges several key-sorted record streams into one key-sorted stream.
///
/// Holds one pending record per source. Ties are broken by source index,
/// so the merge is deterministic.
pub struct SortedMerge<I, T> {
	sources: Vec<I>,
	heap: BinaryHeap<Reverse<Head<T>>>,
	primed: bool,
}

impl<I, T> SortedMerge<I, T>
where
	I: Iterator<Item = Result<T>>,
	T: Record,
{
	pub fn new(sources: Vec<I>) -> Self {
		let heap = BinaryHeap::with_capacity(sources.len());
		Self { sources, heap, primed: false }
	}

	fn pull(&mut self, source: usize) -> Result<()> {
		if let Some(record) = self.sources[source].next() {
			self.heap.push(Reverse(Head { record: record?, source }));
		}
		Ok(())
	}
}

impl<I, T> Iterator for SortedMerge<I, T>
where
	I: Iterator<Item = Result<T>>,
	T: Record,
{
	type Item = Result<T>;

	fn next(&mut self) -> Option<Self::Item> {
		if !self.primed {
			self.primed = true;
			for source in 0..self.sources.len() {
				if let Err(e) = self.pull(source) {
					return Some(Err(e));
				}
			}
		}

		let Reverse(head) = self.heap.pop()?;
		if let Err(e) = self.pull(head.source) {
			return Some(Err(e));
		}
		Some(Ok(head.record))
	}
}

/// Walks two streams holding the same keys in the same order.
///
/// # Errors
/// [`MwuError::Internal`] as soon as the keys or the lengths differ.
pub fn lockstep<A, B, IA, IB>(left: IA, right: IB) -> impl Iterator<Item = Result<(A, B)>>
where
	A: Record,
	B: Record,
	IA: IntoIterator<Item = Result<A>>,
	IB: IntoIterator<Item = Result<B>>,
{
	let mut left = left.into_iter();
	let mut right = right.into_iter();
	std::iter::from_fn(move || match (left.next(), right.next()) {
		(None, None) => None,
		(Some(Err(e)), _) | (_, Some(Err(e))) => Some(Err(e)),
		(Some(Ok(a)), Some(Ok(b))) if a.key() == b.key() => Some(Ok((a, b))),
		(a, b) => Some(Err(MwuError::Internal(format!(
			"streams out of step: {:?} against {:?}",
			a.and_then(Result::ok).map(|r| r.key().to_owned()),
			b.and_then(Result::ok).map(|r| r.key().to_owned()),
		)))),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stream::record::CountRecord;

	fn counts(keys: &[&str]) -> std::vec::IntoIter<Result<CountRecord>> {
		keys.iter()
			.map(|key| Ok(CountRecord { key: (*key).to_owned(), count: 1 }))
			.collect::<Vec<_>>()
			.into_iter()
	}

	#[test]
	fn merges_in_byte_order() {
		let merged: Vec<String> = SortedMerge::new(vec![counts(&["a", "b", "c"]), counts(&["a b", "a c", "b a"]), counts(&[])])
			.map(|r| r.unwrap().key)
			.collect();
		assert_eq!(merged, vec!["a", "a b", "a c", "b", "b a", "c"]);
	}

	#[test]
	fn guard_accepts_equal_keys_and_rejects_regressions() {
		let mut guard = OrderGuard::new("test");
		guard.check("a").unwrap();
		guard.check("a").unwrap();
		guard.check("a b").unwrap();
		let err = guard.check("a").unwrap_err();
		assert!(matches!(err, MwuError::UnsortedInput { line: 4, .. }), "{err}");
	}

	#[test]
	fn space_sorts_before_printable_token_characters() {
		// space (0x20) sorts before every printable token character
		let mut guard = OrderGuard::new("test");
		for key in ["a", "a b", "a!", "ab"] {
			guard.check(key).unwrap();
		}
	}

	#[test]
	fn lockstep_requires_identical_key_sequences() {
		let pairs: Vec<_> = lockstep(counts(&["a", "a b"]), counts(&["a", "a b"])).collect::<Result<_>>().unwrap();
		assert_eq!(pairs.len(), 2);

		let result: Result<Vec<_>> = lockstep(counts(&["a", "a b"]), counts(&["a", "a c"])).collect();
		assert!(matches!(result, Err(MwuError::Internal(_))));
		let result: Result<Vec<_>> = lockstep(counts(&["a"]), counts(&["a", "b"])).collect();
		assert!(matches!(result, Err(MwuError::Internal(_))));
	}
}
