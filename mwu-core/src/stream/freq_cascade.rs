//! Frequency cascade over sorted streams.
//!
//! [`CountRuns`] turns a sorted stream of raw n-gram occurrences into
//! counts. [`PrefixCascade`] attaches to each counted n-gram the counts of
//! all its prefixes, reading a single key-sorted stream that mixes every
//! length. Running the cascade on token-reversed keys yields suffix counts.

use super::prefix_stack::PrefixStack;
use super::record::{CountRecord, Counted, KeyRecord};
use super::sorted::OrderGuard;
use crate::error::{MwuError, Result};
use crate::model::ngram::key_len;

/// Run-length counts a key-sorted stream of occurrences.
pub struct CountRuns<I> {
	input: I,
	guard: OrderGuard,
	pending: Option<CountRecord>,
}

impl<I> CountRuns<I>
where
	I: Iterator<Item = Result<KeyRecord>>,
{
	pub fn new(input: I, source_name: impl Into<String>) -> Self {
		Self { input, guard: OrderGuard::new(source_name), pending: None }
	}
}

impl<I> Iterator for CountRuns<I>
where
	I: Iterator<Item = Result<KeyRecord>>,
{
	type Item = Result<CountRecord>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let occurrence = match self.input.next() {
				Some(Ok(occurrence)) => occurrence,
				Some(Err(e)) => return Some(Err(e)),
				None => return self.pending.take().map(Ok),
			};
			if let Err(e) = self.guard.check(&occurrence.key) {
				return Some(Err(e));
			}

			if let Some(run) = self.pending.as_mut().filter(|run| run.key == occurrence.key) {
				run.count += 1;
				continue;
			}
			let closed = self.pending.replace(CountRecord { key: occurrence.key, count: 1 });
			if closed.is_some() {
				return closed.map(Ok);
			}
		}
	}
}

/// Attaches prefix counts to every record of a key-sorted stream.
///
/// Yields each input record with the counts of its prefixes of length
/// `1, 2, ..., n-1`, in that order.
///
/// # Errors
/// - [`MwuError::UnsortedInput`] when a key is smaller than its predecessor
/// - [`MwuError::MissingSubgram`] when some prefix of a key did not appear
///   earlier in the stream
pub struct PrefixCascade<I, T> {
	input: I,
	guard: OrderGuard,
	stack: PrefixStack<u64>,
	_record: std::marker::PhantomData<T>,
}

impl<I, T> PrefixCascade<I, T>
where
	I: Iterator<Item = Result<T>>,
	T: Counted,
{
	pub fn new(input: I, source_name: impl Into<String>) -> Self {
		Self {
			input,
			guard: OrderGuard::new(source_name),
			stack: PrefixStack::new(),
			_record: std::marker::PhantomData,
		}
	}

	fn attach(&mut self, record: T) -> Result<(T, Vec<u64>)> {
		self.guard.check(record.key())?;
		self.stack.retain_ancestors(record.key());

		let prefix_counts: Vec<u64> = self.stack.payloads().copied().collect();
		if prefix_counts.len() + 1 != key_len(record.key()) {
			return Err(MwuError::MissingSubgram { ngram: record.key().to_owned() });
		}

		self.stack.push(record.key().to_owned(), record.count());
		Ok((record, prefix_counts))
	}
}

impl<I, T> Iterator for PrefixCascade<I, T>
where
	I: Iterator<Item = Result<T>>,
	T: Counted,
{
	type Item = Result<(T, Vec<u64>)>;

	fn next(&mut self) -> Option<Self::Item> {
		let record = match self.input.next()? {
			Ok(record) => record,
			Err(e) => return Some(Err(e)),
		};
		Some(self.attach(record))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn occurrences(keys: &[&str]) -> std::vec::IntoIter<Result<KeyRecord>> {
		keys.iter().map(|key| Ok(KeyRecord { key: (*key).to_owned() })).collect::<Vec<_>>().into_iter()
	}

	fn counted(records: &[(&str, u64)]) -> std::vec::IntoIter<Result<CountRecord>> {
		records
			.iter()
			.map(|(key, count)| Ok(CountRecord { key: (*key).to_owned(), count: *count }))
			.collect::<Vec<_>>()
			.into_iter()
	}

	#[test]
	fn counts_runs_of_equal_keys() {
		let counts: Vec<(String, u64)> = CountRuns::new(occurrences(&["a", "a", "a b", "b", "b", "b"]), "test")
			.map(|r| r.map(|c| (c.key, c.count)).unwrap())
			.collect();
		assert_eq!(counts, vec![("a".to_owned(), 2), ("a b".to_owned(), 1), ("b".to_owned(), 3)]);
		assert_eq!(CountRuns::new(occurrences(&[]), "test").count(), 0);
	}

	#[test]
	fn attaches_prefix_counts_of_every_length() {
		// counts of "a b a b" and "a b c" up to length 3
		let stream = counted(&[
			("a", 3),
			("a b", 3),
			("a b a", 1),
			("a b c", 1),
			("b", 3),
			("b a", 1),
			("b a b", 1),
			("b c", 1),
			("c", 1),
		]);
		let attached: Vec<(String, Vec<u64>)> =
			PrefixCascade::new(stream, "test").map(|r| r.map(|(c, p)| (c.key, p)).unwrap()).collect();

		assert_eq!(attached[0], ("a".to_owned(), vec![]));
		assert_eq!(attached[2], ("a b a".to_owned(), vec![3, 3]));
		assert_eq!(attached[3], ("a b c".to_owned(), vec![3, 3]));
		assert_eq!(attached[6], ("b a b".to_owned(), vec![3, 1]));
		assert_eq!(attached[7], ("b c".to_owned(), vec![3]));
	}

	#[test]
	fn unsorted_stream_fails_fast() {
		let stream = counted(&[("a", 1), ("b", 1), ("a b", 1)]);
		let result: Result<Vec<_>> = PrefixCascade::new(stream, "unsorted").collect();
		assert!(matches!(result, Err(MwuError::UnsortedInput { line: 3, .. })));

		let result: Result<Vec<_>> = CountRuns::new(occurrences(&["b", "a"]), "unsorted").collect();
		assert!(matches!(result, Err(MwuError::UnsortedInput { .. })));
	}

	#[test]
	fn missing_prefix_is_reported() {
		let stream = counted(&[("a", 1), ("a b c", 1)]);
		let result: Result<Vec<_>> = PrefixCascade::new(stream, "test").collect();
		assert!(matches!(result, Err(MwuError::MissingSubgram { .. })));
	}
}
