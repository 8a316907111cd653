use std::collections::VecDeque;

use super::prefix_stack::PrefixStack;
use super::record::ScoredRecord;
use super::sorted::OrderGuard;
use crate::error::{MwuError, Result};
use crate::model::local_maxima::{StrictVerdict, strict_verdict};
use crate::model::ngram::{key_len, key_prefix};

/// One-sided strict rejection over a key-sorted stream of scored n-grams
/// of every length >= 2.
///
/// Each n-gram longer than 2 is compared with its length n-1 prefix,
/// which sort order places on top of the stack. A weaker n-gram is
/// rejected; a stronger one rejects the prefix, which is still pending on
/// the stack. Records are emitted once no later key can extend them.
///
/// Running it a second time on token-reversed keys compares every n-gram
/// with its suffix, which completes the strict policy.
///
/// # Notes
/// - Rejection flags only ever go from accepted to rejected.
/// - Output is grouped per closed record, not globally sorted.
pub struct StrictRejection<I> {
	input: I,
	guard: OrderGuard,
	stack: PrefixStack<ScoredRecord>,
	ready: VecDeque<ScoredRecord>,
	exhausted: bool,
}

impl<I> StrictRejection<I>
where
	I: Iterator<Item = Result<ScoredRecord>>,
{
	pub fn new(input: I, source_name: impl Into<String>) -> Self {
		Self {
			input,
			guard: OrderGuard::new(source_name),
			stack: PrefixStack::new(),
			ready: VecDeque::new(),
			exhausted: false,
		}
	}

	fn accept(&mut self, mut record: ScoredRecord) -> Result<()> {
		self.guard.check(&record.key)?;
		while let Some((_, closed)) = self.stack.pop_unless_ancestor(&record.key) {
			self.ready.push_back(closed);
		}

		let n = key_len(&record.key);
		if n > 2 {
			match self.stack.top_mut() {
				Some((prefix, pending)) if key_len(prefix) + 1 == n => match strict_verdict(record.glue, pending.glue) {
					StrictVerdict::RejectLonger => record.rejected = true,
					StrictVerdict::RejectShorter => pending.rejected = true,
					StrictVerdict::Tie => {}
				},
				_ => return Err(MwuError::MissingSubgram { ngram: key_prefix(&record.key).to_owned() }),
			}
		}

		self.stack.push(record.key.clone(), record);
		Ok(())
	}
}

impl<I> Iterator for StrictRejection<I>
where
	I: Iterator<Item = Result<ScoredRecord>>,
{
	type Item = Result<ScoredRecord>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(record) = self.ready.pop_front() {
				return Some(Ok(record));
			}
			if self.exhausted {
				return None;
			}

			match self.input.next() {
				Some(Ok(record)) => {
					if let Err(e) = self.accept(record) {
						return Some(Err(e));
					}
				}
				Some(Err(e)) => return Some(Err(e)),
				None => {
					self.exhausted = true;
					while let Some((_, record)) = self.stack.pop() {
						self.ready.push_back(record);
					}
				}
			}
		}
	}
}
