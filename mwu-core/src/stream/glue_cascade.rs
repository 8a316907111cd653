use std::collections::HashMap;

use super::record::GlueRecord;
use crate::error::{MwuError, Result};
use crate::model::ngram::{key_prefix, key_suffix};

/// Propagates glue between two adjacent lengths, n-1 and n.
///
/// The shorter length is the one table held entirely in memory: a
/// constituent's best super-gram glue is only known once every length-n
/// record referencing it has been scanned. The longer records stream
/// through [`GlueCascade::scan`] and come out final.
///
/// # Invariants
/// - Shorter records keep their file order, so [`GlueCascade::finish`]
///   returns them still sorted
/// - Only `max_sup_glue` of a shorter record ever changes
/// - Shorter records are never visible before [`GlueCascade::finish`]
pub struct GlueCascade {
	shorter: Vec<GlueRecord>,
	index: HashMap<String, usize>,
}

impl GlueCascade {
	/// Loads the complete length n-1 table.
	pub fn new<I>(shorter: I) -> Result<Self>
	where
		I: IntoIterator<Item = Result<GlueRecord>>,
	{
		let shorter = shorter.into_iter().collect::<Result<Vec<_>>>()?;
		let index = shorter.iter().enumerate().map(|(i, record)| (record.key.clone(), i)).collect();
		Ok(Self { shorter, index })
	}

	fn position(&self, key: &str) -> Result<usize> {
		self.index.get(key).copied().ok_or_else(|| MwuError::MissingSubgram { ngram: key.to_owned() })
	}

	/// Sets `max_sub_glue` of a length-n record and raises the
	/// `max_sup_glue` of its two constituents.
	///
	/// # Errors
	/// [`MwuError::MissingSubgram`] if the prefix or suffix was not loaded.
	pub fn scan(&mut self, mut longer: GlueRecord) -> Result<GlueRecord> {
		let suffix = self.position(key_suffix(&longer.key))?;
		let prefix = self.position(key_prefix(&longer.key))?;
		longer.max_sub_glue = self.shorter[suffix].glue.max(self.shorter[prefix].glue);

		for constituent in [suffix, prefix] {
			let record = &mut self.shorter[constituent];
			if longer.glue > record.max_sup_glue {
				record.max_sup_glue = longer.glue;
			}
		}
		Ok(longer)
	}

	/// Number of loaded shorter records.
	pub fn len(&self) -> usize {
		self.shorter.len()
	}

	pub fn is_empty(&self) -> bool {
		self.shorter.is_empty()
	}

	/// Releases the finalised shorter records.
	pub fn finish(self) -> Vec<GlueRecord> {
		self.shorter
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(key: &str, glue: f64) -> GlueRecord {
		GlueRecord::new(key.to_owned(), glue)
	}

	#[test]
	fn propagates_both_directions() {
		let mut cascade =
			GlueCascade::new([record("a b", 0.5), record("b c", 0.2), record("c d", 0.9)].into_iter().map(Ok)).unwrap();

		let abc = cascade.scan(record("a b c", 0.4)).unwrap();
		assert_eq!(abc.max_sub_glue, 0.5);
		let bcd = cascade.scan(record("b c d", 0.3)).unwrap();
		assert_eq!(bcd.max_sub_glue, 0.9);

		let shorter = cascade.finish();
		let sup: Vec<(&str, f64)> = shorter.iter().map(|r| (r.key.as_str(), r.max_sup_glue)).collect();
		assert_eq!(sup, vec![("a b", 0.4), ("b c", 0.4), ("c d", 0.3)]);
	}

	#[test]
	fn unknown_constituent_is_an_error() {
		let mut cascade = GlueCascade::new([record("a b", 0.5)].into_iter().map(Ok)).unwrap();
		assert!(matches!(cascade.scan(record("a b c", 0.1)), Err(MwuError::MissingSubgram { .. })));
		assert_eq!(cascade.len(), 1);
	}
}
