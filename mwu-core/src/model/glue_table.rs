use std::collections::HashMap;

use log::debug;

use super::frequency_table::FrequencyTable;
use super::ngram::Ngram;
use crate::config::GlueMeasure;
use crate::error::{MwuError, Result};

/// Glue score of every n-gram of length `2..=depth` of a frequency table.
///
/// # Invariants
/// - No unigram is stored (glue is undefined for n = 1)
/// - Every prefix and suffix of length >= 2 of a stored n-gram is stored
#[derive(Clone, Debug)]
pub struct GlueTable {
	depth: usize,
	glues: HashMap<Ngram, f64>,
}

impl GlueTable {
	/// Scores every n-gram of length `2..=depth` found in `table`.
	///
	/// # Errors
	/// - [`MwuError::InvalidConfig`] if the table is shallower than `depth`
	/// - [`MwuError::DegenerateFrequency`] if a sub-gram frequency is zero
	pub fn build(table: &FrequencyTable, measure: GlueMeasure, depth: usize) -> Result<Self> {
		if table.depth() < depth {
			return Err(MwuError::InvalidConfig(format!(
				"frequency table holds lengths up to {}, glue needs {}",
				table.depth(),
				depth
			)));
		}

		let mut glues = HashMap::new();
		for (gram, freq) in table.iter() {
			let n = gram.len();
			if n < 2 || n > depth {
				continue;
			}
			let left: Vec<u64> = (1..n).map(|i| table.get(gram.prefix(i))).collect();
			let right: Vec<u64> = (1..n).map(|i| table.get(gram.suffix(n - i))).collect();
			let glue = measure.glue(&gram.joined(), freq, &left, &right)?;
			glues.insert(gram.clone(), glue);
		}
		debug!("computed {} glue scores with {measure}", glues.len());

		Ok(Self { depth, glues })
	}

	/// Glue of a token sequence, `None` for unknown or unigram sequences.
	pub fn get(&self, tokens: &[String]) -> Option<f64> {
		self.glues.get(tokens).copied()
	}

	/// Glue of a sub-gram that must exist.
	pub(crate) fn constituent(&self, tokens: &[String]) -> Result<f64> {
		self.get(tokens).ok_or_else(|| MwuError::MissingSubgram { ngram: tokens.join(" ") })
	}

	/// Longest scored length.
	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn len(&self) -> usize {
		self.glues.len()
	}

	pub fn is_empty(&self) -> bool {
		self.glues.is_empty()
	}

	/// Iterates over `(n-gram, glue)` pairs in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&Ngram, f64)> {
		self.glues.iter().map(|(gram, glue)| (gram, *glue))
	}
}
