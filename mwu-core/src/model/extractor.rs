use std::fmt;
use std::io::BufRead;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::frequency_table::FrequencyTable;
use super::glue_table::GlueTable;
use super::local_maxima;
use super::ngram::Ngram;
use crate::config::ExtractionConfig;
use crate::error::{MwuError, Result};

/// A multi-word unit accepted by the local maxima selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MwuResult {
	pub ngram: Ngram,

	/// Raw occurrence count in the corpus
	pub frequency: u64,

	/// Glue score under the configured measure
	pub glue: f64,
}

impl MwuResult {
	/// Parses an output line written by the `Display` implementation.
	pub fn parse_line(line: &str) -> Result<Self> {
		let fields: Vec<&str> = line.split('\t').collect();
		let malformed = |reason: String| MwuError::malformed("mwu output", 0, reason);
		let [key, frequency, glue] = fields.as_slice() else {
			return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
		};
		Ok(Self {
			ngram: Ngram::parse(key).ok_or_else(|| malformed("empty n-gram".to_owned()))?,
			frequency: frequency.parse().map_err(|_| malformed(format!("bad frequency {frequency:?}")))?,
			glue: glue.parse().map_err(|_| malformed(format!("bad glue {glue:?}")))?,
		})
	}
}

/// Output line: tokens joined by spaces, then frequency and glue to 4 decimals,
/// tab separated.
impl fmt::Display for MwuResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}\t{}\t{:.4}", self.ngram, self.frequency, self.glue)
	}
}

/// Orders results by length, then by joined key (byte order).
///
/// Both extraction strategies emit their results in this order, which
/// makes their outputs directly comparable.
pub fn sort_results(results: &mut [MwuResult]) {
	results.sort_by_cached_key(|result| (result.ngram.len(), result.ngram.joined()));
}

/// In-memory extraction: every table is held as a full hash map.
///
/// Suitable for corpora whose n-gram tables fit in memory. For larger
/// inputs see [`crate::stream::StreamingPipeline`].
///
/// # Responsibilities
/// - Count n-grams up to `max_n + 1`
/// - Score lengths `2..=max_n + 1`
/// - Apply the configured local maxima policy
#[derive(Clone, Copy, Debug)]
pub struct Extractor {
	config: ExtractionConfig,
}

impl Extractor {
	pub fn new(config: ExtractionConfig) -> Self {
		Self { config }
	}

	/// Builds an empty frequency table of the depth this extractor needs.
	pub fn frequency_table(&self) -> Result<FrequencyTable> {
		FrequencyTable::new(self.config.depth())
	}

	/// Extracts MWUs from lines of tokenized text.
	pub fn extract_lines<I, S>(&self, lines: I) -> Result<Vec<MwuResult>>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let table = FrequencyTable::from_lines(self.config.depth(), lines)?;
		self.extract(&table)
	}

	/// Extracts MWUs from a line-oriented reader.
	pub fn extract_reader<R: BufRead>(&self, reader: R) -> Result<Vec<MwuResult>> {
		let table = FrequencyTable::from_reader(self.config.depth(), reader)?;
		self.extract(&table)
	}

	/// Extracts MWUs from an already counted table.
	///
	/// # Errors
	/// Returns an error if the table is shallower than `max_n + 1`.
	pub fn extract(&self, table: &FrequencyTable) -> Result<Vec<MwuResult>> {
		if table.is_empty() {
			warn!("empty corpus, nothing to extract");
		}

		let glues = GlueTable::build(table, self.config.measure, self.config.depth())?;
		let accepted = local_maxima::select(&glues, self.config.policy, self.config.max_n())?;

		let mut results: Vec<MwuResult> = accepted
			.into_iter()
			.map(|gram| MwuResult {
				ngram: gram.clone(),
				frequency: table.frequency(gram),
				glue: glues.get(gram.tokens()).unwrap_or(0.0),
			})
			.collect();
		sort_results(&mut results);

		info!(
			"selected {} units among {} scored n-grams ({}, {}, max_n = {})",
			results.len(),
			glues.len(),
			self.config.measure,
			self.config.policy,
			self.config.max_n()
		);
		Ok(results)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{GlueMeasure, SelectionPolicy};

	fn extractor(measure: GlueMeasure, policy: SelectionPolicy, max_n: usize) -> Extractor {
		Extractor::new(ExtractionConfig::new(measure, policy, max_n).unwrap())
	}

	#[test]
	fn two_line_corpus_with_dice() {
		let results = extractor(GlueMeasure::Dice, SelectionPolicy::Relaxed, 2)
			.extract_lines(["a b a b", "a b c"])
			.unwrap();
		assert_eq!(results.len(), 1);
		assert_eq!(results[0].ngram.joined(), "a b");
		assert_eq!(results[0].frequency, 3);
		assert!((results[0].glue - 1.0).abs() < 1e-9);
		assert_eq!(results[0].to_string(), "a b\t3\t1.0000");
	}

	#[test]
	fn strict_also_keeps_b_c_on_a_tie() {
		// "a b c" and "b c" both score 0.5, so neither rejects the other
		let results = extractor(GlueMeasure::Dice, SelectionPolicy::Strict, 2)
			.extract_lines(["a b a b", "a b c"])
			.unwrap();
		let keys: Vec<String> = results.iter().map(|r| r.ngram.joined()).collect();
		assert_eq!(keys, vec!["a b", "b c"]);
	}

	#[test]
	fn results_are_sorted_by_length_then_key() {
		let lines = ["the big apple is big", "the big apple", "new york is the big apple"];
		let results = extractor(GlueMeasure::Scp, SelectionPolicy::Relaxed, 3).extract_lines(lines).unwrap();
		let order: Vec<(usize, String)> = results.iter().map(|r| (r.ngram.len(), r.ngram.joined())).collect();
		let mut sorted = order.clone();
		sorted.sort();
		assert_eq!(order, sorted);
	}

	#[test]
	fn output_line_parses_back() {
		let line = "kick the bucket\t12\t0.7321";
		let parsed = MwuResult::parse_line(line).unwrap();
		assert_eq!(parsed.to_string(), line);
		assert!(MwuResult::parse_line("kick\t12").is_err());
	}

	#[test]
	fn reader_and_lines_agree() {
		let extractor = extractor(GlueMeasure::Scp, SelectionPolicy::Strict, 3);
		let text = "new york is big\n\ni love new york\n";
		let from_reader = extractor.extract_reader(std::io::Cursor::new(text)).unwrap();
		assert_eq!(from_reader, extractor.extract_lines(text.lines()).unwrap());
	}

	#[test]
	fn empty_corpus_yields_nothing() {
		let results = extractor(GlueMeasure::Dice, SelectionPolicy::Strict, 3).extract_lines(["", "  "]).unwrap();
		assert!(results.is_empty());
	}
}
