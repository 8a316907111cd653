//! Single streaming stages as line filters.
//!
//! Each function reads records from a reader and writes to a writer, so
//! the strict pipeline can also be assembled with shell pipes and the
//! system `sort`:
//!
//! ```text
//! ngrams 3 | sort | count > counts
//! sort counts | cascade | reverse | sort | cascade --suffixes | reverse | sort \
//!     | drop-n 1 | glue scp | sort | reject | reverse | sort | reject | reverse \
//!     | drop-n 3 | accepted
//! ```
//!
//! Here `sort` stands for `LC_ALL=C sort -s -t '\t' -k1,1`.

use std::io::{self, BufRead, Write};

use serde_json::to_string;

use super::freq_cascade::{CountRuns, PrefixCascade};
use super::record::{Counted, FrequencyRecord, KeyRecord, Record, RecordReader, ScoredRecord};
use super::rejection::StrictRejection;
use crate::config::GlueMeasure;
use crate::error::{MwuError, Result};
use crate::model::extractor::MwuResult;
use crate::model::ngram::{Ngram, join_tokens, key_len, ngrams, reverse_key, tokenize};

const SOURCE: &str = "input";

/// A `key \t count` record followed by any number of extra fields, which
/// are carried through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassthroughRecord {
	pub key: String,
	pub count: u64,
	pub extra: Vec<String>,
}

impl Record for PassthroughRecord {
	const FIELDS: usize = 2;

	fn key(&self) -> &str {
		&self.key
	}

	fn accepts_field_count(found: usize) -> bool {
		found >= Self::FIELDS
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		Ok(Self {
			key: fields[0].to_owned(),
			count: fields[1].parse().map_err(|_| format!("bad count {:?}", fields[1]))?,
			extra: fields[2..].iter().map(|field| (*field).to_owned()).collect(),
		})
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		write!(out, "{}\t{}", self.key, self.count)?;
		for field in &self.extra {
			write!(out, "\t{field}")?;
		}
		writeln!(out)
	}
}

impl Counted for PassthroughRecord {
	fn count(&self) -> u64 {
		self.count
	}
}

/// Emits every n-gram of length `1..=max_n` of each line, one per line.
pub fn emit_ngrams<R: BufRead, W: Write>(input: R, output: &mut W, max_n: usize) -> Result<()> {
	for (i, line) in input.lines().enumerate() {
		let line = line?;
		let tokens = tokenize(&line, i + 1)?;
		for gram in ngrams(&tokens, max_n) {
			writeln!(output, "{}", join_tokens(gram))?;
		}
	}
	Ok(())
}

/// Counts a sorted stream of n-gram occurrences into `key \t count`.
pub fn count<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<()> {
	for record in CountRuns::new(RecordReader::<_, KeyRecord>::new(input, SOURCE), SOURCE) {
		record?.write_to(output)?;
	}
	Ok(())
}

/// Appends the JSON list of prefix counts to every record of a sorted
/// `key \t count ...` stream holding every length.
///
/// With `suffixes`, the stream is expected to hold token-reversed keys:
/// the list then holds suffix counts of the original n-gram, in split
/// order (longest suffix first).
pub fn cascade<R: BufRead, W: Write>(input: R, output: &mut W, suffixes: bool) -> Result<()> {
	let records = RecordReader::<_, PassthroughRecord>::new(input, SOURCE);
	for attached in PrefixCascade::new(records, SOURCE) {
		let (mut record, mut counts) = attached?;
		if suffixes {
			counts.reverse();
		}
		record.extra.push(to_string(&counts)?);
		record.write_to(output)?;
	}
	Ok(())
}

/// Reverses the tokens of the first field, leaving other fields as they are.
pub fn reverse<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<()> {
	for line in input.lines() {
		let line = line?;
		if line.is_empty() {
			continue;
		}
		match line.split_once('\t') {
			Some((key, rest)) => writeln!(output, "{}\t{rest}", reverse_key(key))?,
			None => writeln!(output, "{}", reverse_key(&line))?,
		}
	}
	Ok(())
}

/// Removes the records whose key has exactly `n` tokens.
pub fn drop_n<R: BufRead, W: Write>(input: R, output: &mut W, n: usize) -> Result<()> {
	for line in input.lines() {
		let line = line?;
		let key = line.split('\t').next().unwrap_or_default();
		if !line.is_empty() && key_len(key) != n {
			writeln!(output, "{line}")?;
		}
	}
	Ok(())
}

/// Scores full frequency records into accepted `key \t count \t glue \t`
/// records, ready for [`reject`].
pub fn glue<R: BufRead, W: Write>(input: R, output: &mut W, measure: GlueMeasure) -> Result<()> {
	for record in RecordReader::<_, FrequencyRecord>::new(input, SOURCE) {
		let record = record?;
		let glue = measure.glue(&record.key, record.count, &record.prefix_freqs, &record.suffix_freqs)?;
		ScoredRecord { key: record.key, count: record.count, glue, rejected: false }.write_to(output)?;
	}
	Ok(())
}

/// One strict rejection pass over a sorted scored stream.
pub fn reject<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<()> {
	let records = RecordReader::<_, ScoredRecord>::new(input, SOURCE);
	for record in StrictRejection::new(records, SOURCE) {
		record?.write_to(output)?;
	}
	Ok(())
}

/// Prints the non-rejected records of a scored stream as MWU lines.
pub fn accepted<R: BufRead, W: Write>(input: R, output: &mut W) -> Result<()> {
	for record in RecordReader::<_, ScoredRecord>::new(input, SOURCE) {
		let record = record?;
		if record.rejected {
			continue;
		}
		let ngram = Ngram::parse(&record.key)
			.ok_or_else(|| MwuError::malformed(SOURCE, 0, format!("empty key {:?}", record.key)))?;
		writeln!(output, "{}", MwuResult { ngram, frequency: record.count, glue: record.glue })?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run<F>(input: &str, filter: F) -> String
	where
		F: FnOnce(&[u8], &mut Vec<u8>) -> Result<()>,
	{
		let mut out = Vec::new();
		filter(input.as_bytes(), &mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn ngrams_then_count() {
		let grams = run("a b a\n\n", |i, o| emit_ngrams(i, o, 2));
		assert_eq!(grams, "a\nb\na\na b\nb a\n");

		let mut sorted: Vec<&str> = grams.lines().collect();
		sorted.sort();
		let counts = run(&(sorted.join("\n") + "\n"), |i, o| count(i, o));
		assert_eq!(counts, "a\t2\na b\t1\nb\t1\nb a\t1\n");
	}

	#[test]
	fn ngrams_rejects_control_characters() {
		let mut out = Vec::new();
		let err = emit_ngrams("a b\nc\u{2}d\n".as_bytes(), &mut out, 2).unwrap_err();
		assert!(matches!(err, MwuError::InvalidToken { line: 2, .. }), "{err}");
	}

	#[test]
	fn cascade_appends_prefix_then_suffix_lists() {
		let counts = "a\t2\na b\t1\nb\t1\nb a\t1\n";
		assert_eq!(run(counts, |i, o| cascade(i, o, false)), "a\t2\t[]\na b\t1\t[2]\nb\t1\t[]\nb a\t1\t[1]\n");

		let reversed = "x\t5\t[]\nx y\t3\t[5]\nx y z\t1\t[5,3]\n";
		assert_eq!(
			run(reversed, |i, o| cascade(i, o, true)),
			"x\t5\t[]\t[]\nx y\t3\t[5]\t[5]\nx y z\t1\t[5,3]\t[3,5]\n"
		);
	}

	#[test]
	fn reverse_and_drop_n() {
		assert_eq!(run("a b c\t1\t[]\nd\n", |i, o| reverse(i, o)), "c b a\t1\t[]\nd\n");
		assert_eq!(run("a\t1\na b\t2\na b c\t3\n", |i, o| drop_n(i, o, 2)), "a\t1\na b c\t3\n");
	}

	#[test]
	fn glue_reject_and_accept() {
		let scored = run("a b\t3\t[3]\t[3]\nb a\t1\t[3]\t[3]\n", |i, o| glue(i, o, GlueMeasure::Dice));
		let glue_of_b_a = 1.0_f64 / 3.0;
		assert_eq!(scored, format!("a b\t3\t1\t\nb a\t1\t{glue_of_b_a}\t\n"));

		let rejected = run("new york\t4\t0.5\t\nnew york city\t3\t0.8\t\n", |i, o| reject(i, o));
		assert_eq!(rejected, "new york city\t3\t0.8\t\nnew york\t4\t0.5\t-\n");
		assert_eq!(run(&rejected, |i, o| accepted(i, o)), "new york city\t3\t0.8000\n");
	}

	#[test]
	fn malformed_lines_are_fatal() {
		let mut out = Vec::new();
		let err = glue("a b\t3\t[3]\n".as_bytes(), &mut out, GlueMeasure::Scp).unwrap_err();
		assert!(matches!(err, MwuError::MalformedRecord { line: 1, .. }), "{err}");
	}
}
