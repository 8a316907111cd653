use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::ngram::{ngrams, tokenize, Ngram};
use crate::error::{MwuError, Result};
use crate::io::{build_output_path, write_atomically};

/// In-memory frequency table of every n-gram up to a fixed depth.
///
/// # Responsibilities
/// - Count each n-gram of length `1..=depth` occurring in the input lines
/// - Provide O(1) lookup of any sub-length frequency by token slice
/// - Merge with another table of the same depth (several input files)
/// - Persist itself as a compact `postcard` snapshot
///
/// # Invariants
/// - `depth` is always >= 1
/// - Every stored count is >= 1
/// - Every prefix and suffix of a stored n-gram is stored too, with a
///   count greater than or equal to the n-gram's own count
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FrequencyTable {
	/// Longest counted length
	depth: usize,

	/// Occurrence count of every n-gram seen so far
	counts: HashMap<Ngram, u64>,

	/// Number of non-blank lines ingested
	lines: u64,
}

impl FrequencyTable {
	/// Creates an empty table counting lengths `1..=depth`.
	///
	/// # Errors
	/// Returns an error if `depth == 0`.
	pub fn new(depth: usize) -> Result<Self> {
		if depth == 0 {
			return Err(MwuError::InvalidConfig("frequency depth must be >= 1".to_owned()));
		}
		Ok(Self { depth, counts: HashMap::new(), lines: 0 })
	}

	/// Counts every n-gram of the given lines.
	pub fn from_lines<I, S>(depth: usize, lines: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut table = Self::new(depth)?;
		for (i, line) in lines.into_iter().enumerate() {
			table.add_line(i + 1, line.as_ref())?;
		}
		Ok(table)
	}

	/// Counts every n-gram of a line-oriented reader.
	///
	/// # Errors
	/// Propagates read failures and rejected tokens.
	pub fn from_reader<R: BufRead>(depth: usize, reader: R) -> Result<Self> {
		let mut table = Self::new(depth)?;
		for (i, line) in reader.lines().enumerate() {
			table.add_line(i + 1, &line?)?;
		}
		Ok(table)
	}

	/// Adds one line (one sentence) to the table. `number` is the line
	/// position reported by [`MwuError::InvalidToken`].
	///
	/// # Notes
	/// - Blank lines are ignored.
	/// - No n-gram crosses the line boundary.
	pub fn add_line(&mut self, number: usize, line: &str) -> Result<()> {
		let tokens: Vec<String> = tokenize(line, number)?.into_iter().map(str::to_owned).collect();
		if tokens.is_empty() {
			return Ok(());
		}
		self.lines += 1;

		for gram in ngrams(&tokens, self.depth) {
			// Probe by slice first so repeated n-grams do not allocate
			if let Some(count) = self.counts.get_mut(gram) {
				*count += 1;
			} else if let Some(key) = Ngram::new(gram) {
				self.counts.insert(key, 1);
			}
		}
		Ok(())
	}

	/// Frequency of a token sequence, 0 if never seen.
	pub fn get(&self, tokens: &[String]) -> u64 {
		self.counts.get(tokens).copied().unwrap_or(0)
	}

	/// Frequency of an owned n-gram, 0 if never seen.
	pub fn frequency(&self, gram: &Ngram) -> u64 {
		self.counts.get(gram).copied().unwrap_or(0)
	}

	/// Frequency of a whitespace-joined key, 0 if never seen.
	pub fn count_of(&self, joined: &str) -> u64 {
		Ngram::parse(joined).map_or(0, |gram| self.frequency(&gram))
	}

	/// Longest counted length.
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Number of distinct n-grams across all lengths.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Number of non-blank lines ingested.
	pub fn line_count(&self) -> u64 {
		self.lines
	}

	/// Iterates over `(n-gram, count)` pairs in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&Ngram, u64)> {
		self.counts.iter().map(|(gram, count)| (gram, *count))
	}

	/// Merges another table into this one.
	///
	/// # Notes
	/// - Both tables must have the same depth.
	/// - Counts of n-grams present in both are summed.
	///
	/// # Errors
	/// Returns an error if the depths do not match.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.depth != other.depth {
			return Err(MwuError::InvalidConfig(format!(
				"cannot merge frequency tables of depth {} and {}",
				self.depth, other.depth
			)));
		}

		for (gram, count) in &other.counts {
			*self.counts.entry(gram.clone()).or_insert(0) += count;
		}
		self.lines += other.lines;

		Ok(())
	}

	/// Writes a `postcard` snapshot of the table to `path` (atomically).
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		write_atomically(path.as_ref(), |out| Ok(out.write_all(&bytes)?))
	}

	/// Reads a snapshot written by [`FrequencyTable::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let bytes = std::fs::read(path).map_err(|e| MwuError::io(e, path))?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Loads the table of a text file from its snapshot if one exists,
	/// otherwise counts the file and writes the snapshot.
	///
	/// - The snapshot lives next to the text file with a `.bin` extension.
	/// - A snapshot of a different depth is ignored and overwritten.
	///
	/// # Notes
	/// - The snapshot is not invalidated when the text file changes;
	///   delete it to force a recount.
	pub fn load_or_count<P: AsRef<Path>>(text_path: P, depth: usize) -> Result<Self> {
		let text_path = text_path.as_ref();
		let snapshot_path = build_output_path(text_path, "bin")?;

		if snapshot_path.exists() {
			let table = Self::load(&snapshot_path)?;
			if table.depth == depth {
				info!("loaded frequency snapshot {}", snapshot_path.display());
				return Ok(table);
			}
			debug!(
				"snapshot {} has depth {}, expected {}; recounting",
				snapshot_path.display(),
				table.depth,
				depth
			);
		}

		let reader = crate::io::open_lines(text_path)?;
		let table = Self::from_reader(depth, reader)?;
		table.save(&snapshot_path)?;
		info!(
			"counted {} distinct n-grams over {} lines, snapshot written to {}",
			table.len(),
			table.lines,
			snapshot_path.display()
		);
		Ok(table)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn table(lines: &[&str], depth: usize) -> FrequencyTable {
		FrequencyTable::from_lines(depth, lines).unwrap()
	}

	#[test]
	fn counts_all_lengths_up_to_depth() {
		let table = table(&["a b a b", "a b c"], 3);
		assert_eq!(table.count_of("a"), 3);
		assert_eq!(table.count_of("b"), 3);
		assert_eq!(table.count_of("c"), 1);
		assert_eq!(table.count_of("a b"), 3);
		assert_eq!(table.count_of("b a"), 1);
		assert_eq!(table.count_of("a b a"), 1);
		assert_eq!(table.count_of("a b a b"), 0);
		assert_eq!(table.line_count(), 2);
	}

	#[test]
	fn ngrams_do_not_cross_lines() {
		let table = table(&["a b", "", "c d"], 2);
		assert_eq!(table.count_of("b c"), 0);
		assert_eq!(table.line_count(), 2);
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = table(&["x y z"], 2);
		let right = table(&["x y"], 2);
		left.merge(&right).unwrap();
		assert_eq!(left.count_of("x y"), 2);
		assert_eq!(left.count_of("y z"), 1);

		let deeper = table(&["x y"], 3);
		assert!(left.merge(&deeper).is_err());
	}

	#[test]
	fn snapshot_round_trip_and_reuse() {
		let dir = tempdir().unwrap();
		let text = dir.path().join("corpus.txt");
		std::fs::write(&text, "new york is big\nnew york\n").unwrap();

		let counted = FrequencyTable::load_or_count(&text, 3).unwrap();
		assert!(dir.path().join("corpus.bin").exists());

		// the snapshot wins over the text from now on
		std::fs::write(&text, "something else entirely\n").unwrap();
		let loaded = FrequencyTable::load_or_count(&text, 3).unwrap();
		assert_eq!(loaded, counted);
		assert_eq!(loaded.count_of("new york"), 2);

		let recounted = FrequencyTable::load_or_count(&text, 2).unwrap();
		assert_eq!(recounted.count_of("new york"), 0);
	}
}
