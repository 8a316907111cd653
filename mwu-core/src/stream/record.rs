//! Tab-separated record formats of the streaming intermediates.
//!
//! | record            | fields                                         |
//! |-------------------|------------------------------------------------|
//! | `KeyRecord`       | key                                            |
//! | `CountRecord`     | key, count                                     |
//! | `FrequencyRecord` | key, count, prefix freqs (JSON), suffix freqs (JSON) |
//! | `GlueRecord`      | key, glue, max sub-gram glue, max super-gram glue |
//! | `ScoredRecord`    | key, count, glue, stat (`-` rejected, blank accepted) |
//!
//! Keys are n-grams joined by single spaces. Glue values use the shortest
//! representation that parses back to the same `f64`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::marker::PhantomData;
use std::path::Path;

use crate::error::{MwuError, Result};

/// A line of a streaming file.
pub trait Record: Sized {
	/// Number of tab-separated fields.
	const FIELDS: usize;

	/// Joined n-gram the file is sorted on.
	fn key(&self) -> &str;

	/// Builds the record from exactly `FIELDS` fields.
	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String>;

	/// Writes the record followed by a newline.
	fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;

	/// Whether a line with `found` fields can hold this record.
	fn accepts_field_count(found: usize) -> bool {
		found == Self::FIELDS
	}

	/// Parses one line, labelling failures with `source_name` and `line`.
	fn parse(text: &str, source_name: &str, line: usize) -> Result<Self> {
		let fields: Vec<&str> = text.split('\t').collect();
		if !Self::accepts_field_count(fields.len()) {
			return Err(MwuError::malformed(
				source_name,
				line,
				format!("expected {} tab-separated fields, found {}", Self::FIELDS, fields.len()),
			));
		}
		Self::from_fields(&fields).map_err(|reason| MwuError::malformed(source_name, line, reason))
	}
}

/// Records carrying a raw occurrence count, the input of the prefix cascade.
pub trait Counted: Record {
	fn count(&self) -> u64;
}

fn parse_count(field: &str) -> std::result::Result<u64, String> {
	field.parse().map_err(|_| format!("bad count {field:?}"))
}

fn parse_glue(field: &str) -> std::result::Result<f64, String> {
	field.parse().map_err(|_| format!("bad glue {field:?}"))
}

fn parse_freqs(field: &str) -> std::result::Result<Vec<u64>, String> {
	serde_json::from_str(field).map_err(|e| format!("bad frequency list {field:?}: {e}"))
}

fn freqs_json(freqs: &[u64]) -> io::Result<String> {
	serde_json::to_string(freqs).map_err(io::Error::other)
}

/// One occurrence of an n-gram, as emitted before counting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRecord {
	pub key: String,
}

impl Record for KeyRecord {
	const FIELDS: usize = 1;

	fn key(&self) -> &str {
		&self.key
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		Ok(Self { key: fields[0].to_owned() })
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}", self.key)
	}
}

/// Occurrence count of one n-gram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountRecord {
	pub key: String,
	pub count: u64,
}

impl Record for CountRecord {
	const FIELDS: usize = 2;

	fn key(&self) -> &str {
		&self.key
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		Ok(Self { key: fields[0].to_owned(), count: parse_count(fields[1])? })
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}\t{}", self.key, self.count)
	}
}

impl Counted for CountRecord {
	fn count(&self) -> u64 {
		self.count
	}
}

/// Count of an n-gram plus the counts of its prefixes and suffixes.
///
/// # Invariants
/// Once both cascades ran, for an n-gram of length n, both lists hold
/// `n - 1` entries in split order: entry `i` describes the split after
/// token `i + 1`.
/// - `prefix_freqs[i]` is the count of its length `i + 1` prefix
/// - `suffix_freqs[i]` is the count of its length `n - i - 1` suffix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyRecord {
	pub key: String,
	pub count: u64,
	pub prefix_freqs: Vec<u64>,
	pub suffix_freqs: Vec<u64>,
}

impl Record for FrequencyRecord {
	const FIELDS: usize = 4;

	fn key(&self) -> &str {
		&self.key
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		Ok(Self {
			key: fields[0].to_owned(),
			count: parse_count(fields[1])?,
			prefix_freqs: parse_freqs(fields[2])?,
			suffix_freqs: parse_freqs(fields[3])?,
		})
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(
			out,
			"{}\t{}\t{}\t{}",
			self.key,
			self.count,
			freqs_json(&self.prefix_freqs)?,
			freqs_json(&self.suffix_freqs)?
		)
	}
}

/// Glue of an n-gram with the best glue of its neighbours, used by the
/// relaxed policy.
#[derive(Clone, Debug, PartialEq)]
pub struct GlueRecord {
	pub key: String,
	pub glue: f64,
	/// Highest glue among the length n-1 prefix and suffix
	pub max_sub_glue: f64,
	/// Highest glue among the length n+1 n-grams containing this one
	/// as prefix or suffix
	pub max_sup_glue: f64,
}

impl GlueRecord {
	/// A freshly scored record, neighbours not propagated yet.
	pub fn new(key: String, glue: f64) -> Self {
		Self { key, glue, max_sub_glue: 0.0, max_sup_glue: 0.0 }
	}
}

impl Record for GlueRecord {
	const FIELDS: usize = 4;

	fn key(&self) -> &str {
		&self.key
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		Ok(Self {
			key: fields[0].to_owned(),
			glue: parse_glue(fields[1])?,
			max_sub_glue: parse_glue(fields[2])?,
			max_sup_glue: parse_glue(fields[3])?,
		})
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}\t{}\t{}\t{}", self.key, self.glue, self.max_sub_glue, self.max_sup_glue)
	}
}

/// Count and glue of an n-gram with its strict-policy status.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredRecord {
	pub key: String,
	pub count: u64,
	pub glue: f64,
	pub rejected: bool,
}

impl Record for ScoredRecord {
	const FIELDS: usize = 4;

	fn key(&self) -> &str {
		&self.key
	}

	fn from_fields(fields: &[&str]) -> std::result::Result<Self, String> {
		let rejected = match fields[3] {
			"" => false,
			"-" => true,
			other => return Err(format!("bad stat flag {other:?}")),
		};
		Ok(Self {
			key: fields[0].to_owned(),
			count: parse_count(fields[1])?,
			glue: parse_glue(fields[2])?,
			rejected,
		})
	}

	fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
		let stat = if self.rejected { "-" } else { "" };
		writeln!(out, "{}\t{}\t{}\t{}", self.key, self.count, self.glue, stat)
	}
}

/// Line-by-line record reader.
///
/// Blank lines are skipped; line numbers in errors are 1-based.
pub struct RecordReader<R, T> {
	lines: Lines<R>,
	source_name: String,
	line: usize,
	_record: PhantomData<T>,
}

impl<R: BufRead, T: Record> RecordReader<R, T> {
	pub fn new(reader: R, source_name: impl Into<String>) -> Self {
		Self { lines: reader.lines(), source_name: source_name.into(), line: 0, _record: PhantomData }
	}
}

impl<T: Record> RecordReader<BufReader<File>, T> {
	/// Opens a record file.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let reader = crate::io::open_lines(path)?;
		Ok(Self::new(reader, path.display().to_string()))
	}
}

impl<R: BufRead, T: Record> Iterator for RecordReader<R, T> {
	type Item = Result<T>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let text = match self.lines.next()? {
				Ok(text) => text,
				Err(e) => return Some(Err(MwuError::io(e, &self.source_name))),
			};
			self.line += 1;
			if text.is_empty() {
				continue;
			}
			return Some(T::parse(&text, &self.source_name, self.line));
		}
	}
}
