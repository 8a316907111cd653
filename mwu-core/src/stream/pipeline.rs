use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::freq_cascade::{CountRuns, PrefixCascade};
use super::glue_cascade::GlueCascade;
use super::record::{CountRecord, FrequencyRecord, GlueRecord, KeyRecord, Record, RecordReader, ScoredRecord};
use super::rejection::StrictRejection;
use super::sort::{ExternalSort, Sorter};
use super::sorted::{SortedMerge, lockstep};
use crate::config::{ExtractionConfig, SelectionPolicy};
use crate::error::{MwuError, Result};
use crate::io::{AtomicWriter, ensure_dir, open_lines, remove_if_exists, write_atomically};
use crate::model::extractor::{MwuResult, sort_results};
use crate::model::local_maxima::is_relaxed_maximum;
use crate::model::ngram::{Ngram, join_tokens, key_len, ngrams, reverse_key, tokenize};

/// Name of the final output file in the work directory.
pub const OUTPUT_FILE: &str = "mwus.tsv";

/// Kind of a per-length intermediate file, `{n}gram_{name}.tsv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	/// Raw occurrences, one key per line, unsorted
	Occurrences,
	SortedOccurrences,
	/// `CountRecord`s, the base every later stage derives from
	Counts,
	ReversedCountsUnsorted,
	ReversedCounts,
	Prefixes,
	SuffixesUnsorted,
	Suffixes,
	/// Complete `FrequencyRecord`s
	Freqs,
	/// `GlueRecord`s (relaxed policy)
	Glues,
	/// `ScoredRecord`s before rejection (strict policy)
	Scored,
	ReversedScoredUnsorted,
	ReversedScored,
	RejectedUnsorted,
	/// `ScoredRecord`s after both rejection passes
	Rejected,
	/// Selected units of one length, in output format
	Mwus,
}

impl Stage {
	pub fn name(self) -> &'static str {
		match self {
			Stage::Occurrences => "occurrences",
			Stage::SortedOccurrences => "occurrences_sorted",
			Stage::Counts => "counts",
			Stage::ReversedCountsUnsorted => "counts_reversed_unsorted",
			Stage::ReversedCounts => "counts_reversed",
			Stage::Prefixes => "prefixes",
			Stage::SuffixesUnsorted => "suffixes_unsorted",
			Stage::Suffixes => "suffixes",
			Stage::Freqs => "freqs",
			Stage::Glues => "glues",
			Stage::Scored => "scored",
			Stage::ReversedScoredUnsorted => "scored_reversed_unsorted",
			Stage::ReversedScored => "scored_reversed",
			Stage::RejectedUnsorted => "rejected_unsorted",
			Stage::Rejected => "rejected",
			Stage::Mwus => "mwus",
		}
	}
}

/// One open output file per n-gram length.
struct LengthWriters {
	first: usize,
	writers: Vec<AtomicWriter>,
}

impl LengthWriters {
	fn create<F>(lengths: RangeInclusive<usize>, path_of: F) -> Result<Self>
	where
		F: Fn(usize) -> PathBuf,
	{
		let first = *lengths.start();
		let writers = lengths.map(|n| AtomicWriter::create(path_of(n))).collect::<Result<_>>()?;
		Ok(Self { first, writers })
	}

	fn write<T: Record>(&mut self, n: usize, record: &T) -> Result<()> {
		let writer = n
			.checked_sub(self.first)
			.and_then(|i| self.writers.get_mut(i))
			.ok_or_else(|| MwuError::Internal(format!("no output file for {n}-grams")))?;
		record.write_to(&mut *writer).map_err(|e| MwuError::io(e, writer.target()))
	}

	fn commit(self) -> Result<()> {
		for writer in self.writers {
			writer.commit()?;
		}
		Ok(())
	}
}

/// Writes a record stream to `target` atomically, returning the record count.
fn write_records<T, I>(target: &Path, records: I) -> Result<usize>
where
	T: Record,
	I: IntoIterator<Item = Result<T>>,
{
	let mut writer = AtomicWriter::create(target)?;
	let mut written = 0;
	for record in records {
		record?.write_to(&mut writer).map_err(|e| MwuError::io(e, target))?;
		written += 1;
	}
	writer.commit()?;
	Ok(written)
}

fn mwu_result(key: &str, frequency: u64, glue: f64) -> Result<MwuResult> {
	let ngram = Ngram::parse(key).ok_or_else(|| MwuError::Internal("empty key in a scored file".to_owned()))?;
	Ok(MwuResult { ngram, frequency, glue })
}

/// Streaming extraction over sorted per-length files.
///
/// Memory use is bounded by the sort and by short prefix stacks, except
/// for the relaxed glue cascade which holds one length at a time. Every
/// intermediate file is sorted by joined key and published atomically;
/// readers check the order and stop at the first out-of-order key.
///
/// # Responsibilities
/// - Count n-grams of length `1..=max_n + 1` ([`StreamingPipeline::count_ngrams`])
/// - Attach prefix and suffix frequencies ([`StreamingPipeline::cascade_frequencies`])
/// - Score lengths `2..=max_n + 1` ([`StreamingPipeline::compute_glues`])
/// - Relaxed: propagate neighbour glue and select
///   ([`StreamingPipeline::cascade_glues`], [`StreamingPipeline::select_relaxed`])
/// - Strict: two rejection passes and select
///   ([`StreamingPipeline::reject_strict`], [`StreamingPipeline::select_strict`])
///
/// # Notes
/// - The result equals [`crate::Extractor`]'s on the same corpus, glue
///   scores included: intermediate files keep full float precision.
pub struct StreamingPipeline<S = ExternalSort> {
	config: ExtractionConfig,
	work_dir: PathBuf,
	sorter: S,
}

impl StreamingPipeline<ExternalSort> {
	/// A pipeline sorting with the system `sort` utility.
	pub fn new(config: ExtractionConfig, work_dir: impl Into<PathBuf>) -> Self {
		Self::with_sorter(config, work_dir, ExternalSort::default())
	}
}

impl<S: Sorter> StreamingPipeline<S> {
	pub fn with_sorter(config: ExtractionConfig, work_dir: impl Into<PathBuf>, sorter: S) -> Self {
		Self { config, work_dir: work_dir.into(), sorter }
	}

	pub fn work_dir(&self) -> &Path {
		&self.work_dir
	}

	/// Path of the length-`n` file of a stage.
	pub fn path(&self, n: usize, stage: Stage) -> PathBuf {
		self.work_dir.join(format!("{n}gram_{}.tsv", stage.name()))
	}

	/// Path of the final, all-length output.
	pub fn output_path(&self) -> PathBuf {
		self.work_dir.join(OUTPUT_FILE)
	}

	/// Runs every stage on a text file, writes [`OUTPUT_FILE`] and returns
	/// the selected units sorted by length then key.
	pub fn run<P: AsRef<Path>>(&self, text: P) -> Result<Vec<MwuResult>> {
		let text = text.as_ref();
		info!(
			"streaming extraction of {} into {} ({}, {}, max_n = {})",
			text.display(),
			self.work_dir.display(),
			self.config.measure,
			self.config.policy,
			self.config.max_n()
		);

		self.count_ngrams(text)?;
		self.cascade_frequencies()?;
		self.compute_glues()?;
		let mut results = match self.config.policy {
			SelectionPolicy::Relaxed => {
				self.cascade_glues()?;
				self.select_relaxed()?
			}
			SelectionPolicy::Strict => {
				self.reject_strict()?;
				self.select_strict()?
			}
		};
		sort_results(&mut results);

		write_atomically(&self.output_path(), |out| {
			for result in &results {
				writeln!(out, "{result}")?;
			}
			Ok(())
		})?;
		info!("selected {} units, written to {}", results.len(), self.output_path().display());
		Ok(results)
	}

	fn readers<T: Record>(
		&self,
		lengths: RangeInclusive<usize>,
		stage: Stage,
	) -> Result<Vec<RecordReader<BufReader<File>, T>>> {
		lengths.map(|n| RecordReader::open(self.path(n, stage))).collect()
	}

	/// Sorts the `from` file of length `n` into the `to` file and removes it.
	fn sort_stage(&self, n: usize, from: Stage, to: Stage) -> Result<()> {
		let input = self.path(n, from);
		self.sorter.sort_file(&input, &self.path(n, to))?;
		remove_if_exists(&input)
	}

	/// Stage 1: emits every n-gram of length `1..=max_n + 1` of the text,
	/// sorts each length and counts it into `{n}gram_counts.tsv`.
	///
	/// Creates the work directory when missing.
	pub fn count_ngrams<P: AsRef<Path>>(&self, text: P) -> Result<()> {
		let text = text.as_ref();
		let depth = self.config.depth();
		ensure_dir(&self.work_dir)?;

		let mut occurrences = LengthWriters::create(1..=depth, |n| self.path(n, Stage::Occurrences))?;
		let mut lines = 0u64;
		for (i, line) in open_lines(text)?.lines().enumerate() {
			let line = line.map_err(|e| MwuError::io(e, text))?;
			let tokens = tokenize(&line, i + 1)?;
			if tokens.is_empty() {
				continue;
			}
			lines += 1;
			for gram in ngrams(&tokens, depth) {
				occurrences.write(gram.len(), &KeyRecord { key: join_tokens(gram) })?;
			}
		}
		occurrences.commit()?;
		if lines == 0 {
			warn!("{} holds no token, nothing to extract", text.display());
		}

		for n in 1..=depth {
			self.sort_stage(n, Stage::Occurrences, Stage::SortedOccurrences)?;
			let sorted = self.path(n, Stage::SortedOccurrences);
			let occurrences = RecordReader::<_, KeyRecord>::open(&sorted)?;
			let distinct = write_records(
				&self.path(n, Stage::Counts),
				CountRuns::new(occurrences, sorted.display().to_string()),
			)?;
			remove_if_exists(&sorted)?;
			debug!("{n}-grams: {distinct} distinct");
		}
		info!("counted n-grams of length 1..={depth} over {lines} lines");
		Ok(())
	}

	/// Stage 2: attaches prefix and suffix frequencies to every n-gram of
	/// length `2..=max_n + 1`, producing `{n}gram_freqs.tsv`.
	///
	/// Prefix counts come from one cascade over all count files merged.
	/// Suffix counts come from the same cascade over token-reversed keys,
	/// mapped back to the original keys and re-sorted. The two halves are
	/// then joined line by line.
	pub fn cascade_frequencies(&self) -> Result<()> {
		let depth = self.config.depth();

		let counts = self.readers::<CountRecord>(1..=depth, Stage::Counts)?;
		let mut prefixes = LengthWriters::create(2..=depth, |n| self.path(n, Stage::Prefixes))?;
		for attached in PrefixCascade::new(SortedMerge::new(counts), "merged counts") {
			let (record, prefix_freqs) = attached?;
			let n = key_len(&record.key);
			if n >= 2 {
				let record = FrequencyRecord { key: record.key, count: record.count, prefix_freqs, suffix_freqs: Vec::new() };
				prefixes.write(n, &record)?;
			}
		}
		prefixes.commit()?;
		debug!("prefix cascade done");

		for n in 1..=depth {
			let reversed = RecordReader::<_, CountRecord>::open(self.path(n, Stage::Counts))?
				.map(|record| record.map(|c| CountRecord { key: reverse_key(&c.key), count: c.count }));
			write_records(&self.path(n, Stage::ReversedCountsUnsorted), reversed)?;
			self.sort_stage(n, Stage::ReversedCountsUnsorted, Stage::ReversedCounts)?;
		}

		let reversed = self.readers::<CountRecord>(1..=depth, Stage::ReversedCounts)?;
		let mut suffixes = LengthWriters::create(2..=depth, |n| self.path(n, Stage::SuffixesUnsorted))?;
		for attached in PrefixCascade::new(SortedMerge::new(reversed), "merged reversed counts") {
			let (record, mut suffix_freqs) = attached?;
			let n = key_len(&record.key);
			if n >= 2 {
				// shortest suffix first; split order starts with the longest
				suffix_freqs.reverse();
				let record = FrequencyRecord {
					key: reverse_key(&record.key),
					count: record.count,
					prefix_freqs: Vec::new(),
					suffix_freqs,
				};
				suffixes.write(n, &record)?;
			}
		}
		suffixes.commit()?;
		for n in 1..=depth {
			remove_if_exists(self.path(n, Stage::ReversedCounts))?;
		}
		debug!("suffix cascade done");

		for n in 2..=depth {
			self.sort_stage(n, Stage::SuffixesUnsorted, Stage::Suffixes)?;
			let joined = lockstep(
				RecordReader::<_, FrequencyRecord>::open(self.path(n, Stage::Prefixes))?,
				RecordReader::<_, FrequencyRecord>::open(self.path(n, Stage::Suffixes))?,
			)
			.map(|pair| pair.map(|(prefix, suffix)| FrequencyRecord { suffix_freqs: suffix.suffix_freqs, ..prefix }));
			let written = write_records(&self.path(n, Stage::Freqs), joined)?;
			remove_if_exists(self.path(n, Stage::Prefixes))?;
			remove_if_exists(self.path(n, Stage::Suffixes))?;
			debug!("{n}-grams: {written} frequency records");
		}
		info!("frequency cascade done for lengths 2..={depth}");
		Ok(())
	}

	/// Stage 3: scores every n-gram of length `2..=max_n + 1`.
	///
	/// Writes `{n}gram_glues.tsv` for the relaxed policy and
	/// `{n}gram_scored.tsv` for the strict one, where n-grams longer than
	/// `max_n` start out rejected.
	pub fn compute_glues(&self) -> Result<()> {
		let depth = self.config.depth();
		let max_n = self.config.max_n();
		let measure = self.config.measure;

		for n in 2..=depth {
			let scored = RecordReader::<_, FrequencyRecord>::open(self.path(n, Stage::Freqs))?.map(
				|record: Result<FrequencyRecord>| -> Result<(FrequencyRecord, f64)> {
					let record = record?;
					let glue = measure.glue(&record.key, record.count, &record.prefix_freqs, &record.suffix_freqs)?;
					Ok((record, glue))
				},
			);
			let written = match self.config.policy {
				SelectionPolicy::Relaxed => write_records(
					&self.path(n, Stage::Glues),
					scored.map(|scored| scored.map(|(record, glue)| GlueRecord::new(record.key, glue))),
				)?,
				SelectionPolicy::Strict => write_records(
					&self.path(n, Stage::Scored),
					scored.map(|scored| {
						scored.map(|(record, glue)| ScoredRecord {
							key: record.key,
							count: record.count,
							glue,
							rejected: n > max_n,
						})
					}),
				)?,
			};
			debug!("{n}-grams: {written} glue scores");
		}
		info!("computed {measure} glue for lengths 2..={depth}");
		Ok(())
	}

	/// Stage 4 (relaxed): fills `max_sub_glue` and `max_sup_glue` of every
	/// `{n}gram_glues.tsv`, longest pair of lengths first.
	pub fn cascade_glues(&self) -> Result<()> {
		let depth = self.config.depth();

		for n in (3..=depth).rev() {
			let shorter_path = self.path(n - 1, Stage::Glues);
			let mut cascade = GlueCascade::new(RecordReader::<_, GlueRecord>::open(&shorter_path)?)?;

			let longer_path = self.path(n, Stage::Glues);
			let mut writer = AtomicWriter::create(&longer_path)?;
			// the reader is dropped with the loop, before the commit replaces its file
			for record in RecordReader::<_, GlueRecord>::open(&longer_path)? {
				cascade.scan(record?)?.write_to(&mut writer).map_err(|e| MwuError::io(e, &longer_path))?;
			}
			writer.commit()?;

			debug!("glue cascade {n} -> {}: {} constituents", n - 1, cascade.len());
			write_records(&shorter_path, cascade.finish().into_iter().map(Ok))?;
		}
		info!("glue cascade done for lengths 2..={depth}");
		Ok(())
	}

	/// Stage 5 (relaxed): keeps the local maxima of length `2..=max_n`.
	pub fn select_relaxed(&self) -> Result<Vec<MwuResult>> {
		let max_n = self.config.max_n();
		let mut results = Vec::new();

		for n in 2..=max_n {
			let glues = RecordReader::<_, GlueRecord>::open(self.path(n, Stage::Glues))?;
			let freqs = RecordReader::<_, FrequencyRecord>::open(self.path(n, Stage::Freqs))?;
			let mut selected = Vec::new();
			for pair in lockstep(glues, freqs) {
				let (glue, freq) = pair?;
				if is_relaxed_maximum(n, max_n, glue.glue, glue.max_sub_glue, glue.max_sup_glue) {
					selected.push(mwu_result(&glue.key, freq.count, glue.glue)?);
				}
			}
			self.write_selected(n, &selected)?;
			results.extend(selected);
		}
		Ok(results)
	}

	/// Stage 4 (strict): runs the rejection pass forward, comparing every
	/// n-gram with its prefix, then on token-reversed keys, comparing it
	/// with its suffix. Produces `{n}gram_rejected.tsv`.
	pub fn reject_strict(&self) -> Result<()> {
		let depth = self.config.depth();

		let scored = self.readers::<ScoredRecord>(2..=depth, Stage::Scored)?;
		let mut reversed = LengthWriters::create(2..=depth, |n| self.path(n, Stage::ReversedScoredUnsorted))?;
		for record in StrictRejection::new(SortedMerge::new(scored), "merged scores") {
			let record = record?;
			let n = key_len(&record.key);
			reversed.write(n, &ScoredRecord { key: reverse_key(&record.key), ..record })?;
		}
		reversed.commit()?;
		for n in 2..=depth {
			self.sort_stage(n, Stage::ReversedScoredUnsorted, Stage::ReversedScored)?;
		}
		debug!("forward rejection pass done");

		let reversed = self.readers::<ScoredRecord>(2..=depth, Stage::ReversedScored)?;
		let mut rejected = LengthWriters::create(2..=depth, |n| self.path(n, Stage::RejectedUnsorted))?;
		for record in StrictRejection::new(SortedMerge::new(reversed), "merged reversed scores") {
			let record = record?;
			let n = key_len(&record.key);
			rejected.write(n, &ScoredRecord { key: reverse_key(&record.key), ..record })?;
		}
		rejected.commit()?;
		for n in 2..=depth {
			remove_if_exists(self.path(n, Stage::ReversedScored))?;
			self.sort_stage(n, Stage::RejectedUnsorted, Stage::Rejected)?;
		}
		info!("strict rejection done for lengths 2..={depth}");
		Ok(())
	}

	/// Stage 5 (strict): keeps the non-rejected n-grams of length `2..=max_n`.
	pub fn select_strict(&self) -> Result<Vec<MwuResult>> {
		let mut results = Vec::new();

		for n in 2..=self.config.max_n() {
			let mut selected = Vec::new();
			for record in RecordReader::<_, ScoredRecord>::open(self.path(n, Stage::Rejected))? {
				let record = record?;
				if !record.rejected {
					selected.push(mwu_result(&record.key, record.count, record.glue)?);
				}
			}
			self.write_selected(n, &selected)?;
			results.extend(selected);
		}
		Ok(results)
	}

	fn write_selected(&self, n: usize, selected: &[MwuResult]) -> Result<()> {
		debug!("{n}-grams: {} selected", selected.len());
		write_atomically(&self.path(n, Stage::Mwus), |out| {
			for result in selected {
				writeln!(out, "{result}")?;
			}
			Ok(())
		})
	}
}
