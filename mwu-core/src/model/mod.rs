//! In-memory side of the extractor and the scoring primitives shared with
//! the streaming pipeline.
//!
//! This module provides:
//! - The n-gram type and emitter (`Ngram`, `ngrams`)
//! - Full frequency and glue tables (`FrequencyTable`, `GlueTable`)
//! - The glue measures (`GlueMeasure::glue`)
//! - Local maxima selection rules (`local_maxima`)
//! - A high-level extraction interface (`Extractor`)

/// High-level in-memory extraction returning sorted `MwuResult`s.
pub mod extractor;

/// Frequency table of every n-gram up to a fixed depth.
///
/// Supports counting from lines or readers, merging, and `postcard`
/// snapshots on disk.
pub mod frequency_table;

/// Dice and SCP glue measures.
mod glue;

/// Glue score of every n-gram of length >= 2 of a frequency table.
pub mod glue_table;

/// Relaxed and strict local maxima selection.
pub mod local_maxima;

/// N-gram type, tokenizer, emitter and joined-key helpers.
pub mod ngram;
