//! Error type shared by every extraction stage.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = MwuError> = std::result::Result<T, E>;

/// Failures raised while configuring or running an extraction.
///
/// None of these are retried: the pipeline is a deterministic batch
/// computation, so the only recovery is fixing the input and running again.
#[derive(Debug, Error)]
pub enum MwuError {
	/// Unknown measure or policy name, or a maximum length below 2.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Filesystem error with the offending path when known.
	#[error("io error while processing {path:?}: {source}")]
	Io {
		source: std::io::Error,
		path: Option<PathBuf>,
	},

	/// An intermediate line does not have the expected shape.
	#[error("malformed record in {source_name} at line {line}: {reason}")]
	MalformedRecord {
		source_name: String,
		line: usize,
		reason: String,
	},

	/// A streaming stage read a key smaller than its predecessor.
	#[error("unsorted input in {source_name} at line {line}: {current:?} follows {previous:?}")]
	UnsortedInput {
		source_name: String,
		line: usize,
		previous: String,
		current: String,
	},

	/// A token holds a control character, which sorts below the key separator.
	#[error("invalid token {token:?} at line {line}: control characters are not allowed")]
	InvalidToken { line: usize, token: String },

	/// A sub-gram that every occurrence of `ngram` implies is absent.
	#[error("missing sub-gram data for {ngram:?}")]
	MissingSubgram { ngram: String },

	/// A glue denominator evaluated to zero.
	#[error("degenerate frequencies for {ngram:?}: glue denominator is zero")]
	DegenerateFrequency { ngram: String },

	/// Snapshot or JSON list (de)serialization failure.
	#[error("serialization error: {0}")]
	Serialization(String),

	/// Invariant violations that should not be reachable.
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<std::io::Error> for MwuError {
	fn from(source: std::io::Error) -> Self {
		Self::Io { source, path: None }
	}
}

impl From<postcard::Error> for MwuError {
	fn from(err: postcard::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl From<serde_json::Error> for MwuError {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}

impl MwuError {
	/// Wraps an IO error, attaching the path it happened on.
	pub fn io(source: std::io::Error, path: impl AsRef<Path>) -> Self {
		Self::Io { source, path: Some(path.as_ref().to_path_buf()) }
	}

	pub(crate) fn malformed(source_name: &str, line: usize, reason: impl Into<String>) -> Self {
		Self::MalformedRecord {
			source_name: source_name.to_owned(),
			line,
			reason: reason.into(),
		}
	}
}
