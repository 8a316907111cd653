//! Multi-word unit extraction with the Local Maxima algorithm
//! (Silva & Lopes, 1999).
//!
//! Every contiguous span of a tokenized corpus (one sentence per line, up
//! to a maximum length) gets a glue score, Dice or Symmetric Conditional
//! Probability, from n-gram frequencies. Spans whose glue is a local
//! maximum with respect to their sub-grams and super-grams are kept as
//! multi-word units.
//!
//! Two strategies compute the same result:
//! - [`Extractor`] keeps every table in memory
//! - [`StreamingPipeline`] processes one length at a time as sorted files
//!   with bounded auxiliary state, for corpora that do not fit in memory
//!
//! ```no_run
//! use mwu_core::{ExtractionConfig, Extractor, GlueMeasure, SelectionPolicy};
//!
//! # fn main() -> mwu_core::Result<()> {
//! let config = ExtractionConfig::new(GlueMeasure::Scp, SelectionPolicy::Relaxed, 4)?;
//! for unit in Extractor::new(config).extract_lines(["new york is big", "i love new york"])? {
//!     println!("{unit}");
//! }
//! # Ok(())
//! # }
//! ```

/// Run parameters: glue measure, selection policy and maximum length.
pub mod config;

/// Crate-wide error type.
pub mod error;

/// In-memory tables, glue measures and local maxima rules.
pub mod model;

/// Sorted-stream stages and the on-disk pipeline driving them.
pub mod stream;

/// I/O utilities (line readers, atomic writes, path helpers).
pub mod io;

pub use config::{ExtractionConfig, GlueMeasure, SelectionPolicy};
pub use error::{MwuError, Result};
pub use model::extractor::{Extractor, MwuResult};
pub use model::frequency_table::FrequencyTable;
pub use model::ngram::Ngram;
pub use stream::{ExternalSort, InMemorySort, Sorter, StreamingPipeline};
