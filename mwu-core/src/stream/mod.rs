//! Streaming side of the extractor.
//!
//! Each n-gram length lives in its own file, sorted by joined key. Sort
//! order makes every prefix relation local, so the stages below only keep
//! small stacks in memory:
//! - `freq_cascade`: counting and prefix/suffix frequencies
//! - `glue_cascade`: neighbour glue propagation for the relaxed policy
//! - `rejection`: one strict rejection pass
//! - `pipeline`: the on-disk driver chaining every stage
//! - `filters`: the same stages as stdin/stdout filters

/// Single stages as line filters.
pub mod filters;

/// Run-length counting and the prefix frequency cascade.
pub mod freq_cascade;

/// Adjacent-length glue propagation.
pub mod glue_cascade;

/// On-disk pipeline driver.
pub mod pipeline;

/// Stack of open ancestor keys.
pub mod prefix_stack;

/// Tab-separated intermediate records.
pub mod record;

/// Strict rejection over a sorted stream.
pub mod rejection;

/// File sorting backends.
pub mod sort;

/// Order validation and k-way merge.
pub mod sorted;

pub use pipeline::{Stage, StreamingPipeline};
pub use sort::{ExternalSort, InMemorySort, Sorter};
