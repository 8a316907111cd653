//! Local maxima selection over a glue table.
//!
//! The decision rules are exposed as small pure functions so that the
//! streaming stages apply exactly the same comparisons as the in-memory
//! table walk.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::glue_table::GlueTable;
use super::ngram::Ngram;
use crate::config::SelectionPolicy;
use crate::error::Result;

/// Relaxed rule for one n-gram.
///
/// - n = 2: `glue > max_sup_glue`
/// - 2 < n <= max_n: `glue > (max_sub_glue + max_sup_glue) / 2`
/// - anything else is never selected
pub fn is_relaxed_maximum(n: usize, max_n: usize, glue: f64, max_sub_glue: f64, max_sup_glue: f64) -> bool {
	if n == 2 {
		2 <= max_n && glue > max_sup_glue
	} else {
		2 < n && n <= max_n && glue > (max_sub_glue + max_sup_glue) / 2.0
	}
}

/// Which side of a (longer, shorter) pair the strict rule rejects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrictVerdict {
	/// The longer n-gram is strictly weaker: reject it.
	RejectLonger,
	/// The longer n-gram strictly beats its constituent: reject the constituent.
	RejectShorter,
	/// Equal glue: nobody is rejected by this pair.
	Tie,
}

/// Compares an n-gram against one of its immediate (n-1) constituents.
pub fn strict_verdict(longer_glue: f64, shorter_glue: f64) -> StrictVerdict {
	match longer_glue.partial_cmp(&shorter_glue) {
		Some(Ordering::Less) => StrictVerdict::RejectLonger,
		Some(Ordering::Greater) => StrictVerdict::RejectShorter,
		_ => StrictVerdict::Tie,
	}
}

/// Selects the local maxima of a glue table under `policy`.
///
/// Returns the accepted n-grams (lengths `2..=max_n`) in no particular order.
pub fn select(glues: &GlueTable, policy: SelectionPolicy, max_n: usize) -> Result<Vec<&Ngram>> {
	match policy {
		SelectionPolicy::Relaxed => select_relaxed(glues, max_n),
		SelectionPolicy::Strict => select_strict(glues, max_n),
	}
}

/// Relaxed policy: every n-gram is judged on the best glue among its two
/// immediate sub-grams and among all its immediate super-grams.
fn select_relaxed(glues: &GlueTable, max_n: usize) -> Result<Vec<&Ngram>> {
	let mut max_sub: HashMap<&[String], f64> = HashMap::new();
	let mut max_sup: HashMap<&[String], f64> = HashMap::new();

	for (gram, glue) in glues.iter() {
		let n = gram.len();
		if n <= 2 {
			continue;
		}
		let suffix = gram.suffix(n - 1);
		let prefix = gram.prefix(n - 1);
		let best_sub = glues.constituent(suffix)?.max(glues.constituent(prefix)?);
		max_sub.insert(gram.tokens(), best_sub);

		for constituent in [suffix, prefix] {
			let sup = max_sup.entry(constituent).or_insert(0.0);
			if glue > *sup {
				*sup = glue;
			}
		}
	}

	let accepted = glues
		.iter()
		.filter(|(gram, glue)| {
			let sub = max_sub.get(gram.tokens()).copied().unwrap_or(0.0);
			let sup = max_sup.get(gram.tokens()).copied().unwrap_or(0.0);
			is_relaxed_maximum(gram.len(), max_n, *glue, sub, sup)
		})
		.map(|(gram, _)| gram)
		.collect();
	Ok(accepted)
}

/// Strict policy: rejections propagate from each n-gram to its two
/// immediate constituents and back.
fn select_strict(glues: &GlueTable, max_n: usize) -> Result<Vec<&Ngram>> {
	let mut rejected: HashSet<&[String]> = HashSet::new();

	for (gram, glue) in glues.iter() {
		let n = gram.len();
		if n > max_n {
			rejected.insert(gram.tokens());
		}
		if n <= 2 {
			continue;
		}
		for constituent in [gram.suffix(n - 1), gram.prefix(n - 1)] {
			match strict_verdict(glue, glues.constituent(constituent)?) {
				StrictVerdict::RejectLonger => {
					rejected.insert(gram.tokens());
				}
				StrictVerdict::RejectShorter => {
					rejected.insert(constituent);
				}
				StrictVerdict::Tie => {}
			}
		}
	}

	Ok(glues
		.iter()
		.map(|(gram, _)| gram)
		.filter(|gram| gram.len() <= max_n && !rejected.contains(gram.tokens()))
		.collect())
}
