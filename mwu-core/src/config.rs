use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MwuError, Result};

/// Association measure used to score an n-gram from its split frequencies.
///
/// # Variants
/// - `Dice`: twice the n-gram frequency over the sum of the averaged
///   left and right split frequencies.
/// - `Scp`: Symmetric Conditional Probability, the squared frequency over
///   the average product of split frequencies.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlueMeasure {
	Dice,
	Scp,
}

/// Local maxima selection rule.
///
/// # Variants
/// - `Relaxed`: compares an n-gram glue with the average of the best
///   sub-gram and the best super-gram glue. Purely local, no propagation.
/// - `Strict`: an n-gram must beat both its immediate sub-grams, and a
///   longer unit rejects any strictly weaker contained unit.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionPolicy {
	Relaxed,
	Strict,
}

impl FromStr for GlueMeasure {
	type Err = MwuError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"dice" => Ok(Self::Dice),
			"scp" => Ok(Self::Scp),
			other => Err(MwuError::InvalidConfig(format!(
				"unknown glue measure '{other}', expected 'dice' or 'scp'"
			))),
		}
	}
}

impl fmt::Display for GlueMeasure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Dice => f.write_str("dice"),
			Self::Scp => f.write_str("scp"),
		}
	}
}

impl FromStr for SelectionPolicy {
	type Err = MwuError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"relaxed" => Ok(Self::Relaxed),
			"strict" => Ok(Self::Strict),
			other => Err(MwuError::InvalidConfig(format!(
				"unknown selection policy '{other}', expected 'strict' or 'relaxed'"
			))),
		}
	}
}

impl fmt::Display for SelectionPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Relaxed => f.write_str("relaxed"),
			Self::Strict => f.write_str("strict"),
		}
	}
}

/// Parameters of one extraction run.
///
/// Passed by value into every component instead of living in global state.
///
/// # Invariants
/// - `max_n` is always >= 2 (enforced by [`ExtractionConfig::new`])
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractionConfig {
	/// Glue measure used for every n-gram of length >= 2.
	pub measure: GlueMeasure,

	/// Local maxima selection rule.
	pub policy: SelectionPolicy,

	/// Maximum length (in tokens) of extracted units.
	max_n: usize,
}

impl ExtractionConfig {
	/// Creates a validated configuration.
	///
	/// # Errors
	/// Returns [`MwuError::InvalidConfig`] if `max_n < 2`.
	pub fn new(measure: GlueMeasure, policy: SelectionPolicy, max_n: usize) -> Result<Self> {
		if max_n < 2 {
			return Err(MwuError::InvalidConfig(format!("maximum n-gram length must be >= 2, got {max_n}")));
		}
		Ok(Self { measure, policy, max_n })
	}

	/// Maximum length of extracted units.
	pub fn max_n(&self) -> usize {
		self.max_n
	}

	/// Longest n-gram length whose frequency is needed.
	///
	/// One more than `max_n`: selection compares length `max_n` units
	/// against their super-grams.
	pub fn depth(&self) -> usize {
		self.max_n + 1
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_names_case_insensitively() {
		assert_eq!("DICE".parse::<GlueMeasure>().unwrap(), GlueMeasure::Dice);
		assert_eq!("scp".parse::<GlueMeasure>().unwrap(), GlueMeasure::Scp);
		assert_eq!("Strict".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::Strict);
		assert_eq!(GlueMeasure::Scp.to_string(), "scp");
		assert_eq!(SelectionPolicy::Relaxed.to_string(), "relaxed");
	}

	#[test]
	fn rejects_unknown_names() {
		assert!(matches!("pmi".parse::<GlueMeasure>(), Err(MwuError::InvalidConfig(_))));
		assert!(matches!("loose".parse::<SelectionPolicy>(), Err(MwuError::InvalidConfig(_))));
	}

	#[test]
	fn rejects_short_max_n() {
		assert!(ExtractionConfig::new(GlueMeasure::Dice, SelectionPolicy::Relaxed, 1).is_err());
		let config = ExtractionConfig::new(GlueMeasure::Dice, SelectionPolicy::Relaxed, 3).unwrap();
		assert_eq!(config.max_n(), 3);
		assert_eq!(config.depth(), 4);
	}
}
