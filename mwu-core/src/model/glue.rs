use crate::config::GlueMeasure;
use crate::error::{MwuError, Result};

impl GlueMeasure {
	/// Computes the glue of an n-gram (n >= 2).
	///
	/// # Parameters
	/// - `ngram`: joined key, only used to label errors
	/// - `freq`: frequency of the n-gram itself
	/// - `left_freqs`, `right_freqs`: one entry per split position
	///   `i = 1..n`, the frequency of the length-`i` prefix and of the
	///   length-`n-i` suffix respectively
	///
	/// - Dice: `2F / (avg(left) + avg(right))`
	/// - SCP: `F² (n-1) / Σ left·right`, the average of products folded
	///   into the numerator
	///
	/// # Errors
	/// - [`MwuError::Internal`] if the two lists differ in length or are empty
	/// - [`MwuError::DegenerateFrequency`] if the denominator is zero
	pub fn glue(&self, ngram: &str, freq: u64, left_freqs: &[u64], right_freqs: &[u64]) -> Result<f64> {
		if left_freqs.is_empty() || left_freqs.len() != right_freqs.len() {
			return Err(MwuError::Internal(format!(
				"glue of {ngram:?} needs two equal, non-empty split lists (got {} and {})",
				left_freqs.len(),
				right_freqs.len()
			)));
		}

		let splits = left_freqs.len() as f64;
		let freq = freq as f64;
		let denominator = match self {
			GlueMeasure::Dice => {
				let left: u64 = left_freqs.iter().sum();
				let right: u64 = right_freqs.iter().sum();
				(left as f64 + right as f64) / splits
			}
			GlueMeasure::Scp => left_freqs
				.iter()
				.zip(right_freqs)
				.map(|(&left, &right)| left as f64 * right as f64)
				.sum(),
		};

		if denominator == 0.0 {
			return Err(MwuError::DegenerateFrequency { ngram: ngram.to_owned() });
		}

		Ok(match self {
			GlueMeasure::Dice => 2.0 * freq / denominator,
			GlueMeasure::Scp => freq * freq * splits / denominator,
		})
	}
}
