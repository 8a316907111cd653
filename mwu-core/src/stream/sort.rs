use std::io;
use std::path::Path;
use std::process::Command;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::{MwuError, Result};
use crate::io::{read_file, write_atomically};

/// Sorts a tab-separated file on its first field, in byte order.
///
/// Lines with equal first fields keep their relative order. The output is
/// published atomically; `input` and `output` must differ.
pub trait Sorter {
	fn sort_file(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Delegates to the system `sort` utility in the C locale.
///
/// Handles files far larger than memory through its own external merge.
#[derive(Clone, Debug)]
pub struct ExternalSort {
	program: String,
}

impl Default for ExternalSort {
	fn default() -> Self {
		Self { program: "sort".to_owned() }
	}
}

impl ExternalSort {
	/// Uses another `sort` compatible executable (e.g. `gsort`).
	pub fn with_program(program: impl Into<String>) -> Self {
		Self { program: program.into() }
	}
}

impl Sorter for ExternalSort {
	fn sort_file(&self, input: &Path, output: &Path) -> Result<()> {
		let dir = match output.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		let temp = NamedTempFile::with_prefix_in("tmp_", dir).map_err(|e| MwuError::io(e, dir))?;

		debug!("{} {} -> {}", self.program, input.display(), output.display());
		let result = Command::new(&self.program)
			.env("LC_ALL", "C")
			.args(["-s", "-t", "\t", "-k1,1", "-o"])
			.arg(temp.path())
			.arg(input)
			.output()
			.map_err(|e| MwuError::io(e, input))?;

		if !result.status.success() {
			let stderr = String::from_utf8_lossy(&result.stderr);
			return Err(MwuError::io(
				io::Error::other(format!("{} exited with {}: {}", self.program, result.status, stderr.trim())),
				input,
			));
		}

		temp.persist(output).map_err(|e| MwuError::io(e.error, output))?;
		Ok(())
	}
}

/// Sorts inside the process. The whole file is loaded in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemorySort;

fn first_field(line: &str) -> &str {
	line.split('\t').next().unwrap_or(line)
}

impl Sorter for InMemorySort {
	fn sort_file(&self, input: &Path, output: &Path) -> Result<()> {
		let mut lines = read_file(input)?;
		lines.sort_by(|a, b| first_field(a).cmp(first_field(b)));

		write_atomically(output, |out| {
			for line in &lines {
				writeln!(out, "{line}")?;
			}
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::tempdir;

	const UNSORTED: &str = "b a\t1\na b\t2\na\t3\nB\t4\na b\t5\n";
	const SORTED: &str = "B\t4\na\t3\na b\t2\na b\t5\nb a\t1\n";

	#[test]
	fn in_memory_sort_is_stable_byte_order() {
		let dir = tempdir().unwrap();
		let input = dir.path().join("in.tsv");
		let output = dir.path().join("out.tsv");
		fs::write(&input, UNSORTED).unwrap();

		InMemorySort.sort_file(&input, &output).unwrap();
		assert_eq!(fs::read_to_string(&output).unwrap(), SORTED);
	}

	#[cfg(unix)]
	#[test]
	fn external_sort_matches_in_memory_sort() {
		let dir = tempdir().unwrap();
		let input = dir.path().join("in.tsv");
		let output = dir.path().join("out.tsv");
		fs::write(&input, UNSORTED).unwrap();

		ExternalSort::default().sort_file(&input, &output).unwrap();
		assert_eq!(fs::read_to_string(&output).unwrap(), SORTED);
	}

	#[test]
	fn missing_program_is_an_io_error() {
		let dir = tempdir().unwrap();
		let input = dir.path().join("in.tsv");
		fs::write(&input, UNSORTED).unwrap();

		let sorter = ExternalSort::with_program("definitely-not-a-sort-binary");
		let err = sorter.sort_file(&input, &dir.path().join("out.tsv")).unwrap_err();
		assert!(matches!(err, MwuError::Io { .. }), "{err}");
	}
}
