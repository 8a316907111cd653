use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{MwuError, Result};

/// Opens a text file for line-by-line reading.
pub(crate) fn open_lines<P: AsRef<Path>>(filename: P) -> Result<BufReader<File>> {
	let path = filename.as_ref();
	let file = File::open(path).map_err(|e| MwuError::io(e, path))?;
	Ok(BufReader::new(file))
}

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let path = filename.as_ref();
	let mut lines = Vec::new();
	for line in open_lines(path)?.lines() {
		lines.push(line.map_err(|e| MwuError::io(e, path))?);
	}
	Ok(lines)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/input.txt` + `"bin"` → `data/input.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path.file_stem().ok_or_else(|| {
		MwuError::io(io::Error::new(io::ErrorKind::InvalidInput, "input path has no filename"), input_path)
	})?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Creates a directory (and its parents) if it does not exist yet.
pub(crate) fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
	let dir = dir.as_ref();
	if !dir.is_dir() {
		fs::create_dir_all(dir).map_err(|e| MwuError::io(e, dir))?;
	}
	Ok(())
}

/// Removes a file, ignoring a file that is already gone.
pub(crate) fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
	let path = path.as_ref();
	match fs::remove_file(path) {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
		Err(e) => Err(MwuError::io(e, path)),
	}
}

/// Buffered writer whose content only becomes visible at `target` once
/// [`AtomicWriter::commit`] succeeds.
///
/// Data goes to a temporary file created in the target's directory, which
/// is renamed over the target on commit. Dropping the writer without
/// committing discards the temporary file, so a crash mid-stage never
/// leaves a half-written file under the final name.
pub struct AtomicWriter {
	target: PathBuf,
	inner: BufWriter<NamedTempFile>,
}

impl AtomicWriter {
	/// Starts writing a replacement for `target`.
	pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
		let target = target.as_ref().to_path_buf();
		let dir = match target.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => PathBuf::from("."),
		};
		let temp = NamedTempFile::with_prefix_in("tmp_", &dir).map_err(|e| MwuError::io(e, &dir))?;
		Ok(Self { target, inner: BufWriter::new(temp) })
	}

	/// Path the content is published under.
	pub fn target(&self) -> &Path {
		&self.target
	}

	/// Flushes and renames the temporary file into place.
	pub fn commit(self) -> Result<()> {
		let target = self.target;
		let temp = self.inner.into_inner().map_err(|e| MwuError::io(e.into_error(), &target))?;
		temp.as_file().sync_all().map_err(|e| MwuError::io(e, &target))?;
		temp.persist(&target).map_err(|e| MwuError::io(e.error, &target))?;
		Ok(())
	}
}

impl Write for AtomicWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.inner.write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.inner.flush()
	}
}

/// Writes a whole file atomically through `write`.
pub(crate) fn write_atomically<F>(target: &Path, write: F) -> Result<()>
where
	F: FnOnce(&mut dyn Write) -> Result<()>,
{
	let mut writer = AtomicWriter::create(target)?;
	write(&mut writer)?;
	writer.commit()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("data/input.txt", "bin").unwrap();
		assert_eq!(path, PathBuf::from("data/input.bin"));
	}

	#[test]
	fn uncommitted_writer_leaves_no_file() {
		let dir = tempdir().unwrap();
		let target = dir.path().join("out.tsv");
		{
			let mut writer = AtomicWriter::create(&target).unwrap();
			writer.write_all(b"half").unwrap();
		}
		assert!(!target.exists());
		assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
	}

	#[test]
	fn commit_replaces_previous_content() {
		let dir = tempdir().unwrap();
		let target = dir.path().join("out.tsv");
		fs::write(&target, "old\n").unwrap();
		write_atomically(&target, |out| Ok(out.write_all(b"new\n")?)).unwrap();
		assert_eq!(read_file(&target).unwrap(), vec!["new".to_owned()]);
	}
}
