//! Screenshot filename selection. The quilt readback and PNG encode live in
//! the render module; this is the filesystem half.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Pick the next free numbered filename `<stem>_<nnn>.<extension>` in `dir`,
/// with the smallest non-negative suffix whose file does not exist yet.
///
/// # Errors
/// Fails if `dir` is not an existing directory.
pub fn next_numbered_filename(dir: &Path, stem: &str, extension: &str) -> Result<PathBuf, Error> {
    if !dir.is_dir() {
        return Err(Error::BadScreenshotDir(dir.to_path_buf()));
    }
    let mut num: u32 = 0;
    loop {
        let candidate = dir.join(format!("{stem}_{num:03}.{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        num += 1;
    }
}
