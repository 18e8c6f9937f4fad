//! Destination paths in the output tree and collision checks.
//!
//! Nothing in this module writes to the file system.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::error::{OrganizeError, Result};
use crate::organize::types::{Classification, DestinationDescriptor, GroupContext};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Where a source file goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Destination is free.
    New(PathBuf),
    /// Destination already holds identical content, nothing to do.
    AlreadyInPlace(PathBuf),
}

impl Placement {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::New(path) | Self::AlreadyInPlace(path) => path,
        }
    }
}

/// Compose the destination path without touching the file system.
#[must_use]
pub fn destination_path(classification: &Classification, context: &GroupContext, target_root: &Path) -> PathBuf {
    DestinationDescriptor::new(classification, context).path_under(target_root)
}

/// Compose and validate the destination path of a classified file.
///
/// ```rust
/// use std::path::Path;
/// use viewsort::organize::{DelimiterPair, KeywordSet, build_destination, classify};
///
/// let keywords = KeywordSet::new("SDE", "VNT", true).unwrap();
/// let classification = classify("M1_run1-SDE.csv", &keywords, &DelimiterPair::new("_", "-")).unwrap();
/// let root = Path::new("does/not/exist/yet");
/// let destination = build_destination(&classification, "G1", "T1", root).unwrap();
/// assert_eq!(destination, root.join("G1").join("T1").join("Side view").join("run1.csv"));
/// ```
///
/// # Errors
/// - configuration error if group or timepoint is not a plain directory name
/// - already exists error if something is already at the destination
/// - I/O failure if the parent directories could not be created
pub fn build_destination(
    classification: &Classification,
    group: &str,
    timepoint: &str,
    target_root: &Path,
) -> Result<PathBuf> {
    let context = GroupContext::new(group, timepoint)?;
    let destination = destination_path(classification, &context, target_root);
    check_parents_creatable(&destination)?;
    match fs::symlink_metadata(&destination) {
        Ok(_) => Err(OrganizeError::AlreadyExists(destination)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(destination),
        Err(error) => Err(OrganizeError::io(destination, error)),
    }
}

/// Compute the placement of `source`.
/// An existing destination with identical content counts as already organized.
///
/// # Errors
/// - already exists error if a different file or a directory is at the destination
/// - I/O failure if the destination cannot be checked or its parents cannot be created
pub fn place(
    source: &Path,
    classification: &Classification,
    context: &GroupContext,
    target_root: &Path,
) -> Result<Placement> {
    let destination = destination_path(classification, context, target_root);
    check_parents_creatable(&destination)?;
    match fs::symlink_metadata(&destination) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Placement::New(destination)),
        Err(error) => Err(OrganizeError::io(destination, error)),
        Ok(metadata) if metadata.is_file() => {
            let identical = files_identical(source, &destination).map_err(|e| OrganizeError::io(source, e))?;
            if identical {
                Ok(Placement::AlreadyInPlace(destination))
            } else {
                Err(OrganizeError::AlreadyExists(destination))
            }
        }
        Ok(_) => Err(OrganizeError::AlreadyExists(destination)),
    }
}

/// Check that the nearest existing ancestor of the destination is a directory,
/// so the missing folders can be created.
fn check_parents_creatable(destination: &Path) -> Result<()> {
    let Some(parent) = destination.parent() else {
        return Ok(());
    };
    for ancestor in parent.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        match fs::metadata(ancestor) {
            Ok(metadata) if metadata.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(OrganizeError::io(
                    ancestor,
                    io::Error::new(
                        io::ErrorKind::NotADirectory,
                        "a file is in place of a destination folder",
                    ),
                ));
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(OrganizeError::io(ancestor, error)),
        }
    }
    Ok(())
}

/// Compare two files by size and SHA-1 digest.
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    if let (Ok(a), Ok(b)) = (dunce::canonicalize(a), dunce::canonicalize(b))
        && a == b
    {
        return Ok(true);
    }
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(file_digest(a)? == file_digest(b)?)
}

fn file_digest(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0_u8; READ_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_vec())
}
