//! Manifest construction from a directory tree
//!
//! Walks the artifact directory, hashes every regular file, applies the
//! exclusion rules, and emits the records in canonical sorted order. The
//! build is fail-fast: one unreadable file aborts the whole build, because a
//! partial manifest that later verifies as "success" is a security hazard.

use crate::error::ManifestError;
use crate::hasher;
use crate::manifest::{FileRecord, Manifest, SubjectMetadata, SIGNATURE_SUFFIX};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Housekeeping directories never recorded in a manifest.
///
/// Extend this list as needed, but document additions: an excluded path is
/// invisible to verification.
pub const EXCLUDED_DIRS: &[&str] = &[".git", "__pycache__", ".cache", "keys"];

/// Housekeeping files never recorded in a manifest.
pub const EXCLUDED_FILES: &[&str] = &[".DS_Store"];

/// Builds a [`Manifest`] from a directory's file contents.
#[derive(Debug)]
pub struct ManifestBuilder {
    root: PathBuf,
    created_by: String,
    model: Option<SubjectMetadata>,
    output_path: Option<PathBuf>,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<PathBuf>, created_by: impl Into<String>) -> Self {
        ManifestBuilder {
            root: root.into(),
            created_by: created_by.into(),
            model: None,
            output_path: None,
        }
    }

    /// Attach descriptive metadata about the covered artifact.
    pub fn model(mut self, model: SubjectMetadata) -> Self {
        self.model = Some(model);
        self
    }

    /// Declare where the manifest will be written, so the output file is
    /// excluded from its own file list.
    ///
    /// The comparison is by absolute path, not name, so a renamed output
    /// file is still excluded.
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Walk the root, hash every tracked file, and produce the manifest.
    pub fn build(&self) -> Result<Manifest, ManifestError> {
        if !self.root.is_dir() {
            return Err(ManifestError::DirectoryNotFound {
                path: self.root.clone(),
            });
        }

        let canonical_root =
            std::fs::canonicalize(&self.root).map_err(|_| ManifestError::DirectoryNotFound {
                path: self.root.clone(),
            })?;

        let excluded_output = self.output_path.as_deref().map(absolute_path);

        debug!("Scanning directory: {}", self.root.display());

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                // The root itself is never excluded, whatever it is named.
                entry.depth() == 0
                    || !(entry.file_type().is_dir() && is_excluded_dir_name(entry.file_name()))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone());
                ManifestError::FileUnreadable {
                    path,
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
                }
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if is_excluded_file_name(entry.file_name()) {
                continue;
            }

            // Resolve now so symlinks are either followed to a target inside
            // the root or rejected, never hashed blind.
            let resolved =
                std::fs::canonicalize(path).map_err(|e| ManifestError::FileUnreadable {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            if entry.path_is_symlink() {
                if !resolved.starts_with(&canonical_root) {
                    return Err(ManifestError::SymlinkEscape {
                        path: path.to_path_buf(),
                    });
                }
                if !resolved.is_file() {
                    continue;
                }
            }

            if excluded_output.as_deref() == Some(resolved.as_path()) {
                debug!("Skipping manifest output file: {}", path.display());
                continue;
            }

            let relative = relative_posix_path(path, &self.root)?;
            if relative.ends_with(SIGNATURE_SUFFIX) {
                debug!("Skipping signature side-file: {relative}");
                continue;
            }

            debug!("  ...hashing {relative}");
            let sha256 =
                hasher::digest_file(&resolved).map_err(|e| ManifestError::FileUnreadable {
                    path: path.to_path_buf(),
                    source: e,
                })?;

            files.push(FileRecord {
                path: relative,
                sha256,
            });
        }

        // Canonical order: lexicographic byte-wise on the relative path,
        // independent of traversal order.
        files.sort_unstable_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Manifest built over {}: {} file(s)",
            self.root.display(),
            files.len()
        );

        Ok(Manifest::new(
            self.created_by.clone(),
            self.model.clone(),
            files,
        ))
    }
}

fn is_excluded_dir_name(name: &std::ffi::OsStr) -> bool {
    EXCLUDED_DIRS.iter().any(|d| name == *d)
}

fn is_excluded_file_name(name: &std::ffi::OsStr) -> bool {
    EXCLUDED_FILES.iter().any(|f| name == *f)
}

/// Relative path from `root` to `path`, POSIX-normalized (forward slashes).
fn relative_posix_path(path: &Path, root: &Path) -> Result<String, ManifestError> {
    let relative = path.strip_prefix(root).unwrap_or(path);

    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| ManifestError::UnencodablePath {
                path: path.to_path_buf(),
            })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Absolute form of a path that may not exist yet.
fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn build_produces_sorted_records() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "z.bin", "zz");
        write(temp.path(), "a.txt", "hello");
        write(temp.path(), "b/c.txt", "world");

        let manifest = ManifestBuilder::new(temp.path(), "alice").build().unwrap();

        let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b/c.txt", "z.bin"]);
    }

    #[test]
    fn build_is_deterministic() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "hello");
        write(temp.path(), "b/c.txt", "world");
        write(temp.path(), "b/d.txt", "again");

        let first = ManifestBuilder::new(temp.path(), "alice").build().unwrap();
        let second = ManifestBuilder::new(temp.path(), "alice").build().unwrap();

        assert_eq!(first.files, second.files);
    }

    #[test]
    fn housekeeping_entries_are_excluded() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "model.bin", "weights");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main");
        write(temp.path(), "__pycache__/mod.pyc", "bytecode");
        write(temp.path(), ".cache/entry", "cached");
        write(temp.path(), "keys/private_key.pem", "secret");
        write(temp.path(), ".DS_Store", "finder");
        write(temp.path(), "manifest.json.sig", "raw signature bytes");

        let manifest = ManifestBuilder::new(temp.path(), "alice").build().unwrap();

        let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["model.bin"]);
    }

    #[test]
    fn own_output_file_is_excluded_by_path_not_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "model.bin", "weights");
        // A renamed manifest inside the tree; excluded because its absolute
        // path is the declared output, not because of its name.
        write(temp.path(), "renamed-manifest.json", "{}");
        // Same name elsewhere in the tree stays tracked.
        write(temp.path(), "nested/renamed-manifest.json", "{}");

        let manifest = ManifestBuilder::new(temp.path(), "alice")
            .output_path(temp.path().join("renamed-manifest.json"))
            .build()
            .unwrap();

        let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["model.bin", "nested/renamed-manifest.json"]);
    }

    #[test]
    fn missing_root_is_directory_not_found() {
        let temp = TempDir::new().unwrap();
        let result = ManifestBuilder::new(temp.path().join("absent"), "alice").build();
        assert!(matches!(
            result,
            Err(ManifestError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn digests_match_content() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "hello");

        let manifest = ManifestBuilder::new(temp.path(), "alice").build().unwrap();
        assert_eq!(
            manifest.files[0].sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_root_aborts_build() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "secret.txt", "outside");

        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "hello");
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            temp.path().join("link.txt"),
        )
        .unwrap();

        let result = ManifestBuilder::new(temp.path(), "alice").build();
        assert!(matches!(result, Err(ManifestError::SymlinkEscape { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_inside_root_is_resolved_and_hashed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "hello");
        std::os::unix::fs::symlink(temp.path().join("a.txt"), temp.path().join("alias.txt"))
            .unwrap();

        let manifest = ManifestBuilder::new(temp.path(), "alice").build().unwrap();

        let alias = manifest
            .files
            .iter()
            .find(|f| f.path == "alias.txt")
            .unwrap();
        let original = manifest.files.iter().find(|f| f.path == "a.txt").unwrap();
        assert_eq!(alias.sha256, original.sha256);
    }
}
