//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a single file into `dst_dir`, keeping its file name.
pub fn copy_into(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("not a file path: {}", src.display()))?;
    ensure_dir(dst_dir)?;
    let dst = dst_dir.join(name);
    fs::copy(src, &dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;
    Ok(dst)
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Find files anywhere under `root` whose name satisfies `pred`.
///
/// `skip_dirs` are directory names not descended into.
pub fn find_files<F>(root: &Path, skip_dirs: &[&str], pred: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.depth() > 0
                && skip_dirs.iter().any(|d| e.file_name() == *d))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(&pred).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_and_write() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("a/b/c.txt");
        write_string(&file, "hi").unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "hi");

        remove_dir_all_if_exists(&tmp.path().join("a")).unwrap();
        assert!(!file.exists());
        remove_dir_all_if_exists(&tmp.path().join("a")).unwrap();
    }

    #[test]
    fn test_copy_into() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("COPYING");
        fs::write(&src, "GPL").unwrap();

        let dst = copy_into(&src, &tmp.path().join("licenses")).unwrap();
        assert_eq!(dst, tmp.path().join("licenses/COPYING"));
        assert_eq!(fs::read_to_string(dst).unwrap(), "GPL");
    }

    #[test]
    fn test_glob_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("lib/libx264.a"), "").unwrap();
        fs::write(tmp.path().join("lib/libx264.so.152"), "").unwrap();
        fs::write(tmp.path().join("lib/notes.txt"), "").unwrap();

        let libs = glob_files(tmp.path(), &["lib/*.a", "lib/*.so*", "lib/*.a"]).unwrap();
        assert_eq!(libs.len(), 2);
    }

    #[test]
    fn test_find_files_skips_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("common")).unwrap();
        fs::create_dir_all(tmp.path().join("tools")).unwrap();
        fs::write(tmp.path().join("x264.h"), "").unwrap();
        fs::write(tmp.path().join("common/x264.h"), "").unwrap();
        fs::write(tmp.path().join("tools/x264.h"), "").unwrap();

        let found = find_files(tmp.path(), &["tools"], |n| n == "x264.h");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| !p.starts_with(tmp.path().join("tools"))));
    }
}
