//! Removal of build output before recompiling.

use crate::config::CleanTarget;
use crate::error::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Remove what a target covers, relative to `root`.
///
/// - No extension: every entry inside `dir` is removed, `dir` itself stays.
/// - With an extension: every file with that extension below `dir` is removed.
///
/// A missing `dir` is not an error. Returns the number of entries removed.
pub fn clean_target(root: &Path, target: &CleanTarget) -> Result<usize> {
    let dir = root.join(&target.dir);
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "clean target missing, skipping");
        return Ok(0);
    }

    let removed = match &target.extension {
        None => {
            let mut count = 0;
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() && !path.is_symlink() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
                count += 1;
            }
            count
        }
        Some(ext) => {
            let ext = ext.trim_start_matches('.');
            let matches: Vec<_> = WalkDir::new(&dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(ext))
                .map(|e| e.into_path())
                .collect();
            for path in &matches {
                fs::remove_file(path)?;
            }
            matches.len()
        }
    };

    tracing::debug!(dir = %dir.display(), removed, "cleaned");
    Ok(removed)
}

/// Clean every target in order, returning the total number of entries removed
pub fn clean_all(root: &Path, targets: &[CleanTarget]) -> Result<usize> {
    let mut total = 0;
    for target in targets {
        total += clean_target(root, target)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_clean_directory_contents() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "dist/index.js");
        touch(dir.path(), "dist/types/index.d.ts");

        let removed = clean_target(
            dir.path(),
            &CleanTarget {
                dir: PathBuf::from("dist"),
                extension: None,
            },
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join("dist").is_dir());
        assert_eq!(fs::read_dir(dir.path().join("dist")).unwrap().count(), 0);
    }

    #[test]
    fn test_clean_by_extension_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "build-output/lib/a.js");
        touch(dir.path(), "build-output/test/unit/a.spec.js");
        touch(dir.path(), "build-output/lib/a.js.map");

        let removed = clean_target(
            dir.path(),
            &CleanTarget {
                dir: PathBuf::from("build-output"),
                extension: Some(".js".to_string()),
            },
        )
        .unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.path().join("build-output/lib/a.js").exists());
        assert!(dir.path().join("build-output/lib/a.js.map").exists());
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let dir = TempDir::new().unwrap();
        let removed = clean_all(
            dir.path(),
            &[CleanTarget {
                dir: PathBuf::from("nope"),
                extension: None,
            }],
        )
        .unwrap();
        assert_eq!(removed, 0);
    }
}
