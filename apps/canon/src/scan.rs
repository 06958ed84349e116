//! Candidate file discovery for a rule group.
//!
//! Base paths may be plain files, directories (walked recursively) or glob
//! patterns. Exclusions are path substrings, never globs.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Always-excluded path fragments: dependencies, build output, VCS metadata
/// and generated caches.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    "vendor/",
    "target/",
    ".git/",
    ".svn/",
    ".hg/",
    "__pycache__",
    ".cache/",
    "storage/framework",
    "bootstrap/cache",
    ".canon/",
];

/// Whether `path` substring-matches any default or group exclusion.
pub fn is_excluded(path: &Path, excludes: &[String]) -> bool {
    matches_exclusion(&path.to_string_lossy().replace('\\', "/"), excludes)
}

/// Directory form of [`is_excluded`]: the path is matched with a trailing
/// `/` so slash-terminated fragments such as `vendor/` prune the directory.
pub fn is_excluded_dir(path: &Path, excludes: &[String]) -> bool {
    let mut p = path.to_string_lossy().replace('\\', "/");
    if !p.ends_with('/') {
        p.push('/');
    }
    matches_exclusion(&p, excludes)
}

fn matches_exclusion(p: &str, excludes: &[String]) -> bool {
    DEFAULT_EXCLUDES.iter().any(|ex| p.contains(ex))
        || excludes.iter().any(|ex| !ex.is_empty() && p.contains(ex.as_str()))
}

/// Whether `path` carries one of `extensions` (empty means any).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    extensions
        .iter()
        .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn expand_base(root: &Path, base: &str) -> Vec<PathBuf> {
    let joined = root.join(base);
    if !is_glob(base) {
        return vec![joined];
    }
    let pattern = joined.to_string_lossy().to_string();
    match glob::glob(&pattern) {
        Ok(paths) => paths.flatten().collect(),
        Err(e) => {
            log::warn!("ignoring invalid glob '{}': {}", base, e);
            Vec::new()
        }
    }
}

/// Exclusions are matched against the path below the root, never the root itself.
fn relative<'p>(root: &Path, path: &'p Path) -> &'p Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// Lazily enumerate candidate files under `bases` (relative to `root`).
pub fn scan<'a>(
    root: &'a Path,
    bases: &'a [String],
    extensions: &'a [String],
    excludes: &'a [String],
) -> impl Iterator<Item = PathBuf> + 'a {
    bases
        .iter()
        .flat_map(move |b| expand_base(root, b))
        .flat_map(move |base| {
            WalkDir::new(base)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |e| {
                    let rel = relative(root, e.path());
                    e.depth() == 0
                        || if e.file_type().is_dir() {
                            !is_excluded_dir(rel, excludes)
                        } else {
                            !is_excluded(rel, excludes)
                        }
                })
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        log::debug!("skipping unreadable entry: {}", err);
                        None
                    }
                })
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(move |p| has_extension(p, extensions) && !is_excluded(relative(root, p), excludes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, "x").unwrap();
    }

    #[test]
    fn test_scan_filters_extensions_and_excludes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/a.rs"));
        touch(&root.join("src/b.txt"));
        touch(&root.join("src/generated/c.rs"));
        touch(&root.join("src/node_modules/d.rs"));
        touch(&root.join("other/e.rs"));

        let bases = vec!["src".to_string()];
        let exts = vec!["rs".to_string()];
        let excludes = vec!["generated".to_string()];
        let found: Vec<_> = scan(root, &bases, &exts, &excludes).collect();
        assert_eq!(found, vec![root.join("src/a.rs")]);
    }

    #[test]
    fn test_scan_globs_and_single_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("pkg1/x.vue"));
        touch(&root.join("pkg2/y.vue"));
        touch(&root.join("single.vue"));
        let bases = vec!["pkg*".to_string(), "single.vue".to_string()];
        let found: Vec<_> = scan(root, &bases, &[], &[]).collect();
        assert_eq!(found.len(), 3);
        assert!(found.contains(&root.join("single.vue")));
    }

    #[test]
    fn test_is_excluded_default_set() {
        assert!(is_excluded(Path::new("app/vendor/lib.php"), &[]));
        assert!(is_excluded(Path::new("repo/.git/HEAD"), &[]));
        assert!(!is_excluded(Path::new("src/vendors.rs"), &[]));
    }

    #[test]
    fn test_slash_terminated_excludes_prune_directories() {
        assert!(is_excluded_dir(Path::new("app/vendor"), &[]));
        assert!(is_excluded_dir(Path::new("target"), &[]));
        assert!(is_excluded_dir(Path::new(".git"), &[]));
        assert!(!is_excluded_dir(Path::new("src/vendors"), &[]));
        assert!(!is_excluded(Path::new("app/vendor"), &[]));

        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("vendor/pkg/a.php"));
        touch(&root.join("target/debug/b.php"));
        touch(&root.join("app/c.php"));
        let found: Vec<_> = scan(root, &[".".to_string()], &[], &[]).collect();
        assert_eq!(found, vec![root.join("./app/c.php")]);
    }
}
