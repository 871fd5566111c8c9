use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Checks if a regular file exists at the given path
pub fn file_exists(path: &str) -> bool {
    !path.is_empty() && Path::new(path).is_file()
}

/// Reads a whole file as UTF-8 text
pub fn read_file(path: impl AsRef<Path>) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Resolves `path` against a list of search directories.
///
/// The path itself is tried first (absolute or relative to the working
/// directory), then each directory joined with it, in order.
pub fn resolve_path(path: &str, search_dirs: &[&Path]) -> Option<PathBuf> {
    if path.is_empty() {
        return None;
    }
    let direct = PathBuf::from(path);
    if direct.is_file() {
        return Some(direct);
    }
    if direct.is_absolute() {
        return None;
    }
    search_dirs
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_search_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base");
        let rules = base.join("rules");
        fs::create_dir_all(&rules).unwrap();
        fs::write(rules.join("ads.list"), "DOMAIN,ads.com").unwrap();

        let found = resolve_path("ads.list", &[base.as_path(), rules.as_path()]).unwrap();
        assert_eq!(found, rules.join("ads.list"));

        fs::write(base.join("ads.list"), "DOMAIN,other.com").unwrap();
        let found = resolve_path("ads.list", &[base.as_path(), rules.as_path()]).unwrap();
        assert_eq!(found, base.join("ads.list"));

        assert!(resolve_path("missing.list", &[base.as_path()]).is_none());
    }
}
