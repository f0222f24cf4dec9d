use std::path::{Path, PathBuf};

fn strip_root(path: &Path) -> &Path {
    match path.strip_prefix("/") {
        Ok(relative) => relative,
        Err(_) => path,
    }
}

/// Returns the path obtained by joining the given base path with the given relative path.
///
/// Absolute paths are re-rooted under `base`, so `join_relative("/tmp/x", "/etc/hosts")` is
/// `/tmp/x/etc/hosts`.
pub fn join_relative(base: impl AsRef<Path>, relative: impl AsRef<Path>) -> PathBuf {
    base.as_ref().join(strip_root(relative.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("/etc", "passwd"), Path::new("/etc/passwd"));
        assert_eq!(join_relative("/etc", "/passwd"), Path::new("/etc/passwd"));
        assert_eq!(
            join_relative("/etc", "/etc/passwd"),
            Path::new("/etc/etc/passwd")
        );
        assert_eq!(join_relative("/", "/etc/hosts"), Path::new("/etc/hosts"));
    }
}
