use globset::{Glob, GlobMatcher};

/// Include-only path filter applied to repository search hits.
///
/// Entries without glob metacharacters are directory/file prefixes; entries with `*`, `?` or
/// `[` are glob patterns. Blank entries and `.` do not activate the filter.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    prefixes: Vec<String>,
    patterns: Vec<GlobMatcher>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(include_paths: &[S]) -> Self {
        let mut filter = Self::default();
        for raw in include_paths {
            let normalized = normalize_filter_path(raw.as_ref());
            if normalized.is_empty() {
                continue;
            }
            if is_glob(&normalized) {
                // Invalid globs are dropped rather than matching everything.
                if let Ok(glob) = Glob::new(&normalized) {
                    filter.patterns.push(glob.compile_matcher());
                }
            } else {
                filter.prefixes.push(normalized);
            }
        }
        filter
    }

    pub fn is_active(&self) -> bool {
        !self.prefixes.is_empty() || !self.patterns.is_empty()
    }

    pub fn allows(&self, path: &str) -> bool {
        if !self.is_active() {
            return true;
        }
        let path = normalize_filter_path(path);
        self.prefixes
            .iter()
            .any(|prefix| path_prefix_matches_normalized(prefix, &path))
            || self.patterns.iter().any(|pattern| pattern.is_match(&path))
    }
}

fn is_glob(value: &str) -> bool {
    value.contains('*') || value.contains('?') || value.contains('[')
}

fn normalize_filter_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(stripped) = value.strip_prefix("./") {
        value = stripped.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

fn path_prefix_matches_normalized(prefix: &str, path: &str) -> bool {
    if path == prefix {
        return true;
    }

    if !path.starts_with(prefix) {
        return false;
    }

    path.as_bytes().get(prefix.len()) == Some(&b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_match_on_segment_boundaries() {
        let filter = PathFilter::new(&["src"]);
        assert!(filter.allows("src/lib.rs"));
        assert!(filter.allows("./src/orders/repo.py"));
        assert!(!filter.allows("src2/lib.rs"));
        assert!(!filter.allows("docs/README.md"));
    }

    #[test]
    fn glob_entries_match_whole_paths() {
        let filter = PathFilter::new(&["services/*/db.py"]);
        assert!(filter.allows("services/billing/db.py"));
        assert!(!filter.allows("services/billing/api.py"));
    }

    #[test]
    fn blank_entries_do_not_activate_the_filter() {
        let filter = PathFilter::new(&["", ".", "./", "////"]);
        assert!(!filter.is_active());
        assert!(filter.allows("anything/at/all.rs"));
    }
}
