//! Hierarchical key helpers
//!
//! Keys are `/`-separated. A prefix `a/b` covers `a/b` itself and every key
//! below `a/b/`, never `a/bc`.

/// Join key segments with `/`, skipping empty segments
///
/// ```rust
/// use orc_store::path::join;
///
/// assert_eq!(join(["_orc", "deployments", "", "d1/"]), "_orc/deployments/d1");
/// ```
pub fn join<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut key = String::new();
    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    key
}

/// Check whether `key` lies under `prefix`
#[must_use]
pub fn is_under(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// First segment of `key` below `prefix`, if any
#[must_use]
pub fn child_segment<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = if prefix.is_empty() {
        key
    } else {
        key.strip_prefix(prefix)?.strip_prefix('/')?
    };
    rest.split('/').next().filter(|s| !s.is_empty())
}

/// Last segment of a key
#[inline]
#[must_use]
pub fn base(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_trims_and_skips() {
        assert_eq!(join(["a", "b", "c"]), "a/b/c");
        assert_eq!(join(["/a/", "", "b"]), "a/b");
        assert_eq!(join(Vec::<String>::new()), "");
    }

    #[test]
    fn is_under_respects_segment_boundaries() {
        assert!(is_under("a/b", "a/b"));
        assert!(is_under("a/b/c", "a/b"));
        assert!(is_under("a/b/c", "a/b/"));
        assert!(!is_under("a/bc", "a/b"));
        assert!(is_under("anything", ""));
    }

    #[test]
    fn child_segment_extracts_direct_child() {
        assert_eq!(child_segment("a/b/c/d", "a/b"), Some("c"));
        assert_eq!(child_segment("a/b", "a/b"), None);
        assert_eq!(child_segment("a/bc", "a/b"), None);
        assert_eq!(child_segment("x/y", ""), Some("x"));
    }

    #[test]
    fn base_returns_last_segment() {
        assert_eq!(base("a/b/c"), "c");
        assert_eq!(base("c"), "c");
    }
}
