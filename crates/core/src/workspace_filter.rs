// crates/core/src/workspace_filter.rs

/// Decides whether events from `path` should be persisted.
///
/// If `tracked` is non-empty, `path` must match at least one tracked prefix
/// and no ignored prefix. If `tracked` is empty, `path` is accepted unless
/// an ignored prefix matches. No glob semantics; a prefix matches a path
/// that equals it or that has it followed by `/`.
pub fn is_allowed(path: &str, tracked: &[String], ignored: &[String]) -> bool {
    let ignored_match = ignored.iter().any(|prefix| prefix_matches(prefix, path));
    if ignored_match {
        return false;
    }
    if tracked.is_empty() {
        return true;
    }
    tracked.iter().any(|prefix| prefix_matches(prefix, path))
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    path == prefix || path.starts_with(prefix) && path[prefix.len()..].starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lists_allow_everything() {
        assert!(is_allowed("/home/user/project", &[], &[]));
    }

    #[test]
    fn ignored_prefix_blocks() {
        let ignored = vec!["/tmp".to_string()];
        assert!(!is_allowed("/tmp/x", &[], &ignored));
        assert!(!is_allowed("/tmp", &[], &ignored));
        assert!(is_allowed("/tmpfoo", &[], &ignored));
    }

    #[test]
    fn tracked_prefix_restricts() {
        let tracked = vec!["/home/user/work".to_string()];
        assert!(is_allowed("/home/user/work/proj", &tracked, &[]));
        assert!(is_allowed("/home/user/work", &tracked, &[]));
        assert!(!is_allowed("/home/user/other", &tracked, &[]));
    }

    #[test]
    fn ignored_wins_over_tracked() {
        let tracked = vec!["/home/user".to_string()];
        let ignored = vec!["/home/user/secret".to_string()];
        assert!(!is_allowed("/home/user/secret/file", &tracked, &ignored));
        assert!(is_allowed("/home/user/open", &tracked, &ignored));
    }

    #[test]
    fn exact_prefix_without_trailing_component_is_not_a_match() {
        let tracked = vec!["/home/user/work".to_string()];
        assert!(!is_allowed("/home/user/workshop", &tracked, &[]));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn tracked_prefix_path_is_never_rejected_by_an_unrelated_ignored_prefix(
            tracked_root in "[a-z]{3,8}",
            child in "[a-z]{1,8}",
            unrelated in "[a-z]{3,8}",
        ) {
            prop_assume!(tracked_root != unrelated);
            let path = format!("/{}/{}", tracked_root, child);
            let tracked = vec![format!("/{}", tracked_root)];
            let ignored = vec![format!("/{}", unrelated)];
            prop_assert!(is_allowed(&path, &tracked, &ignored));
        }
    }
}
