//! Reserved refs and local ref formatting

/// Prefix shared by every local branch's canonical ref
pub const LOCAL_REF_PREFIX: &str = "refs/heads/";

/// Canonical refs that are never pruned, whatever their merge or checkout state
pub const RESERVED_REFS: &[&str] = &[
    "HEAD",
    "refs/heads/main",
    "refs/heads/master",
    "refs/heads/gh-pages",
    "refs/heads/develop",
    "refs/heads/dev",
    "refs/heads/development",
    "refs/heads/trunk",
    "refs/heads/devel",
    "refs/heads/release",
];

/// Check whether a canonical ref is in the reserved set
pub fn is_reserved(canonical_ref: &str) -> bool {
    RESERVED_REFS.contains(&canonical_ref)
}

/// Turn a short branch name into its canonical local ref
///
/// Names that are already canonical are returned unchanged.
pub fn format_as_local_ref(name: &str) -> String {
    if name.starts_with(LOCAL_REF_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", LOCAL_REF_PREFIX, name)
    }
}

/// Strip the local ref prefix, returning `None` for refs that are not local branches
pub fn strip_local_ref(canonical_ref: &str) -> Option<&str> {
    canonical_ref
        .strip_prefix(LOCAL_REF_PREFIX)
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_branches_are_reserved() {
        assert!(is_reserved("HEAD"));
        assert!(is_reserved("refs/heads/main"));
        assert!(is_reserved("refs/heads/master"));
        assert!(is_reserved("refs/heads/develop"));
    }

    #[test]
    fn test_short_names_are_not_reserved() {
        // Only canonical refs match
        assert!(!is_reserved("main"));
        assert!(!is_reserved("refs/heads/feature-x"));
        assert!(!is_reserved("refs/remotes/origin/main"));
    }

    #[test]
    fn test_format_as_local_ref() {
        assert_eq!(format_as_local_ref("feature-x"), "refs/heads/feature-x");
        assert_eq!(format_as_local_ref("user/topic"), "refs/heads/user/topic");
        assert_eq!(format_as_local_ref("refs/heads/feature-x"), "refs/heads/feature-x");
    }

    #[test]
    fn test_strip_local_ref() {
        assert_eq!(strip_local_ref("refs/heads/feature-x"), Some("feature-x"));
        assert_eq!(strip_local_ref("refs/heads/user/topic"), Some("user/topic"));
        assert_eq!(strip_local_ref("refs/remotes/origin/feature-x"), None);
        assert_eq!(strip_local_ref("refs/heads/"), None);
        assert_eq!(strip_local_ref("HEAD"), None);
    }
}
