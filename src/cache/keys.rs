//! Cache key layout for engagement data.
//!
//! Two key families share the `post:` namespace:
//!
//! - `post:{slug}` — the stats document (views + per-user likes), TTL-less.
//! - `post:{slug}:related` — the cached related-posts ranking, 24 h TTL.
//!
//! Slugs are slugified (`[a-z0-9-]`), so a key with a second `:` segment is
//! never a stats key.

/// Prefix shared by every engagement key.
pub const POST_PREFIX: &str = "post:";

const RELATED_SUFFIX: &str = ":related";

/// Key of the stats document for `slug`.
pub fn stats_key(slug: &str) -> String {
    format!("{POST_PREFIX}{slug}")
}

/// Key of the cached related-posts ranking for `slug`.
pub fn related_key(slug: &str) -> String {
    format!("{POST_PREFIX}{slug}{RELATED_SUFFIX}")
}

/// Extract the slug from a stats key, rejecting non-stats keys.
pub fn stats_slug(key: &str) -> Option<&str> {
    let rest = key.strip_prefix(POST_PREFIX)?;
    if rest.is_empty() || rest.contains(':') {
        return None;
    }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(stats_key("rust-ownership"), "post:rust-ownership");
        assert_eq!(related_key("rust-ownership"), "post:rust-ownership:related");
    }

    #[test]
    fn stats_slug_accepts_only_stats_keys() {
        assert_eq!(stats_slug("post:rust-ownership"), Some("rust-ownership"));
        assert_eq!(stats_slug("post:rust-ownership:related"), None);
        assert_eq!(stats_slug("post:"), None);
        assert_eq!(stats_slug("other:rust-ownership"), None);
    }
}
