//! Tag-set similarity scoring.
//!
//! Related-post ranking is driven by the Jaccard index of two posts' tag
//! sets: the size of the intersection divided by the size of the union.
//! Tags are compared verbatim (case-sensitive); normalization is the
//! responsibility of the write path, which slugifies tags before persisting.

use std::collections::HashSet;

/// Number of tags shared by both sets, with duplicates collapsed.
pub fn common_tag_count(a: &[String], b: &[String]) -> usize {
    let left: HashSet<&str> = a.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    left.intersection(&right).count()
}

/// Jaccard index of two tag sets, in `[0, 1]`.
///
/// Two empty sets score 0 rather than 1: an untagged post has no similarity
/// basis, and "vacuously identical" would rank it against everything.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let left: HashSet<&str> = a.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn jaccard_is_bounded_and_symmetric() {
        let cases = [
            (tags(&["react", "nextjs"]), tags(&["react", "nextjs", "css"])),
            (tags(&["react"]), tags(&["vue"])),
            (tags(&[]), tags(&["rust"])),
            (tags(&["a", "b", "c"]), tags(&["c"])),
        ];

        for (a, b) in &cases {
            let forward = jaccard(a, b);
            let backward = jaccard(b, a);
            assert!((0.0..=1.0).contains(&forward), "out of bounds: {forward}");
            assert_eq!(forward, backward, "asymmetric for {a:?} / {b:?}");
        }
    }

    #[test]
    fn empty_sets_score_zero() {
        assert_eq!(jaccard(&[], &[]), 0.0);
    }

    #[test]
    fn identical_non_empty_sets_score_one() {
        let a = tags(&["rust", "tokio", "axum"]);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn worked_example() {
        let target = tags(&["react", "nextjs"]);

        // |{react, nextjs}| / |{react, nextjs, css}| = 2/3
        let b = jaccard(&target, &tags(&["react", "nextjs", "css"]));
        assert!((b - 2.0 / 3.0).abs() < f64::EPSILON);

        // |{react}| / |{react, nextjs}| = 1/2
        let c = jaccard(&target, &tags(&["react"]));
        assert_eq!(c, 0.5);

        let d = jaccard(&target, &tags(&["vue"]));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn duplicate_tags_collapse() {
        let a = tags(&["rust", "rust", "tokio"]);
        let b = tags(&["rust", "tokio", "tokio"]);
        assert_eq!(jaccard(&a, &b), 1.0);
        assert_eq!(common_tag_count(&a, &b), 2);
    }
}
