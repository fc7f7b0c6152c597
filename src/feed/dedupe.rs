use crate::storage::PostDraft;
use std::collections::HashSet;

/// Drops posts whose link is already known for the feed.
///
/// Returns the subsequence of `new_posts` whose `link` is not in
/// `known_links`, in the original relative order. A link repeated within
/// `new_posts` itself is kept only at its first occurrence.
///
/// Pure and idempotent: applying it again with the same `known_links`
/// returns the same posts.
pub fn dedupe(new_posts: Vec<PostDraft>, known_links: &HashSet<&str>) -> Vec<PostDraft> {
    let mut seen: HashSet<String> = HashSet::with_capacity(new_posts.len());

    new_posts
        .into_iter()
        .filter(|post| !known_links.contains(post.link.as_str()) && seen.insert(post.link.clone()))
        .collect()
}
