//! Related-posts ranking: scoring, cache-aside behavior, per-request
//! memoization, and invalidation.

mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;

use common::{StubPostsRepo, sample_post};
use kindred::application::memo::RequestMemo;
use kindred::application::related::{RelatedPostsConfig, RelatedPostsService};
use kindred::application::repos::PostsRepo;
use kindred::cache::{
    CacheConfig, CacheService, EventQueue, InvalidationConsumer, InvalidationTrigger, MemoryStore,
    keys,
};

fn cache() -> Arc<CacheService> {
    let store = Arc::new(MemoryStore::new(NonZeroUsize::new(256).expect("non-zero")));
    Arc::new(CacheService::new(store))
}

/// Catalog from the worked ranking example: target `a` with two candidates
/// above the threshold and one unrelated post.
fn catalog() -> Arc<StubPostsRepo> {
    Arc::new(StubPostsRepo::new(vec![
        sample_post("a", &["react", "nextjs"]),
        sample_post("b", &["react", "nextjs", "css"]),
        sample_post("c", &["react"]),
        sample_post("d", &["vue"]),
    ]))
}

fn service(repo: Arc<StubPostsRepo>, cache: Arc<CacheService>) -> RelatedPostsService {
    RelatedPostsService::new(repo, cache, RelatedPostsConfig::default())
}

#[tokio::test]
async fn ranks_by_similarity_and_excludes_below_threshold() {
    let repo = catalog();
    let service = service(repo, cache());

    let related = service
        .get_related_posts("a", 2, None)
        .await
        .expect("ranking");

    assert_eq!(related.len(), 2);

    // b: |{react,nextjs}| / |{react,nextjs,css}| = 2/3
    assert_eq!(related[0].slug, "b");
    assert_eq!(related[0].common_tag_count, 2);
    assert!((related[0].similarity - 2.0 / 3.0).abs() < 1e-9);

    // c: 1/2
    assert_eq!(related[1].slug, "c");
    assert_eq!(related[1].common_tag_count, 1);
    assert_eq!(related[1].similarity, 0.5);

    // d scores 0 and never appears regardless of limit.
    let all = service
        .get_related_posts("a", 4, None)
        .await
        .expect("ranking");
    assert!(all.iter().all(|entry| entry.slug != "d"));
}

#[tokio::test]
async fn second_call_is_served_from_cache_without_a_new_query() {
    let repo = catalog();
    let service = service(repo.clone(), cache());

    let first = service
        .get_related_posts("a", 4, None)
        .await
        .expect("ranking");
    assert_eq!(repo.overlap_queries(), 1);

    let second = service
        .get_related_posts("a", 4, None)
        .await
        .expect("ranking");
    assert_eq!(repo.overlap_queries(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn cached_entry_serves_smaller_limits() {
    let repo = catalog();
    let service = service(repo.clone(), cache());

    // Populate the cache with the full computation (limit 4).
    let full = service
        .get_related_posts("a", 4, None)
        .await
        .expect("ranking");

    let top_two = service
        .get_related_posts("a", 2, None)
        .await
        .expect("ranking");

    assert_eq!(repo.overlap_queries(), 1);
    assert_eq!(top_two.as_slice(), &full[..2]);
}

#[tokio::test]
async fn oversized_limit_is_clamped_to_the_cache_limit() {
    let repo = catalog();
    let service = service(repo, cache());

    let related = service
        .get_related_posts("a", 50, None)
        .await
        .expect("ranking");
    assert!(related.len() <= RelatedPostsConfig::default().cache_limit);
}

#[tokio::test]
async fn unknown_and_untagged_posts_yield_empty_rankings() {
    let repo = Arc::new(StubPostsRepo::new(vec![
        sample_post("tagless", &[]),
        sample_post("other", &["rust"]),
    ]));
    let service = service(repo.clone(), cache());

    let missing = service
        .get_related_posts("ghost", 4, None)
        .await
        .expect("ranking");
    assert!(missing.is_empty());

    let untagged = service
        .get_related_posts("tagless", 4, None)
        .await
        .expect("ranking");
    assert!(untagged.is_empty());

    // Untagged short-circuits before the candidate query.
    assert_eq!(repo.overlap_queries(), 0);
}

#[tokio::test]
async fn request_memo_short_circuits_even_a_cold_cache() {
    let repo = catalog();
    let cache = cache();
    let service = service(repo.clone(), cache.clone());
    let memo = RequestMemo::new();

    let first = service
        .get_related_posts("a", 4, Some(&memo))
        .await
        .expect("ranking");
    assert_eq!(repo.overlap_queries(), 1);

    // Simulate the TTL entry vanishing mid-request; the memo still serves.
    cache.delete(&keys::related_key("a")).await;

    let second = service
        .get_related_posts("a", 4, Some(&memo))
        .await
        .expect("ranking");
    assert_eq!(repo.overlap_queries(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn invalidation_purges_the_post_and_its_overlap_neighborhood() {
    let repo = catalog();
    let cache = cache();
    let service = service(repo.clone(), cache.clone());

    let config = CacheConfig::default();
    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        config.clone(),
        cache.clone(),
        repo.clone() as Arc<dyn PostsRepo>,
        queue.clone(),
    ));
    let trigger = InvalidationTrigger::new(config, queue, consumer);

    // Warm the cache for both `a` and `c`.
    service.get_related_posts("a", 4, None).await.expect("ranking");
    service.get_related_posts("c", 4, None).await.expect("ranking");
    assert_eq!(repo.overlap_queries(), 2);

    // Editing `b` must purge the rankings of every post overlapping its
    // tags — both `a` and `c` list `b`.
    trigger
        .post_upserted("b", &["react".to_string(), "nextjs".to_string(), "css".to_string()])
        .await;

    service.get_related_posts("a", 4, None).await.expect("ranking");
    service.get_related_posts("c", 4, None).await.expect("ranking");

    // One consumer overlap query plus one recompute each.
    assert_eq!(repo.overlap_queries(), 5);
}

#[tokio::test]
async fn disabled_cache_skips_invalidation_events() {
    let repo = catalog();
    let cache = cache();

    let config = CacheConfig {
        enabled: false,
        ..Default::default()
    };
    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        config.clone(),
        cache,
        repo as Arc<dyn PostsRepo>,
        queue.clone(),
    ));
    let trigger = InvalidationTrigger::new(config, queue.clone(), consumer);

    trigger.post_deleted("a", &["react".to_string()]).await;
    assert!(queue.is_empty());
}
