//! A hand-written application repository on top of the cache repository

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cache_repository::domain::cache::typed_generator_fn;
use cache_repository::domain::{
    CacheDefinition, CacheOperation, CacheRepository, DomainError, EnumeratedWarmup, KeyArg,
    LockOptions, SpinLock, StoreClient, TypedEntry,
};
use cache_repository::infrastructure::store::InMemoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    id: i64,
    title: String,
}

/// Stands in for the database, counting how often it is queried
#[derive(Default)]
struct ArticleSource {
    articles: Mutex<Vec<Article>>,
    queries: AtomicUsize,
}

impl ArticleSource {
    fn with_articles(titles: &[&str]) -> Arc<Self> {
        let articles = titles
            .iter()
            .enumerate()
            .map(|(i, title)| Article {
                id: i as i64 + 1,
                title: title.to_string(),
            })
            .collect();

        Arc::new(Self {
            articles: Mutex::new(articles),
            queries: AtomicUsize::new(0),
        })
    }

    fn latest(&self, limit: usize) -> Vec<Article> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let articles = self.articles.lock().unwrap();
        articles.iter().rev().take(limit).cloned().collect()
    }

    fn find(&self, id: i64) -> Option<Article> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let articles = self.articles.lock().unwrap();
        articles.iter().find(|a| a.id == id).cloned()
    }

    fn ids(&self) -> Vec<i64> {
        self.articles.lock().unwrap().iter().map(|a| a.id).collect()
    }

    fn rename(&self, id: i64, title: &str) {
        let mut articles = self.articles.lock().unwrap();
        if let Some(article) = articles.iter_mut().find(|a| a.id == id) {
            article.title = title.to_string();
        }
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

struct ArticleRepository {
    cache: CacheRepository,
}

impl ArticleRepository {
    fn new(client: StoreClient, source: Arc<ArticleSource>) -> Result<Self, DomainError> {
        let latest_source = source.clone();
        let latest = CacheDefinition::new(
            "latestArticles",
            0,
            typed_generator_fn(move |_args| {
                let source = latest_source.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, DomainError>(source.latest(3))
                }
            }),
        );

        let article_source = source.clone();
        let warmup_source = source;
        let article = CacheDefinition::new(
            "article",
            1,
            typed_generator_fn(move |args: Vec<KeyArg>| {
                let source = article_source.clone();
                async move {
                    let id = args[0]
                        .as_i64()
                        .ok_or_else(|| DomainError::generation("article", "id must be an integer"))?;
                    source
                        .find(id)
                        .ok_or_else(|| DomainError::generation("article", format!("no article {}", id)))
                }
            }),
        )
        .with_warmup(EnumeratedWarmup::new(move || {
            let source = warmup_source.clone();
            async move {
                Ok::<_, DomainError>(
                    source
                        .ids()
                        .into_iter()
                        .map(|id| vec![KeyArg::from(id)])
                        .collect(),
                )
            }
        }));

        let cache = CacheRepository::builder(client)
            .prefix("blog")
            .register(latest)
            .register(article)
            .build()?;

        Ok(Self { cache })
    }

    fn latest_articles(&self) -> TypedEntry<'_, Vec<Article>> {
        self.cache.entry("latestArticles")
    }

    fn article(&self) -> TypedEntry<'_, Article> {
        self.cache.entry("article")
    }
}

fn setup(titles: &[&str]) -> (ArticleRepository, Arc<ArticleSource>, StoreClient) {
    let client = StoreClient::new(Arc::new(InMemoryStore::new()));
    let source = ArticleSource::with_articles(titles);
    let repository = ArticleRepository::new(client.clone(), source.clone()).unwrap();

    (repository, source, client)
}

#[tokio::test]
async fn latest_articles_are_queried_once() {
    let (repository, source, _) = setup(&["one", "two", "three", "four"]);

    let first = repository.latest_articles().get(&[]).await.unwrap();
    let second = repository.latest_articles().get(&[]).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].title, "four");
    assert_eq!(source.queries(), 1);
}

#[tokio::test]
async fn stale_entry_is_served_until_regenerated() {
    let (repository, source, _) = setup(&["one", "two"]);

    let before = repository.article().get(&[KeyArg::from(1)]).await.unwrap();
    source.rename(1, "one, revised");

    let cached = repository.article().get(&[KeyArg::from(1)]).await.unwrap();
    assert_eq!(cached, before);

    let fresh = repository
        .article()
        .regenerate(&[KeyArg::from(1)])
        .await
        .unwrap();
    assert_eq!(fresh.title, "one, revised");

    let after = repository.article().get(&[KeyArg::from(1)]).await.unwrap();
    assert_eq!(after, fresh);
}

#[tokio::test]
async fn invalidated_entry_is_recomputed() {
    let (repository, source, _) = setup(&["one"]);

    repository.latest_articles().get(&[]).await.unwrap();
    assert!(repository.latest_articles().invalidate(&[]).await.unwrap());
    repository.latest_articles().get(&[]).await.unwrap();

    assert_eq!(source.queries(), 2);
}

#[tokio::test]
async fn arguments_select_separate_entries() {
    let (repository, _, _) = setup(&["one", "two"]);

    let first = repository.article().storage_key(&[KeyArg::from(1)]).unwrap();
    let second = repository.article().storage_key(&[KeyArg::from(2)]).unwrap();

    assert_ne!(first, second);
    assert!(first.starts_with("blog:article:"));
    assert_eq!(
        first,
        repository.article().storage_key(&[KeyArg::Int(1)]).unwrap()
    );
}

#[tokio::test]
async fn missing_article_is_a_generation_error_and_nothing_is_cached() {
    let (repository, _, client) = setup(&["one"]);

    let result = repository.article().get(&[KeyArg::from(99)]).await;
    assert!(matches!(result, Err(DomainError::Generation { .. })));

    let storage_key = repository.article().storage_key(&[KeyArg::from(99)]).unwrap();
    assert!(client.store().get_raw(&storage_key).await.unwrap().is_none());
}

#[tokio::test]
async fn warmup_fills_every_entry() {
    let (repository, source, client) = setup(&["one", "two", "three"]);

    repository.cache.warmup().await.unwrap();
    // latest + one query per article
    assert_eq!(source.queries(), 4);

    for id in 1..=3 {
        let storage_key = repository.article().storage_key(&[KeyArg::from(id)]).unwrap();
        assert!(client.store().get_raw(&storage_key).await.unwrap().is_some());
    }

    repository.latest_articles().get(&[]).await.unwrap();
    repository.article().get(&[KeyArg::from(2)]).await.unwrap();
    assert_eq!(source.queries(), 4);
}

#[tokio::test]
async fn operation_verbs_arrive_as_data() {
    let (repository, source, _) = setup(&["one"]);

    for verb in ["get", "get", "REGENERATE", "invalidate", "get"] {
        let operation: CacheOperation = verb.parse().unwrap();
        repository
            .cache
            .dispatch(operation, "latestArticles", &[])
            .await
            .unwrap();
    }

    assert_eq!(source.queries(), 3);
    assert!(matches!(
        "refresh".parse::<CacheOperation>(),
        Err(DomainError::UnknownOperation { .. })
    ));
}

#[tokio::test]
async fn locked_reads_compute_once_under_contention() {
    let (repository, source, client) = setup(&["one", "two"]);
    let repository = Arc::new(repository);
    let lock = SpinLock::new(client);
    let options = LockOptions::new(Duration::from_secs(5), Duration::from_secs(5));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repository = repository.clone();
        let lock = lock.clone();
        handles.push(tokio::spawn(async move {
            repository
                .cache
                .get_locked(&lock, "latestArticles", &[], options)
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(source.queries(), 1);
}

#[tokio::test]
async fn lock_is_reacquirable_after_hold_lapses() {
    let client = StoreClient::new(Arc::new(InMemoryStore::new()));
    let lock = SpinLock::new(client);
    let options = LockOptions::new(Duration::from_secs(1), Duration::from_secs(5));

    let first = lock.acquire_with("import", options).await.unwrap();
    // The first holder never releases; the second waits for the TTL.
    let second = lock.acquire_with("import", options).await.unwrap();

    assert_ne!(first.token(), second.token());
    assert!(lock.release(&second).await.unwrap());
    assert!(!lock.release(&first).await.unwrap());
}
