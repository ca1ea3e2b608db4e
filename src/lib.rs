pub mod config;
pub mod core;

use std::collections::BTreeMap;
use std::sync::Once;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use crate::config::{Config, ConfigError, RemoteEndpoint};
use crate::core::articles::Article;
use crate::core::notices::{notice_for_preference, notice_for_query_error, Notice};
use crate::core::preferences::{KeyValueStore, PreferenceChange, PreferenceKind, PreferenceStore};
use crate::core::query::{ArticleFilter, ArticleQueryClient, QueryError, TrendingTopics};
use crate::core::storage::{SqliteKeyValueStore, StorageError};

static INIT_TRACING: Once = Once::new();

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

/// Installs the fmt subscriber once; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Everything the reader UI talks to: remote article queries on one side,
/// the liked/saved sets on the other.
#[derive(Debug)]
pub struct BnewsApp<S> {
    store: S,
    articles: ArticleQueryClient,
    liked: Mutex<PreferenceStore<S>>,
    saved: Mutex<PreferenceStore<S>>,
}

impl BnewsApp<SqliteKeyValueStore> {
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let store = SqliteKeyValueStore::connect(&config.database_url).await?;
        Self::with_store(config, store).await
    }
}

impl<S: KeyValueStore + Clone> BnewsApp<S> {
    pub async fn with_store(config: &Config, store: S) -> Result<Self, AppError> {
        let articles = ArticleQueryClient::from_config(config)?;
        let liked = PreferenceStore::load(PreferenceKind::Liked, store.clone()).await;
        let saved = PreferenceStore::load(PreferenceKind::Saved, store.clone()).await;
        info!(
            liked = liked.len(),
            saved = saved.len(),
            base_url = %config.remote.base_url,
            "bnews core ready"
        );
        Ok(Self {
            store,
            articles,
            liked: Mutex::new(liked),
            saved: Mutex::new(saved),
        })
    }

    /// Status per component, checked now: the storage round trip, whether each
    /// preference set was read and last written, and whether trending is cached.
    pub async fn health_report(&self) -> BTreeMap<String, String> {
        let mut report = BTreeMap::new();
        let storage = match self.store.ping().await {
            Ok(()) => "ready".to_string(),
            Err(error) => format!("unavailable: {error}"),
        };
        report.insert("storage".to_string(), storage);
        report.insert(
            "liked".to_string(),
            preference_status(&*self.liked.lock().await).to_string(),
        );
        report.insert(
            "saved".to_string(),
            preference_status(&*self.saved.lock().await).to_string(),
        );
        let trending = if self.articles.trending_is_cached().await {
            "cached"
        } else {
            "cold"
        };
        report.insert("trending".to_string(), trending.to_string());
        report
    }

    pub async fn featured_article(&self) -> Result<Option<Article>, QueryError> {
        self.articles.fetch_featured().await
    }

    pub async fn articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, QueryError> {
        self.articles.list_articles(filter).await
    }

    pub async fn article(&self, id: &str) -> Result<Option<Article>, QueryError> {
        self.articles.fetch_article(id).await
    }

    pub async fn related_articles(&self, article: &Article) -> Result<Vec<Article>, QueryError> {
        self.articles.fetch_related(article).await
    }

    pub async fn trending_topics(&self) -> Result<TrendingTopics, QueryError> {
        self.articles.fetch_trending_topics().await
    }

    pub async fn toggle_liked(&self, id: &str) -> PreferenceChange {
        self.liked.lock().await.toggle(id).await
    }

    pub async fn toggle_saved(&self, id: &str) -> PreferenceChange {
        self.saved.lock().await.toggle(id).await
    }

    pub async fn is_liked(&self, id: &str) -> bool {
        self.liked.lock().await.contains(id)
    }

    pub async fn is_saved(&self, id: &str) -> bool {
        self.saved.lock().await.contains(id)
    }

    pub async fn liked_ids(&self) -> Vec<String> {
        self.liked.lock().await.ids().to_vec()
    }

    pub async fn saved_ids(&self) -> Vec<String> {
        self.saved.lock().await.ids().to_vec()
    }
}

fn preference_status<S: KeyValueStore>(preferences: &PreferenceStore<S>) -> &'static str {
    if !preferences.is_loaded() {
        "unloaded"
    } else if !preferences.is_synced() {
        "unsynced"
    } else {
        "ready"
    }
}

/// What the UI should flash after a preference toggle, if anything.
pub fn preference_notice(change: &PreferenceChange) -> Option<Notice> {
    notice_for_preference(change)
}

pub fn query_error_notice(error: &QueryError) -> Notice {
    notice_for_query_error(error)
}
