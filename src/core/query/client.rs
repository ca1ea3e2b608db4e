use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::cache::TtlCache;
use super::{ArticleFilter, QueryError, TrendingTopics, DEFAULT_LIST_LIMIT};
use crate::config::{Config, RemoteEndpoint};
use crate::core::articles::{normalize_value, sort_most_recent_first, Article};
use crate::core::functions::{FunctionInvoker, TRENDING_TOPICS_FUNCTION};

const RECENCY_ORDER: &str = "published_at.desc,id.desc";

/// Read-only access to the hosted `articles` table and the trending function.
#[derive(Debug)]
pub struct ArticleQueryClient {
    client: reqwest::Client,
    endpoint: RemoteEndpoint,
    functions: FunctionInvoker,
    max_retries: usize,
    trending: TtlCache<TrendingTopics>,
}

impl ArticleQueryClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: RemoteEndpoint,
        max_retries: usize,
        trending_ttl: Duration,
    ) -> Self {
        let functions = FunctionInvoker::new(client.clone(), endpoint.clone());
        Self {
            client,
            endpoint,
            functions,
            max_retries,
            trending: TtlCache::new(trending_ttl),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(
            client,
            config.remote.clone(),
            config.max_retries,
            config.trending_ttl,
        ))
    }

    pub fn functions(&self) -> &FunctionInvoker {
        &self.functions
    }

    /// The most recent published hero article, if any.
    pub async fn fetch_featured(&self) -> Result<Option<Article>, QueryError> {
        let rows = self
            .select_with_retry(&[
                ("status", "eq.published".to_string()),
                ("highlight_type", "eq.hero".to_string()),
                ("order", RECENCY_ORDER.to_string()),
                ("limit", "1".to_string()),
            ])
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(normalize_value(row)?)),
            None => Ok(None),
        }
    }

    /// At most `limit` articles; rows that fail normalization are dropped
    /// after the server applied the limit, so fewer may come back.
    pub async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, QueryError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let mut params = vec![("status", "eq.published".to_string())];
        if let Some(category) = filter.category {
            params.push(("category", format!("eq.{category}")));
        }
        params.push(("order", RECENCY_ORDER.to_string()));
        params.push(("limit", limit.to_string()));

        let rows = self.select_with_retry(&params).await?;
        let mut articles = normalize_rows(rows);
        sort_most_recent_first(&mut articles);
        articles.truncate(limit);
        Ok(articles)
    }

    pub async fn fetch_article(&self, id: &str) -> Result<Option<Article>, QueryError> {
        let rows = self
            .select_with_retry(&[
                ("id", format!("eq.{id}")),
                ("status", "eq.published".to_string()),
                ("limit", "1".to_string()),
            ])
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(normalize_value(row)?)),
            None => Ok(None),
        }
    }

    /// Related articles in the order the source article lists them; ids that
    /// no longer resolve are left out.
    pub async fn fetch_related(&self, article: &Article) -> Result<Vec<Article>, QueryError> {
        if article.related_article_ids.is_empty() {
            return Ok(Vec::new());
        }
        let quoted: Vec<String> = article
            .related_article_ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('"', "\\\"")))
            .collect();
        let rows = self
            .select_with_retry(&[
                ("id", format!("in.({})", quoted.join(","))),
                ("status", "eq.published".to_string()),
            ])
            .await?;

        let mut by_id: HashMap<String, Article> = normalize_rows(rows)
            .into_iter()
            .map(|related| (related.id.clone(), related))
            .collect();
        Ok(article
            .related_article_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    /// Served from a short-lived cache; failures are never cached.
    pub async fn fetch_trending_topics(&self) -> Result<TrendingTopics, QueryError> {
        if let Some(cached) = self.trending.get().await {
            debug!("trending topics served from cache");
            return Ok(cached);
        }
        let topics = self
            .functions
            .invoke::<TrendingTopics>(TRENDING_TOPICS_FUNCTION, None)
            .await
            .into_result()
            .map_err(QueryError::Function)?;
        self.trending.put(topics.clone()).await;
        Ok(topics)
    }

    pub async fn trending_is_cached(&self) -> bool {
        self.trending.is_fresh().await
    }

    pub async fn invalidate_trending(&self) {
        self.trending.invalidate().await;
    }

    async fn select_with_retry(&self, params: &[(&str, String)]) -> Result<Vec<Value>, QueryError> {
        let mut attempt = 0_usize;
        loop {
            match self.select_articles(params).await {
                Ok(rows) => return Ok(rows),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    debug!(attempt, error = %err, "retrying article query");
                    tokio::time::sleep(Duration::from_millis(40 * attempt as u64)).await;
                }
            }
        }
    }

    async fn select_articles(&self, params: &[(&str, String)]) -> Result<Vec<Value>, QueryError> {
        let url = format!("{}/rest/v1/articles", self.endpoint.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("select", "*")])
            .query(params)
            .bearer_auth(&self.endpoint.anon_key)
            .header("apikey", &self.endpoint.anon_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(QueryError::HttpStatus {
                status: status.as_u16(),
                message: rest_error_message(&body),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

fn normalize_rows(rows: Vec<Value>) -> Vec<Article> {
    rows.into_iter()
        .filter_map(|row| match normalize_value(row) {
            Ok(article) => Some(article),
            Err(error) => {
                warn!(%error, "skipping article row");
                None
            }
        })
        .collect()
}

fn rest_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::articles::Category;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct AppState {
        rows: Arc<Vec<Value>>,
        failures_before_success: usize,
        request_count: Arc<AtomicUsize>,
        trending_count: Arc<AtomicUsize>,
        trending_fails: bool,
        seen_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    fn row_matches(row: &Value, key: &str, condition: &str) -> bool {
        let field = row.get(key).and_then(Value::as_str).unwrap_or_default();
        if let Some(expected) = condition.strip_prefix("eq.") {
            return field == expected;
        }
        if let Some(list) = condition
            .strip_prefix("in.(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return list
                .split(',')
                .any(|candidate| candidate.trim_matches('"') == field);
        }
        true
    }

    async fn articles_handler(
        State(state): State<AppState>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let attempt = state.request_count.fetch_add(1, Ordering::SeqCst);
        state
            .seen_queries
            .lock()
            .expect("lock should not be poisoned")
            .push(params.clone());
        if attempt < state.failures_before_success {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "message": "database warming up" })),
            )
                .into_response();
        }

        let limit = params
            .get("limit")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let rows: Vec<Value> = state
            .rows
            .iter()
            .filter(|row| {
                params
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "select" | "order" | "limit"))
                    .all(|(key, condition)| row_matches(row, key, condition))
            })
            .take(limit)
            .cloned()
            .collect();
        Json(rows).into_response()
    }

    async fn trending_handler(State(state): State<AppState>) -> Response {
        state.trending_count.fetch_add(1, Ordering::SeqCst);
        if state.trending_fails {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "boom" })),
            )
                .into_response();
        }
        Json(json!({
            "topics": ["Orçamento do Estado", "Liga dos Campeões"],
            "categories": ["economia", "desporto"],
            "generatedAt": "2026-02-24T10:00:00Z"
        }))
        .into_response()
    }

    async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route("/rest/v1/articles", get(articles_handler))
            .route("/functions/v1/trending-topics", post(trending_handler))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    fn query_client(base_url: &str, max_retries: usize, trending_ttl: Duration) -> ArticleQueryClient {
        ArticleQueryClient::new(
            reqwest::Client::new(),
            RemoteEndpoint::new(base_url, "anon-key"),
            max_retries,
            trending_ttl,
        )
    }

    fn sample_rows() -> Vec<Value> {
        vec![
            json!({
                "id": "a-1", "title": "Mercados em alta", "category": "economia",
                "status": "published", "highlight_type": "hero",
                "published_at": "2026-02-24T09:00:00Z", "related_article_ids": ["a-3", "a-2", "gone"]
            }),
            json!({
                "id": "a-2", "title": "Eleições", "category": "politica",
                "status": "published", "highlight_type": "standard",
                "published_at": "2026-02-24T11:00:00Z"
            }),
            json!({
                "id": "a-3", "title": "Novo estádio", "category": "desporto",
                "status": "published", "highlight_type": "standard",
                "published_at": "2026-02-24T11:00:00Z"
            }),
            json!({
                "title": "Sem identificador", "category": "economia",
                "status": "published", "published_at": "2026-02-25T00:00:00Z"
            }),
            json!({
                "id": "a-5", "title": "Rascunho", "category": "economia",
                "status": "draft", "published_at": "2026-02-26T00:00:00Z"
            }),
        ]
    }

    #[tokio::test]
    async fn fetch_featured_returns_none_without_rows() {
        let state = AppState::default();
        let seen = state.seen_queries.clone();
        let (base_url, server_task) = spawn_test_server(state).await;

        let featured = query_client(&base_url, 0, Duration::ZERO)
            .fetch_featured()
            .await
            .expect("empty result is not an error");

        assert_eq!(featured, None);
        let queries = seen.lock().expect("lock should not be poisoned");
        assert_eq!(queries[0]["status"], "eq.published");
        assert_eq!(queries[0]["highlight_type"], "eq.hero");
        assert_eq!(queries[0]["order"], RECENCY_ORDER);
        assert_eq!(queries[0]["limit"], "1");
        server_task.abort();
    }

    #[tokio::test]
    async fn fetch_featured_normalizes_the_hero_row() {
        let state = AppState {
            rows: Arc::new(sample_rows()),
            ..AppState::default()
        };
        let (base_url, server_task) = spawn_test_server(state).await;

        let featured = query_client(&base_url, 0, Duration::ZERO)
            .fetch_featured()
            .await
            .expect("query should succeed")
            .expect("hero should exist");

        assert_eq!(featured.id, "a-1");
        assert_eq!(featured.category, Category::Economia);
        assert_eq!(featured.related_article_ids, vec!["a-3", "a-2", "gone"]);
        server_task.abort();
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_surfaced() {
        let state = AppState {
            failures_before_success: usize::MAX,
            ..AppState::default()
        };
        let request_count = state.request_count.clone();
        let (base_url, server_task) = spawn_test_server(state).await;

        let error = query_client(&base_url, 1, Duration::ZERO)
            .fetch_featured()
            .await
            .expect_err("persistent 503 must surface");

        match error {
            QueryError::HttpStatus { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "database warming up");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(request_count.load(Ordering::SeqCst), 2);
        server_task.abort();
    }

    #[tokio::test]
    async fn transient_failure_recovers_within_retry_budget() {
        let state = AppState {
            rows: Arc::new(sample_rows()),
            failures_before_success: 1,
            ..AppState::default()
        };
        let (base_url, server_task) = spawn_test_server(state).await;

        let featured = query_client(&base_url, 2, Duration::ZERO)
            .fetch_featured()
            .await
            .expect("retry should recover");

        assert!(featured.is_some());
        server_task.abort();
    }

    #[tokio::test]
    async fn list_articles_skips_bad_rows_and_orders_by_recency() {
        let state = AppState {
            rows: Arc::new(sample_rows()),
            ..AppState::default()
        };
        let (base_url, server_task) = spawn_test_server(state).await;
        let client = query_client(&base_url, 0, Duration::ZERO);

        let feed = client
            .list_articles(&ArticleFilter::default())
            .await
            .expect("list should succeed");
        let ids: Vec<&str> = feed.iter().map(|article| article.id.as_str()).collect();
        assert_eq!(ids, vec!["a-3", "a-2", "a-1"]);

        let politics = client
            .list_articles(&ArticleFilter::category(Category::Politica).with_limit(5))
            .await
            .expect("category list should succeed");
        assert_eq!(politics.len(), 1);
        assert_eq!(politics[0].id, "a-2");
        server_task.abort();
    }

    #[tokio::test]
    async fn list_limit_is_an_upper_bound_after_bad_rows_are_dropped() {
        let state = AppState {
            rows: Arc::new(sample_rows()),
            ..AppState::default()
        };
        let seen = state.seen_queries.clone();
        let (base_url, server_task) = spawn_test_server(state).await;
        let client = query_client(&base_url, 0, Duration::ZERO);

        let feed = client
            .list_articles(&ArticleFilter::default().with_limit(4))
            .await
            .expect("list should succeed");

        assert_eq!(seen.lock().expect("lock should not be poisoned")[0]["limit"], "4");
        let ids: Vec<&str> = feed.iter().map(|article| article.id.as_str()).collect();
        assert_eq!(ids, vec!["a-3", "a-2", "a-1"]);

        let short = client
            .list_articles(&ArticleFilter::default().with_limit(2))
            .await
            .expect("list should succeed");
        assert_eq!(short.len(), 2);
        server_task.abort();
    }

    #[tokio::test]
    async fn fetch_article_and_related_follow_listed_order() {
        let state = AppState {
            rows: Arc::new(sample_rows()),
            ..AppState::default()
        };
        let request_count = state.request_count.clone();
        let (base_url, server_task) = spawn_test_server(state).await;
        let client = query_client(&base_url, 0, Duration::ZERO);

        let article = client
            .fetch_article("a-1")
            .await
            .expect("lookup should succeed")
            .expect("article should exist");
        let related = client
            .fetch_related(&article)
            .await
            .expect("related should succeed");
        let ids: Vec<&str> = related.iter().map(|article| article.id.as_str()).collect();
        assert_eq!(ids, vec!["a-3", "a-2"]);

        assert_eq!(client.fetch_article("a-5").await.expect("lookup"), None);

        let before = request_count.load(Ordering::SeqCst);
        let lonely = client
            .fetch_related(&client.fetch_article("a-2").await.expect("lookup").expect("exists"))
            .await
            .expect("related should succeed");
        assert!(lonely.is_empty());
        assert_eq!(request_count.load(Ordering::SeqCst), before + 1);
        server_task.abort();
    }

    #[tokio::test]
    async fn trending_topics_are_cached_within_ttl() {
        let state = AppState::default();
        let trending_count = state.trending_count.clone();
        let (base_url, server_task) = spawn_test_server(state).await;
        let client = query_client(&base_url, 0, Duration::from_secs(300));

        assert!(!client.trending_is_cached().await);
        let first = client.fetch_trending_topics().await.expect("first fetch");
        assert!(client.trending_is_cached().await);
        let second = client.fetch_trending_topics().await.expect("cached fetch");

        assert_eq!(first, second);
        assert_eq!(first.categories, vec!["economia", "desporto"]);
        assert_eq!(trending_count.load(Ordering::SeqCst), 1);

        client.invalidate_trending().await;
        client.fetch_trending_topics().await.expect("refetch");
        assert_eq!(trending_count.load(Ordering::SeqCst), 2);
        server_task.abort();
    }

    #[tokio::test]
    async fn trending_failure_propagates_and_is_not_cached() {
        let state = AppState {
            trending_fails: true,
            ..AppState::default()
        };
        let trending_count = state.trending_count.clone();
        let (base_url, server_task) = spawn_test_server(state).await;
        let client = query_client(&base_url, 0, Duration::from_secs(300));

        for _ in 0..2 {
            let error = client
                .fetch_trending_topics()
                .await
                .expect_err("function failure must surface");
            assert!(matches!(error, QueryError::Function(ref message) if message == "boom"));
        }
        assert_eq!(trending_count.load(Ordering::SeqCst), 2);
        server_task.abort();
    }
}
