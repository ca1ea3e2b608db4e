use std::cmp::Reverse;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::types::{Article, Category, RawArticle};
use crate::core::images::is_valid_image_url;

/// Byline used when a row carries no author.
pub const DEFAULT_AUTHOR: &str = "Redação";

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("article record has no id")]
    MissingId,
    #[error("malformed article record: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn normalize(raw: RawArticle) -> Result<Article, NormalizeError> {
    let id = raw
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(NormalizeError::MissingId)?;

    let category = match raw.category.as_deref() {
        Some(value) => Category::from_id(value).unwrap_or_else(|| {
            warn!(article_id = %id, category = value, "unknown article category, using fallback");
            Category::FALLBACK
        }),
        None => {
            debug!(article_id = %id, "article has no category, using fallback");
            Category::FALLBACK
        }
    };

    let image_url = raw
        .image_url
        .filter(|url| is_valid_image_url(Some(url.as_str())))
        .map(|url| url.trim().to_string());

    let reading_time = raw
        .reading_time
        .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
        .map(|minutes| minutes.round().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0);

    let author = raw
        .author
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

    let related_article_ids = dedup_ids(raw.related_article_ids.unwrap_or_default(), Some(id.as_str()));
    let tags = raw.tags.map(|tags| {
        tags.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    });

    Ok(Article {
        title: raw.title.unwrap_or_default(),
        summary: raw.summary.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        category,
        image_url,
        published_at: raw.published_at.unwrap_or_default(),
        reading_time,
        author,
        quick_facts: raw.quick_facts.unwrap_or_default(),
        related_article_ids,
        tags,
        id,
    })
}

pub fn normalize_value(value: serde_json::Value) -> Result<Article, NormalizeError> {
    let raw: RawArticle = serde_json::from_value(value)?;
    normalize(raw)
}

/// Most recent first; equal instants fall back to the id so the order is total.
/// Timestamps that are not RFC 3339 sort after every parseable one, compared
/// as strings among themselves.
pub fn sort_most_recent_first(articles: &mut [Article]) {
    articles.sort_by_cached_key(|article| Reverse(recency_key(article)));
}

fn recency_key(article: &Article) -> (Option<DateTime<Utc>>, String, String) {
    let parsed = DateTime::parse_from_rfc3339(article.published_at.trim())
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc));
    let unparsed = match parsed {
        Some(_) => String::new(),
        None => article.published_at.clone(),
    };
    (parsed, unparsed, article.id.clone())
}

fn dedup_ids(ids: Vec<String>, exclude: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && Some(id.as_str()) != exclude)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
