pub mod cache;
pub mod client;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::articles::{Category, NormalizeError};

pub use client::ArticleQueryClient;

pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status code {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid article: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("remote function failed: {0}")]
    Function(String),
}

impl QueryError {
    /// Transport failures and server-side statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Request(_) => true,
            QueryError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category: Option<Category>,
    /// Rows requested from the server (default 20). Rows that fail
    /// normalization are skipped, so a list can come back shorter.
    pub limit: Option<usize>,
}

impl ArticleFilter {
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopics {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
