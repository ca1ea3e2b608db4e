pub mod normalizer;
pub mod types;

pub use normalizer::{normalize, normalize_value, sort_most_recent_first, NormalizeError};
pub use types::{categories, Article, Category, CategoryInfo, RawArticle};
