use serde::{Deserialize, Deserializer, Serialize};

use crate::core::images::{resolve_image_url, DEFAULT_ARTICLE_IMAGE};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Economia,
    Politica,
    Sociedade,
    Entretenimento,
    Tecnologia,
    Internacional,
    Desporto,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CategoryInfo {
    pub id: Category,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

const CATEGORY_COLOR: &str = "bg-primary";

static CATALOG: [CategoryInfo; 7] = [
    CategoryInfo {
        id: Category::Economia,
        name: "Economia",
        icon: "TrendingUp",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Politica,
        name: "Política",
        icon: "Landmark",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Sociedade,
        name: "Sociedade",
        icon: "Users",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Entretenimento,
        name: "Entretenimento",
        icon: "Film",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Tecnologia,
        name: "Tecnologia",
        icon: "Cpu",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Internacional,
        name: "Internacional",
        icon: "Globe",
        color: CATEGORY_COLOR,
    },
    CategoryInfo {
        id: Category::Desporto,
        name: "Desporto",
        icon: "Trophy",
        color: CATEGORY_COLOR,
    },
];

/// The full catalog in display order.
pub fn categories() -> &'static [CategoryInfo] {
    &CATALOG
}

impl Category {
    /// Where unknown or missing raw categories land.
    pub const FALLBACK: Category = Category::Sociedade;

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Economia => "economia",
            Category::Politica => "politica",
            Category::Sociedade => "sociedade",
            Category::Entretenimento => "entretenimento",
            Category::Tecnologia => "tecnologia",
            Category::Internacional => "internacional",
            Category::Desporto => "desporto",
        }
    }

    pub fn info(self) -> &'static CategoryInfo {
        &CATALOG[self as usize]
    }

    /// Case- and accent-insensitive lookup, so "Política" and "POLITICA" both match.
    pub fn from_id(raw: &str) -> Option<Self> {
        let folded = fold_category_id(raw);
        CATALOG
            .iter()
            .map(|info| info.id)
            .find(|category| category.as_str() == folded)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fold_category_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub published_at: String,
    pub reading_time: u32,
    pub author: String,
    pub quick_facts: Vec<String>,
    pub related_article_ids: Vec<String>,
    pub tags: Option<Vec<String>>,
}

impl Article {
    /// The image to render, falling back to the placeholder.
    pub fn display_image(&self) -> &str {
        resolve_image_url(self.image_url.as_deref(), DEFAULT_ARTICLE_IMAGE)
    }
}

/// A row as the hosted database returns it. Every field is optional here;
/// `normalize` is the only way out of this type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawArticle {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(default, alias = "readingTime", deserialize_with = "lenient_number")]
    pub reading_time: Option<f64>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, alias = "quickFacts")]
    pub quick_facts: Option<Vec<String>>,
    #[serde(default, alias = "relatedArticleIds", alias = "related_articles")]
    pub related_article_ids: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "highlightType")]
    pub highlight_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

// Ids come back as uuid strings from the articles table but as integers from
// older seed data.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|value| match value {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Number(number) => number.to_string(),
    }))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        StringOrNumber::Text(text) => text.trim().parse::<f64>().ok(),
        StringOrNumber::Number(number) => number.as_f64(),
    }))
}
