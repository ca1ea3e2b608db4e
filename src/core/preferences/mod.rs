pub mod port;
pub mod store;

use serde::{Deserialize, Serialize};

pub use port::{KeyValueStore, MemoryKeyValueStore};
pub use store::{PreferenceChange, PreferenceStore};

pub const LIKED_ARTICLES_KEY: &str = "bnews_liked_articles";
pub const SAVED_ARTICLES_KEY: &str = "bnews_saved_articles";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    Liked,
    Saved,
}

impl PreferenceKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            PreferenceKind::Liked => LIKED_ARTICLES_KEY,
            PreferenceKind::Saved => SAVED_ARTICLES_KEY,
        }
    }
}
