use serde::Serialize;

use crate::core::preferences::{PreferenceChange, PreferenceKind};
use crate::core::query::QueryError;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the reader. Building one has no side effects;
/// the UI decides whether and how to show it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
        }
    }
}

pub fn notice_for_preference(change: &PreferenceChange) -> Option<Notice> {
    if !change.persisted {
        return Some(Notice::new(
            NoticeLevel::Error,
            "Não foi possível guardar a sua preferência neste dispositivo",
        ));
    }
    if !change.changed {
        return None;
    }
    let message = match (change.kind, change.member) {
        (PreferenceKind::Saved, true) => "Artigo guardado",
        (PreferenceKind::Saved, false) => "Removido dos guardados",
        (PreferenceKind::Liked, true) => "Adicionado aos gostos",
        (PreferenceKind::Liked, false) => "Removido dos gostos",
    };
    Some(Notice::new(NoticeLevel::Success, message))
}

pub fn notice_for_query_error(error: &QueryError) -> Notice {
    let message = match error {
        QueryError::Request(_) => "Sem ligação ao servidor. Tente novamente.",
        QueryError::HttpStatus { status, .. } if *status >= 500 => {
            "O servidor está indisponível. Tente novamente mais tarde."
        }
        QueryError::HttpStatus { .. } => "Não foi possível carregar as notícias.",
        QueryError::Decode(_) | QueryError::Normalize(_) => "Recebemos dados inválidos do servidor.",
        QueryError::Function(_) => "Não foi possível carregar os temas em destaque.",
    };
    Notice::new(NoticeLevel::Error, message)
}
